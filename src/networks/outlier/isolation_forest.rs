use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::networks::outlier::BatchScorer;

const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        threshold: f32,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationNode {
    fn build(data: &Array2<f32>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Self {
        let n = data.nrows();
        if depth >= max_depth || n <= 1 || data.ncols() == 0 {
            return IsolationNode::Leaf { size: n };
        }

        let feature = rng.random_range(0..data.ncols());
        let column = data.column(feature);
        let min = column.iter().copied().fold(f32::INFINITY, f32::min);
        let max = column.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max - min <= f32::EPSILON * max.abs().max(1.0) {
            return IsolationNode::Leaf { size: n };
        }

        let threshold = rng.random_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| data[[i, feature]] < threshold);
        if left.is_empty() || right.is_empty() {
            return IsolationNode::Leaf { size: n };
        }

        let left = Self::build(&data.select(Axis(0), &left), depth + 1, max_depth, rng);
        let right = Self::build(&data.select(Axis(0), &right), depth + 1, max_depth, rng);
        IsolationNode::Internal {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn path_length(&self, row: ArrayView1<f32>) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth + average_path_length(*size),
                IsolationNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` items.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation forest scorer; anomalies isolate in fewer random splits.
///
/// Scores follow `2^(-E[h(x)] / c(psi))` and lie in `(0, 1]`.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    seed: u64,
    trees: Vec<IsolationNode>,
    sample_size: usize,
}

impl IsolationForest {
    pub fn new(n_trees: usize, max_samples: usize, seed: u64) -> Self {
        Self {
            n_trees,
            max_samples,
            seed,
            trees: Vec::new(),
            sample_size: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(100, 256, 0)
    }
}

impl BatchScorer for IsolationForest {
    fn fit(&mut self, x: ArrayView2<f32>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.sample_size = self.max_samples.min(x.nrows());
        self.trees.clear();
        if self.sample_size == 0 {
            return;
        }
        let max_depth = (self.sample_size as f64).log2().ceil() as usize;

        for _ in 0..self.n_trees {
            let rows = index::sample(&mut rng, x.nrows(), self.sample_size).into_vec();
            let subsample = x.select(Axis(0), &rows);
            self.trees.push(IsolationNode::build(&subsample, 0, max_depth, &mut rng));
        }
    }

    fn score(&self, x: ArrayView2<f32>) -> Array1<f32> {
        let c = average_path_length(self.sample_size);
        x.rows()
            .into_iter()
            .map(|row| {
                if self.trees.is_empty() || c == 0.0 {
                    return 0.5;
                }
                let mean = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
                2f64.powf(-mean / c) as f32
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud_with_outlier() -> Array2<f32> {
        let mut x = Array2::from_shape_fn((100, 2), |(i, j)| ((i * 13 + j * 5) % 17) as f32 / 17.0);
        x[[42, 0]] = 8.0;
        x[[42, 1]] = 8.0;
        x
    }

    #[test]
    fn isolated_point_scores_highest() {
        let x = cloud_with_outlier();
        let mut forest = IsolationForest::default();
        forest.fit(x.view());
        let scores = forest.score(x.view());
        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(42));
        assert!(scores.iter().all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn seeded_forests_agree() {
        let x = cloud_with_outlier();
        let mut a = IsolationForest::new(20, 32, 7);
        let mut b = IsolationForest::new(20, 32, 7);
        a.fit(x.view());
        b.fit(x.view());
        assert_eq!(a.n_trees(), 20);
        assert_eq!(a.score(x.view()), b.score(x.view()));
    }

    #[test]
    fn path_length_constants() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > 9.0);
    }
}
