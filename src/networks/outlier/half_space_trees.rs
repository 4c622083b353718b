use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::networks::outlier::StreamingDetector;

/// One complete binary tree of depth `height`, stored level by level.
#[derive(Debug, Clone)]
struct HalfSpaceTree {
    features: Vec<usize>,
    splits: Vec<f32>,
    reference: Vec<f32>,
    latest: Vec<f32>,
}

impl HalfSpaceTree {
    fn build(lows: &[f32], highs: &[f32], height: usize, rng: &mut StdRng) -> Self {
        let internal = (1usize << height) - 1;
        let nodes = (1usize << (height + 1)) - 1;
        let mut tree = Self {
            features: vec![0; internal],
            splits: vec![0.0; internal],
            reference: vec![0.0; nodes],
            latest: vec![0.0; nodes],
        };
        tree.grow(0, lows.to_vec(), highs.to_vec(), rng);
        tree
    }

    fn grow(&mut self, node: usize, lows: Vec<f32>, highs: Vec<f32>, rng: &mut StdRng) {
        if node >= self.features.len() || lows.is_empty() {
            return;
        }
        let feature = rng.random_range(0..lows.len());
        let mid = 0.5 * (lows[feature] + highs[feature]);
        self.features[node] = feature;
        self.splits[node] = mid;

        let mut left_highs = highs.clone();
        left_highs[feature] = mid;
        let mut right_lows = lows.clone();
        right_lows[feature] = mid;
        self.grow(2 * node + 1, lows, left_highs, rng);
        self.grow(2 * node + 2, right_lows, highs, rng);
    }

    /// Node indices from the root down to a leaf.
    fn path<'a, 'b: 'a>(&'a self, x: ArrayView1<'b, f32>) -> impl Iterator<Item = usize> + 'a {
        let mut node = Some(0usize);
        let internal = self.features.len();
        std::iter::from_fn(move || {
            let current = node?;
            node = (current < internal).then(|| {
                let goes_left = x.get(self.features[current]).is_some_and(|&v| v < self.splits[current]);
                if goes_left { 2 * current + 1 } else { 2 * current + 2 }
            });
            Some(current)
        })
    }

    fn record(&mut self, x: ArrayView1<f32>) {
        let path: Vec<usize> = self.path(x).collect();
        for node in path {
            self.latest[node] += 1.0;
        }
    }

    fn rotate(&mut self) {
        std::mem::swap(&mut self.reference, &mut self.latest);
        self.latest.fill(0.0);
    }

    fn mass_score(&self, x: ArrayView1<f32>, size_limit: f32) -> f32 {
        let mut score = 0.0;
        for (depth, node) in self.path(x).enumerate() {
            score += self.reference[node] * (1u64 << depth) as f32;
            if self.reference[node] < size_limit {
                break;
            }
        }
        score
    }
}

/// Streaming half-space trees.
///
/// The first window fixes the feature ranges the random half-spaces are cut
/// from. Mass profiles alternate between a reference window, used for
/// scoring, and the window currently being filled. Scores are in `[0, 1]`,
/// higher meaning sparser regions.
#[derive(Debug, Clone)]
pub struct HalfSpaceTrees {
    n_trees: usize,
    height: usize,
    window_size: usize,
    seed: u64,
    trees: Vec<HalfSpaceTree>,
    warmup: Vec<Vec<f32>>,
    counter: usize,
}

impl HalfSpaceTrees {
    pub fn new(n_trees: usize, height: usize, window_size: usize, seed: u64) -> Self {
        Self {
            n_trees: n_trees.max(1),
            height,
            window_size: window_size.max(1),
            seed,
            trees: Vec::new(),
            warmup: Vec::new(),
            counter: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.trees.is_empty()
    }

    fn size_limit(&self) -> f32 {
        0.1 * self.window_size as f32
    }

    fn max_score(&self) -> f32 {
        let nodes = ((1u64 << (self.height + 1)) - 1) as f32;
        self.n_trees as f32 * self.window_size as f32 * nodes
    }

    fn plant(&mut self) {
        let rows = Array2::from_shape_fn((self.warmup.len(), self.warmup[0].len()), |(i, j)| self.warmup[i][j]);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut lows = Vec::with_capacity(rows.ncols());
        let mut highs = Vec::with_capacity(rows.ncols());
        for column in rows.columns() {
            let min = column.iter().copied().fold(f32::INFINITY, f32::min);
            let max = column.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let pivot = if max > min { rng.random_range(min..max) } else { min };
            let reach = 2.0 * (pivot - min).max(max - pivot).max(f32::EPSILON);
            lows.push(pivot - reach);
            highs.push(pivot + reach);
        }

        self.trees = (0..self.n_trees)
            .map(|_| HalfSpaceTree::build(&lows, &highs, self.height, &mut rng))
            .collect();
        for row in rows.rows() {
            self.trees.iter_mut().for_each(|t| t.record(row));
        }
        self.trees.iter_mut().for_each(HalfSpaceTree::rotate);
        self.warmup.clear();
    }
}

impl Default for HalfSpaceTrees {
    fn default() -> Self {
        Self::new(10, 8, 250, 0)
    }
}

impl StreamingDetector for HalfSpaceTrees {
    fn learn_one(&mut self, x: ArrayView1<f32>) {
        if !self.is_ready() {
            self.warmup.push(x.to_vec());
            if self.warmup.len() == self.window_size {
                self.plant();
            }
            return;
        }
        self.trees.iter_mut().for_each(|t| t.record(x));
        self.counter += 1;
        if self.counter == self.window_size {
            self.trees.iter_mut().for_each(HalfSpaceTree::rotate);
            self.counter = 0;
        }
    }

    fn score_one(&self, x: ArrayView1<f32>) -> f32 {
        if !self.is_ready() {
            return 0.0;
        }
        let limit = self.size_limit();
        let mass: f32 = self.trees.iter().map(|t| t.mass_score(x, limit)).sum();
        (1.0 - mass / self.max_score()).clamp(0.0, 1.0)
    }
}
