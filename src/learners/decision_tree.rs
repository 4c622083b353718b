use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::core::{Task, label_of};
use crate::error::{ModelError, Result};
use crate::learners::{BatchEstimator, FitOptions};

const MIN_IMPURITY_DECREASE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitCriterion {
    Gini,
    Variance,
}

impl SplitCriterion {
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Classification => SplitCriterion::Gini,
            Task::Regression => SplitCriterion::Variance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TreeNode {
    Leaf {
        value: f32,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f32,
    score: f64,
}

/// CART decision tree grown greedily on axis-aligned thresholds.
///
/// Gini impurity drives classification splits and leaves vote the majority
/// class; squared error drives regression splits and leaves hold the mean.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    criterion: SplitCriterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
    num_classes: usize,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(criterion: SplitCriterion, num_classes: usize) -> Self {
        Self {
            criterion,
            max_depth: None,
            min_samples_split: 2,
            num_classes,
            nodes: Vec::new(),
        }
    }

    pub fn for_task(task: Task, num_classes: usize) -> Self {
        Self::new(SplitCriterion::for_task(task), num_classes)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = Vec::new();
        if !self.nodes.is_empty() {
            pending.push((0, 0));
        }
        while let Some((at, depth)) = pending.pop() {
            match self.nodes[at] {
                TreeNode::Leaf { .. } => deepest = deepest.max(depth),
                TreeNode::Split { left, right, .. } => {
                    pending.push((left, depth + 1));
                    pending.push((right, depth + 1));
                }
            }
        }
        deepest
    }

    pub fn predict_row(&self, row: ArrayView1<f32>) -> Option<f32> {
        let mut at = 0;
        loop {
            match self.nodes.get(at)? {
                TreeNode::Leaf { value } => return Some(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Grows the tree from an explicit work stack; chain-shaped trees as deep
    /// as the window is long must not touch the call stack.
    fn grow(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>) {
        let rows: Vec<usize> = (0..y.len()).collect();
        let value = self.leaf_value(y, &rows);
        self.nodes.push(TreeNode::Leaf { value });

        let mut pending = vec![(0, rows, 0)];
        while let Some((at, rows, depth)) = pending.pop() {
            let depth_left = self.max_depth.is_none_or(|max| depth < max);
            if !depth_left || rows.len() < self.min_samples_split {
                continue;
            }
            let Some(split) = self.best_split(x, y, &rows) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);
            let left = self.nodes.len();
            let value = self.leaf_value(y, &left_rows);
            self.nodes.push(TreeNode::Leaf { value });
            let right = self.nodes.len();
            let value = self.leaf_value(y, &right_rows);
            self.nodes.push(TreeNode::Leaf { value });

            self.nodes[at] = TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            pending.push((right, right_rows, depth + 1));
            pending.push((left, left_rows, depth + 1));
        }
    }

    fn leaf_value(&self, y: ArrayView1<f32>, rows: &[usize]) -> f32 {
        match self.criterion {
            SplitCriterion::Gini => {
                let counts = self.class_counts(y, rows);
                let mut best = 0;
                for (c, &count) in counts.iter().enumerate() {
                    if count > counts[best] {
                        best = c;
                    }
                }
                best as f32
            }
            SplitCriterion::Variance => {
                if rows.is_empty() {
                    return 0.0;
                }
                let sum: f64 = rows.iter().map(|&i| y[i] as f64).sum();
                (sum / rows.len() as f64) as f32
            }
        }
    }

    fn class_counts(&self, y: ArrayView1<f32>, rows: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.num_classes.max(1)];
        for &i in rows {
            if let Some(c) = label_of(y[i]) {
                if c >= counts.len() {
                    counts.resize(c + 1, 0.0);
                }
                counts[c] += 1.0;
            }
        }
        counts
    }

    fn best_split(&self, x: ArrayView2<f32>, y: ArrayView1<f32>, rows: &[usize]) -> Option<BestSplit> {
        let parent = match self.criterion {
            SplitCriterion::Gini => {
                let counts = self.class_counts(y, rows);
                rows.len() as f64 * gini(&counts, rows.len() as f64)
            }
            SplitCriterion::Variance => {
                let (sum, sum_sq) = rows.iter().fold((0.0, 0.0), |(s, q), &i| {
                    let v = y[i] as f64;
                    (s + v, q + v * v)
                });
                sse(sum, sum_sq, rows.len() as f64)
            }
        };

        let mut best: Option<BestSplit> = None;
        let mut order = rows.to_vec();
        for feature in 0..x.ncols() {
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));
            let candidate = match self.criterion {
                SplitCriterion::Gini => self.sweep_gini(x, y, &order, feature),
                SplitCriterion::Variance => sweep_variance(x, y, &order, feature),
            };
            if let Some(candidate) = candidate {
                if best.is_none_or(|b| candidate.score < b.score) {
                    best = Some(candidate);
                }
            }
        }
        best.filter(|b| b.score < parent - MIN_IMPURITY_DECREASE)
    }

    fn sweep_gini(&self, x: ArrayView2<f32>, y: ArrayView1<f32>, order: &[usize], feature: usize) -> Option<BestSplit> {
        let n = order.len();
        let mut right = self.class_counts(y, order);
        let mut left = vec![0.0; right.len()];
        let mut best: Option<BestSplit> = None;

        for pos in 0..n.saturating_sub(1) {
            if let Some(c) = label_of(y[order[pos]]) {
                left[c] += 1.0;
                right[c] -= 1.0;
            }
            let value = x[[order[pos], feature]];
            let next = x[[order[pos + 1], feature]];
            if value == next {
                continue;
            }
            let nl = (pos + 1) as f64;
            let nr = (n - pos - 1) as f64;
            let score = nl * gini(&left, nl) + nr * gini(&right, nr);
            if best.is_none_or(|b| score < b.score) {
                best = Some(BestSplit {
                    feature,
                    threshold: midpoint(value, next),
                    score,
                });
            }
        }
        best
    }
}

fn sweep_variance(x: ArrayView2<f32>, y: ArrayView1<f32>, order: &[usize], feature: usize) -> Option<BestSplit> {
    let n = order.len();
    let (total, total_sq) = order.iter().fold((0.0, 0.0), |(s, q), &i| {
        let v = y[i] as f64;
        (s + v, q + v * v)
    });
    let (mut left, mut left_sq) = (0.0, 0.0);
    let mut best: Option<BestSplit> = None;

    for pos in 0..n.saturating_sub(1) {
        let v = y[order[pos]] as f64;
        left += v;
        left_sq += v * v;
        let value = x[[order[pos], feature]];
        let next = x[[order[pos + 1], feature]];
        if value == next {
            continue;
        }
        let nl = (pos + 1) as f64;
        let nr = (n - pos - 1) as f64;
        let score = sse(left, left_sq, nl) + sse(total - left, total_sq - left_sq, nr);
        if best.is_none_or(|b| score < b.score) {
            best = Some(BestSplit {
                feature,
                threshold: midpoint(value, next),
                score,
            });
        }
    }
    best
}

#[inline]
fn midpoint(a: f32, b: f32) -> f32 {
    let mid = a + (b - a) / 2.0;
    // Guard against rounding up onto `b` for adjacent floats.
    if mid >= b { a } else { mid }
}

#[inline]
fn gini(counts: &[f64], n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / n).powi(2)).sum::<f64>()
}

#[inline]
fn sse(sum: f64, sum_sq: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    (sum_sq - sum * sum / n).max(0.0)
}

impl BatchEstimator for DecisionTree {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, _options: FitOptions) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(ModelError::shape_mismatch("x rows", x.nrows(), y.len()));
        }
        self.nodes.clear();
        if y.is_empty() {
            return Ok(());
        }
        self.grow(x, y);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        if !self.is_fitted() {
            return Err(ModelError::configuration("Decision tree has not been fitted"));
        }
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.predict_row(row).unwrap_or_default())
            .collect())
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn classification_tree_separates_threshold() {
        let x = array![[0.0f32, 5.0], [1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let y = array![0.0f32, 0.0, 1.0, 1.0];
        let mut tree = DecisionTree::for_task(Task::Classification, 2);
        tree.fit(x.view(), y.view(), FitOptions::default()).unwrap();

        assert_eq!(tree.predict(x.view()).unwrap(), y);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(array![[1.4f32, 0.0], [1.6, 0.0]].view()).unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn pure_node_stays_leaf() {
        let x = array![[0.0f32], [1.0], [2.0]];
        let y = array![1.0f32, 1.0, 1.0];
        let mut tree = DecisionTree::for_task(Task::Classification, 2);
        tree.fit(x.view(), y.view(), FitOptions::default()).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn regression_tree_memorises_distinct_points() {
        let x = array![[0.0f32], [1.0], [2.0], [3.0]];
        let y = array![1.0f32, 2.0, 3.0, 6.0];
        let mut tree = DecisionTree::for_task(Task::Regression, 1);
        tree.fit(x.view(), y.view(), FitOptions::default()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn max_depth_limits_growth() {
        let x = array![[0.0f32], [1.0], [2.0], [3.0]];
        let y = array![0.0f32, 10.0, 20.0, 30.0];
        let mut tree = DecisionTree::for_task(Task::Regression, 1).with_max_depth(1);
        tree.fit(x.view(), y.view(), FitOptions::default()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(x.view()).unwrap(), array![5.0, 5.0, 25.0, 25.0]);
    }

    #[test]
    fn unfitted_tree_refuses_to_predict() {
        let tree = DecisionTree::for_task(Task::Regression, 1);
        assert!(!tree.is_fitted());
        assert!(tree.predict(array![[0.0f32]].view()).is_err());
    }

    #[test]
    fn alternating_labels_grow_a_deep_chain_on_a_small_stack() {
        let n = 1000;
        let handle = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || {
                let x = Array1::from_iter((0..n).map(|i| i as f32)).insert_axis(ndarray::Axis(1));
                let y = Array1::from_iter((0..n).map(|i| (i % 2) as f32));
                let mut tree = DecisionTree::for_task(Task::Classification, 2);
                tree.fit(x.view(), y.view(), FitOptions::default()).unwrap();
                (tree.depth(), tree.predict(x.view()).unwrap() == y)
            })
            .unwrap();
        let (depth, exact) = handle.join().unwrap();
        assert!(depth > 100, "depth {depth}");
        assert!(exact);
    }

    #[test]
    fn refit_replaces_previous_tree() {
        let x = array![[0.0f32], [1.0]];
        let mut tree = DecisionTree::for_task(Task::Classification, 2);
        tree.fit(x.view(), array![0.0f32, 1.0].view(), FitOptions::default()).unwrap();
        tree.fit(x.view(), array![1.0f32, 1.0].view(), FitOptions::default()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), array![1.0, 1.0]);
    }
}
