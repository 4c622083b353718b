//! Gradient-boosted regression trees.
//!
//! Regression boosts squared error from the target mean. Classification
//! boosts one tree per class and round on softmax residuals, starting from
//! log class priors, and predicts the arg-max of the raw scores.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::core::{Task, label_of};
use crate::error::{ModelError, Result};
use crate::learners::{BatchEstimator, DecisionTree, FitOptions, SplitCriterion};
use crate::nn::softmax_rows;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingOptions {
    pub rounds: usize,
    pub learning_rate: f32,
    pub max_depth: usize,
}

impl Default for BoostingOptions {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradientBoosting {
    task: Task,
    num_classes: usize,
    options: BoostingOptions,
    init_raw: Vec<f32>,
    /// Shape: `[rounds][outputs]`.
    rounds: Vec<Vec<DecisionTree>>,
}

impl GradientBoosting {
    pub fn new(task: Task, num_classes: usize, options: BoostingOptions) -> Self {
        Self {
            task,
            num_classes,
            options,
            init_raw: Vec::new(),
            rounds: Vec::new(),
        }
    }

    fn weak_learner(&self) -> DecisionTree {
        DecisionTree::new(SplitCriterion::Variance, 1).with_max_depth(self.options.max_depth)
    }

    /// Raw additive scores, one column per output.
    pub fn predict_raw(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let outputs = self.init_raw.len();
        let mut raw = Array2::from_shape_fn((x.nrows(), outputs), |(_, k)| self.init_raw[k]);
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                for (mut raw_row, row) in raw.axis_iter_mut(Axis(0)).zip(x.rows()) {
                    raw_row[k] += self.options.learning_rate * tree.predict_row(row).unwrap_or_default();
                }
            }
        }
        raw
    }

    fn fit_regression(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<()> {
        let mean = y.mean().unwrap_or_default();
        self.init_raw = vec![mean];
        let mut raw = Array1::from_elem(y.len(), mean);

        for _ in 0..self.options.rounds {
            let residuals = &y - &raw;
            let mut tree = self.weak_learner();
            tree.fit(x, residuals.view(), FitOptions::default())?;
            for (r, row) in raw.iter_mut().zip(x.rows()) {
                *r += self.options.learning_rate * tree.predict_row(row).unwrap_or_default();
            }
            self.rounds.push(vec![tree]);
        }
        Ok(())
    }

    fn fit_classification(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<()> {
        let labels: Vec<usize> = y.iter().map(|&v| label_of(v).unwrap_or(0)).collect();
        let classes = labels
            .iter()
            .map(|c| c + 1)
            .max()
            .unwrap_or(0)
            .max(self.num_classes)
            .max(1);
        self.num_classes = classes;

        let mut priors = vec![0.0f32; classes];
        for &c in &labels {
            priors[c] += 1.0;
        }
        let n = labels.len().max(1) as f32;
        self.init_raw = priors.iter().map(|&p| (p / n).max(1e-6).ln()).collect();
        let mut raw = Array2::from_shape_fn((labels.len(), classes), |(_, k)| self.init_raw[k]);

        for _ in 0..self.options.rounds {
            let probs = softmax_rows(raw.view());
            let mut round = Vec::with_capacity(classes);
            for k in 0..classes {
                let residuals: Array1<f32> = labels
                    .iter()
                    .zip(probs.column(k))
                    .map(|(&c, &p)| if c == k { 1.0 - p } else { -p })
                    .collect();
                let mut tree = self.weak_learner();
                tree.fit(x, residuals.view(), FitOptions::default())?;
                for (i, row) in x.rows().into_iter().enumerate() {
                    raw[[i, k]] += self.options.learning_rate * tree.predict_row(row).unwrap_or_default();
                }
                round.push(tree);
            }
            self.rounds.push(round);
        }
        Ok(())
    }
}

impl BatchEstimator for GradientBoosting {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, _options: FitOptions) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(ModelError::shape_mismatch("x rows", x.nrows(), y.len()));
        }
        self.rounds.clear();
        self.init_raw.clear();
        if y.is_empty() {
            return Ok(());
        }
        match self.task {
            Task::Classification => self.fit_classification(x, y),
            Task::Regression => self.fit_regression(x, y),
        }
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        if !self.is_fitted() {
            return Err(ModelError::configuration("Gradient boosting has not been fitted"));
        }
        let raw = self.predict_raw(x);
        Ok(match self.task {
            Task::Regression => raw.column(0).to_owned(),
            Task::Classification => raw
                .rows()
                .into_iter()
                .map(|row| argmax(row) as f32)
                .collect(),
        })
    }

    fn is_fitted(&self) -> bool {
        !self.init_raw.is_empty()
    }
}

/// Index of the largest finite entry; ties go to the lowest index.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn regression_fits_step_function() {
        let x = array![[0.0f32], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![0.0f32, 0.0, 0.0, 4.0, 4.0, 4.0];
        let mut gbdt = GradientBoosting::new(Task::Regression, 1, BoostingOptions::default());
        gbdt.fit(x.view(), y.view(), FitOptions::default()).unwrap();

        let pred = gbdt.predict(x.view()).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.01, "{p} vs {t}");
        }
    }

    #[test]
    fn classification_recovers_labels() {
        let x = array![[0.0f32, 1.0], [0.2, 1.0], [0.4, 1.0], [2.0, 1.0], [2.2, 1.0], [2.4, 1.0]];
        let y = array![0.0f32, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut gbdt = GradientBoosting::new(Task::Classification, 2, BoostingOptions::default());
        gbdt.fit(x.view(), y.view(), FitOptions::default()).unwrap();
        assert_eq!(gbdt.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        let gbdt = GradientBoosting::new(Task::Classification, 2, BoostingOptions::default());
        assert!(!gbdt.is_fitted());
        assert!(gbdt.predict(array![[0.0f32]].view()).is_err());
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(array![1.0f32, 3.0, 3.0].view()), 1);
        assert_eq!(argmax(array![-1.0f32].view()), 0);
    }
}
