mod ecod;
mod half_space_trees;
mod isolation_forest;
mod loda;

pub use ecod::Ecod;
pub use half_space_trees::HalfSpaceTrees;
pub use isolation_forest::IsolationForest;
pub use loda::Loda;

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Anomaly detector that learns from and scores one sample at a time.
///
/// Higher scores mean more anomalous.
pub trait StreamingDetector {
    fn learn_one(&mut self, x: ArrayView1<f32>);

    fn score_one(&self, x: ArrayView1<f32>) -> f32;
}

/// Static detector fitted on a whole batch and then asked to score it.
pub trait BatchScorer {
    fn fit(&mut self, x: ArrayView2<f32>);

    fn score(&self, x: ArrayView2<f32>) -> Array1<f32>;
}

/// Result of a forward pass through an [`OutlierDetectorNet`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierOutput {
    /// 1.0 where every batch scorer flags the sample, 0.0 elsewhere.
    pub labels: Array1<f32>,
    /// Per-sample scores of the streaming detector.
    pub scores: Array1<f32>,
}

/// Flags samples scored strictly above `mean + 2 * std` by each scorer and
/// keeps only the samples every scorer agrees on.
pub fn mark_outliers(x: ArrayView2<f32>, scorers: &mut [&mut dyn BatchScorer]) -> Array1<f32> {
    let mut labels = Array1::ones(x.nrows());
    for scorer in scorers.iter_mut() {
        scorer.fit(x);
        let scores = scorer.score(x);
        let threshold = two_sigma_threshold(scores.view());
        labels.zip_mut_with(&scores, |l, &s| {
            if s <= threshold {
                *l = 0.0;
            }
        });
    }
    labels
}

/// `mean + 2 * std`, population standard deviation.
fn two_sigma_threshold(scores: ArrayView1<f32>) -> f32 {
    if scores.is_empty() {
        return f32::INFINITY;
    }
    let mean = scores.mean().unwrap_or_default();
    mean + 2.0 * scores.std(0.0)
}

/// Batch view over a [`StreamingDetector`].
///
/// `fit` streams rows into the detector. `forward` labels the batch with an
/// ECOD and isolation-forest consensus (seed 0) and reports the streaming
/// detector's own scores alongside.
#[derive(Debug, Clone)]
pub struct OutlierDetectorNet<D: StreamingDetector> {
    detector: D,
}

impl<D: StreamingDetector> OutlierDetectorNet<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn fit(&mut self, x: ArrayView2<f32>) {
        for row in x.rows() {
            self.detector.learn_one(row);
        }
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> OutlierOutput {
        let mut ecod = Ecod::default();
        let mut forest = IsolationForest::default();
        let labels = mark_outliers(x, &mut [&mut ecod, &mut forest]);
        let scores = x.rows().into_iter().map(|row| self.detector.score_one(row)).collect();
        OutlierOutput { labels, scores }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    /// Scores every row by a fixed table, ignoring the data.
    struct TableScorer(Array1<f32>);

    impl BatchScorer for TableScorer {
        fn fit(&mut self, _x: ArrayView2<f32>) {}

        fn score(&self, _x: ArrayView2<f32>) -> Array1<f32> {
            self.0.clone()
        }
    }

    fn peaked(at: &[usize], n: usize) -> Array1<f32> {
        let mut scores = Array1::zeros(n);
        for &i in at {
            scores[i] = 10.0;
        }
        scores
    }

    #[test]
    fn label_requires_every_scorer() {
        let x = Array2::zeros((20, 1));
        let mut a = TableScorer(peaked(&[3], 20));
        let mut b = TableScorer(peaked(&[3, 7], 20));
        let labels = mark_outliers(x.view(), &mut [&mut a, &mut b]);
        assert_eq!(labels.sum(), 1.0);
        assert_eq!(labels[3], 1.0);
        assert_eq!(labels[7], 0.0);
    }

    #[test]
    fn constant_scores_flag_nothing() {
        let mut flat = TableScorer(Array1::from_elem(5, 0.3));
        let labels = mark_outliers(Array2::zeros((5, 2)).view(), &mut [&mut flat]);
        assert_eq!(labels.sum(), 0.0);
    }

    #[test]
    fn forward_flags_a_gross_outlier_and_scores_every_row() {
        let mut x = Array2::from_shape_fn((60, 2), |(i, j)| ((i * 7 + j * 3) % 10) as f32 * 0.1);
        x[[17, 0]] = 50.0;
        x[[17, 1]] = -50.0;

        let mut net = OutlierDetectorNet::new(HalfSpaceTrees::new(5, 4, 20, 0));
        net.fit(x.view());
        let out = net.forward(x.view());

        assert_eq!(out.scores.len(), 60);
        assert_eq!(out.labels[17], 1.0);
        assert!(out.labels.iter().all(|&l| l == 0.0 || l == 1.0));
    }

    #[test]
    fn threshold_uses_population_std() {
        let t = two_sigma_threshold(array![0.0f32, 2.0].view());
        assert!((t - 3.0).abs() < 1e-6);
    }
}
