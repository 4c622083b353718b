//! Adapters that put streaming learners behind a `fit`/`forward` contract.

pub mod cluster;
pub mod outlier;

pub use cluster::{ClusterNet, LeaderClustering, SequentialKMeans, StreamingClusterer};
pub use outlier::{
    BatchScorer, Ecod, HalfSpaceTrees, IsolationForest, Loda, OutlierDetectorNet, OutlierOutput,
    StreamingDetector, mark_outliers,
};

use ndarray::ArrayView1;

/// Squared Euclidean distance between two rows of equal width.
#[inline]
pub(crate) fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
