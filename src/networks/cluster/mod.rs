mod kmeans;
mod leader;

pub use kmeans::SequentialKMeans;
pub use leader::LeaderClustering;

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Clusterer that learns from and assigns one sample at a time.
pub trait StreamingClusterer {
    fn learn_one(&mut self, x: ArrayView1<f32>);

    /// Cluster index of `x`; 0 before anything has been learned.
    fn predict_one(&self, x: ArrayView1<f32>) -> usize;

    fn n_clusters(&self) -> usize;
}

/// Batch view over a [`StreamingClusterer`]: rows are fed in order.
#[derive(Debug, Clone)]
pub struct ClusterNet<C: StreamingClusterer> {
    clusterer: C,
}

impl<C: StreamingClusterer> ClusterNet<C> {
    pub fn new(clusterer: C) -> Self {
        Self { clusterer }
    }

    pub fn clusterer(&self) -> &C {
        &self.clusterer
    }

    pub fn fit(&mut self, x: ArrayView2<f32>) {
        for row in x.rows() {
            self.clusterer.learn_one(row);
        }
    }

    /// One assignment per input row, in input order.
    pub fn forward(&self, x: ArrayView2<f32>) -> Array1<usize> {
        x.rows().into_iter().map(|row| self.clusterer.predict_one(row)).collect()
    }
}
