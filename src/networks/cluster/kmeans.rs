use ndarray::{Array1, ArrayView1};

use crate::networks::cluster::StreamingClusterer;
use crate::networks::squared_distance;

pub const DEFAULT_CLUSTERS: usize = 5;

/// MacQueen's sequential k-means.
///
/// The first `k` samples become the initial centers; afterwards each sample
/// pulls its nearest center toward itself by `1 / count`, so every center is
/// the running mean of the samples assigned to it.
#[derive(Debug, Clone)]
pub struct SequentialKMeans {
    k: usize,
    centers: Vec<Array1<f32>>,
    counts: Vec<usize>,
}

impl SequentialKMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            centers: Vec::with_capacity(k),
            counts: Vec::with_capacity(k),
        }
    }

    pub fn centers(&self) -> &[Array1<f32>] {
        &self.centers
    }

    fn nearest(&self, x: ArrayView1<f32>) -> Option<usize> {
        self.centers
            .iter()
            .enumerate()
            .map(|(i, c)| (i, squared_distance(c.view(), x)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

impl Default for SequentialKMeans {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTERS)
    }
}

impl StreamingClusterer for SequentialKMeans {
    fn learn_one(&mut self, x: ArrayView1<f32>) {
        if self.centers.len() < self.k {
            self.centers.push(x.to_owned());
            self.counts.push(1);
            return;
        }
        if let Some(i) = self.nearest(x) {
            self.counts[i] += 1;
            let rate = 1.0 / self.counts[i] as f32;
            let center = &mut self.centers[i];
            center.zip_mut_with(&x, |c, &v| *c += rate * (v - *c));
        }
    }

    fn predict_one(&self, x: ArrayView1<f32>) -> usize {
        self.nearest(x).unwrap_or(0)
    }

    fn n_clusters(&self) -> usize {
        self.centers.len()
    }
}
