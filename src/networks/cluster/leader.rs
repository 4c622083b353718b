use ndarray::{Array1, ArrayView1};

use crate::networks::cluster::StreamingClusterer;
use crate::networks::squared_distance;

/// Leader clustering with running centroids.
///
/// A sample within `radius` of its nearest centroid joins that cluster and
/// moves its centroid; otherwise it founds a new cluster. Once
/// `max_clusters` exist, samples always join the nearest one.
#[derive(Debug, Clone)]
pub struct LeaderClustering {
    radius: f32,
    max_clusters: usize,
    centroids: Vec<Array1<f32>>,
    weights: Vec<usize>,
}

impl LeaderClustering {
    pub fn new(radius: f32, max_clusters: usize) -> Self {
        Self {
            radius,
            max_clusters: max_clusters.max(1),
            centroids: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn centroids(&self) -> &[Array1<f32>] {
        &self.centroids
    }

    fn nearest(&self, x: ArrayView1<f32>) -> Option<(usize, f32)> {
        self.centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, squared_distance(c.view(), x)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl Default for LeaderClustering {
    fn default() -> Self {
        Self::new(1.0, 64)
    }
}

impl StreamingClusterer for LeaderClustering {
    fn learn_one(&mut self, x: ArrayView1<f32>) {
        let joins = match self.nearest(x) {
            Some((i, d)) if d <= self.radius * self.radius => Some(i),
            Some((i, _)) if self.centroids.len() >= self.max_clusters => Some(i),
            _ => None,
        };
        match joins {
            Some(i) => {
                self.weights[i] += 1;
                let rate = 1.0 / self.weights[i] as f32;
                self.centroids[i].zip_mut_with(&x, |c, &v| *c += rate * (v - *c));
            }
            None => {
                self.centroids.push(x.to_owned());
                self.weights.push(1);
            }
        }
    }

    fn predict_one(&self, x: ArrayView1<f32>) -> usize {
        self.nearest(x).map(|(i, _)| i).unwrap_or(0)
    }

    fn n_clusters(&self) -> usize {
        self.centroids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn far_samples_found_new_clusters() {
        let mut leader = LeaderClustering::new(1.0, 10);
        for row in array![[0.0f32, 0.0], [0.5, 0.0], [5.0, 5.0], [20.0, 0.0]].rows() {
            leader.learn_one(row);
        }
        assert_eq!(leader.n_clusters(), 3);
        assert_eq!(leader.centroids()[0], array![0.25f32, 0.0]);
        assert_eq!(leader.predict_one(array![19.0f32, 1.0].view()), 2);
    }

    #[test]
    fn cluster_budget_is_respected() {
        let mut leader = LeaderClustering::new(0.1, 2);
        for v in [0.0f32, 5.0, 10.0, 15.0] {
            leader.learn_one(array![v].view());
        }
        assert_eq!(leader.n_clusters(), 2);
    }
}
