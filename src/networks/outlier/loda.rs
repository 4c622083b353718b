use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::networks::outlier::StreamingDetector;

/// Equal-width histogram over one projection, with Laplace smoothing.
#[derive(Debug, Clone)]
struct Histogram {
    low: f32,
    width: f32,
    counts: Vec<f32>,
    total: f32,
}

impl Histogram {
    fn from_values(values: &[f32], bins: usize) -> Self {
        let low = values.iter().copied().fold(f32::INFINITY, f32::min);
        let high = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let width = ((high - low) / bins as f32).max(f32::EPSILON);
        let mut histogram = Self {
            low,
            width,
            counts: vec![0.0; bins],
            total: 0.0,
        };
        values.iter().for_each(|&v| histogram.add(v));
        histogram
    }

    fn bin(&self, v: f32) -> Option<usize> {
        let position = ((v - self.low) / self.width).floor();
        if position < 0.0 {
            return None;
        }
        let bin = position as usize;
        // the top edge belongs to the last bin
        if bin == self.counts.len() && v <= self.low + self.width * bin as f32 {
            return Some(bin - 1);
        }
        (bin < self.counts.len()).then_some(bin)
    }

    fn add(&mut self, v: f32) {
        if let Some(b) = self.bin(v) {
            self.counts[b] += 1.0;
        }
        self.total += 1.0;
    }

    fn probability(&self, v: f32) -> f32 {
        let count = self.bin(v).map(|b| self.counts[b]).unwrap_or(0.0);
        (count + 1.0) / (self.total + self.counts.len() as f32)
    }
}

/// Lightweight on-line detector of anomalies (LODA).
///
/// Samples are projected onto sparse Gaussian directions; each projection
/// keeps a histogram whose range is fixed by a warm-up window. The score is
/// the mean negative log-density across projections.
#[derive(Debug, Clone)]
pub struct Loda {
    n_projections: usize,
    bins: usize,
    warmup_size: usize,
    seed: u64,
    projections: Option<Array2<f32>>,
    warmup: Vec<Array1<f32>>,
    histograms: Vec<Histogram>,
}

impl Loda {
    pub fn new(n_projections: usize, bins: usize, warmup_size: usize, seed: u64) -> Self {
        Self {
            n_projections: n_projections.max(1),
            bins: bins.max(1),
            warmup_size: warmup_size.max(1),
            seed,
            projections: None,
            warmup: Vec::new(),
            histograms: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.histograms.is_empty()
    }

    fn init_projections(&mut self, dim: usize) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let non_zero = ((dim as f32).sqrt().round() as usize).clamp(1, dim.max(1));
        let mut w = Array2::zeros((dim, self.n_projections));
        for k in 0..self.n_projections {
            for j in index::sample(&mut rng, dim, non_zero) {
                w[[j, k]] = StandardNormal.sample(&mut rng);
            }
        }
        self.projections = Some(w);
    }

    fn project(&self, x: ArrayView1<f32>) -> Option<Array1<f32>> {
        self.projections.as_ref().map(|w| x.dot(w))
    }
}

impl Default for Loda {
    fn default() -> Self {
        Self::new(100, 10, 256, 0)
    }
}

impl StreamingDetector for Loda {
    fn learn_one(&mut self, x: ArrayView1<f32>) {
        if self.projections.is_none() {
            if x.is_empty() {
                return;
            }
            self.init_projections(x.len());
        }
        let Some(z) = self.project(x) else {
            return;
        };

        if self.is_ready() {
            for (h, &v) in self.histograms.iter_mut().zip(z.iter()) {
                h.add(v);
            }
            return;
        }

        self.warmup.push(z);
        if self.warmup.len() == self.warmup_size {
            self.histograms = (0..self.n_projections)
                .map(|k| {
                    let values: Vec<f32> = self.warmup.iter().map(|z| z[k]).collect();
                    Histogram::from_values(&values, self.bins)
                })
                .collect();
            self.warmup.clear();
        }
    }

    fn score_one(&self, x: ArrayView1<f32>) -> f32 {
        if !self.is_ready() {
            return 0.0;
        }
        let Some(z) = self.project(x) else {
            return 0.0;
        };
        let total: f32 = self
            .histograms
            .iter()
            .zip(z.iter())
            .map(|(h, &v)| -h.probability(v).ln())
            .sum();
        total / self.histograms.len() as f32
    }
}
