use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;

use crate::error::Result;
use crate::learners::{BatchEstimator, FitOptions};
use crate::nn::{GradientNet, Optimizer};

/// Net whose output ignores its input and is always `outputs`.
#[derive(Debug, Clone)]
pub struct FixedOutputs {
    outputs: Array2<f32>,
}

impl FixedOutputs {
    pub fn new(outputs: Array2<f32>) -> Self {
        Self { outputs }
    }

    /// One-hot rows scoring `labels` highest.
    pub fn one_hot(labels: ArrayView1<f32>, classes: usize) -> Self {
        let mut outputs = Array2::zeros((labels.len(), classes));
        for (row, &label) in labels.iter().enumerate() {
            outputs[[row, label as usize]] = 1.0;
        }
        Self { outputs }
    }
}

impl GradientNet for FixedOutputs {
    fn initialize(_inputs: usize, outputs: usize, _rng: &mut StdRng) -> Self {
        Self::new(Array2::zeros((0, outputs)))
    }

    fn infer(&self, _x: ArrayView2<f32>) -> Array2<f32> {
        self.outputs.clone()
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        self.infer(x)
    }

    fn backward(&mut self, _d_out: Array2<f32>) {}

    fn feature_extractor(&self, _x: ArrayView2<f32>) -> Array2<f32> {
        self.outputs.clone()
    }

    fn zero_grad(&mut self) {}

    fn apply_gradients(&mut self, _optimizer: &mut dyn Optimizer) {}

    fn parameters(&self) -> Vec<f32> {
        Vec::new()
    }
}

/// Estimator that always predicts `labels` and never learns.
#[derive(Debug, Clone)]
pub struct FixedLabels {
    labels: Array1<f32>,
}

impl FixedLabels {
    pub fn new(labels: Array1<f32>) -> Self {
        Self { labels }
    }
}

impl BatchEstimator for FixedLabels {
    fn fit(&mut self, _x: ArrayView2<f32>, _y: ArrayView1<f32>, _options: FitOptions) -> Result<()> {
        Ok(())
    }

    fn predict(&self, _x: ArrayView2<f32>) -> Result<Array1<f32>> {
        Ok(self.labels.clone())
    }

    fn is_fitted(&self) -> bool {
        true
    }
}
