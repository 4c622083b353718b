use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::Result;

/// Knobs a batch fit may honour; estimators that refit in one shot ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    pub batch_size: usize,
    pub epochs: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            batch_size: 64,
            epochs: 1,
        }
    }
}

/// Estimator trained by refitting on a whole window and queried with a
/// `predict`-style batch call.
///
/// For classification `predict` yields class indices encoded as floats, for
/// regression the predicted values.
pub trait BatchEstimator {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, options: FitOptions) -> Result<()>;

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>>;

    fn is_fitted(&self) -> bool;
}
