use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use super::optimizer::Optimizer;

/// A differentiable model trained by gradient steps.
///
/// `forward` caches whatever `backward` needs; gradients accumulate across
/// `backward` calls until `zero_grad`, which lets a caller sum several loss
/// terms before a single `apply_gradients`.
pub trait GradientNet {
    /// Builds a freshly initialised net for `inputs` features and `outputs` units.
    fn initialize(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self
    where
        Self: Sized;

    /// Prediction without touching cached state.
    fn infer(&self, x: ArrayView2<f32>) -> Array2<f32>;

    fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32>;

    /// Back-propagates the gradient of the loss w.r.t. the last `forward` output.
    fn backward(&mut self, d_out: Array2<f32>);

    /// Embedding of each row taken before the output layer.
    fn feature_extractor(&self, x: ArrayView2<f32>) -> Array2<f32>;

    fn zero_grad(&mut self);

    fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer);

    /// Flat copy of every trainable parameter, in layer order.
    fn parameters(&self) -> Vec<f32>;
}
