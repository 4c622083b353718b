use ndarray::{ArrayView2, ArrayViewMut2};

pub trait Optimizer {
    fn update_params(&mut self, params: ArrayViewMut2<'_, f32>, grad: ArrayView2<'_, f32>);
}

/// Plain stochastic gradient descent.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    /// Returns a new `Sgd`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for Sgd {
    /// Makes a step in the opposite direction of the gradient, with a length of `learning_rate`.
    fn update_params(&mut self, mut params: ArrayViewMut2<'_, f32>, grad: ArrayView2<'_, f32>) {
        params.scaled_add(-self.learning_rate, &grad);
    }
}
