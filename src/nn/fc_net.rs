use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;

use super::activation::ActFn;
use super::dense::Dense;
use super::gradient_net::GradientNet;
use super::optimizer::Optimizer;

/// Hidden widths used by the default fully connected net.
pub const DEFAULT_HIDDEN_LAYERS: [usize; 3] = [32, 16, 8];

/// Fully connected net: ReLU hidden layers followed by a linear output layer.
#[derive(Debug, Clone)]
pub struct FcNet {
    layers: Vec<Dense>,
}

impl FcNet {
    pub fn new(inputs: usize, hidden: &[usize], outputs: usize, rng: &mut StdRng) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut width = inputs;
        for &h in hidden {
            layers.push(Dense::new((width, h), Some(ActFn::Relu), rng));
            width = h;
        }
        layers.push(Dense::new((width, outputs), None, rng));
        Self { layers }
    }

    pub fn size(&self) -> usize {
        self.layers.iter().map(Dense::size).sum()
    }

    pub fn outputs(&self) -> usize {
        self.layers.last().map(Dense::outputs).unwrap_or(0)
    }

    /// Backward pass that also returns the gradient w.r.t. the net's input.
    pub(crate) fn backward_to_input(&mut self, d_out: Array2<f32>) -> Array2<f32> {
        let mut d = d_out;
        for layer in self.layers.iter_mut().rev() {
            d = layer.backward(d);
        }
        d
    }
}

fn infer_through(layers: &[Dense], x: ArrayView2<f32>) -> Array2<f32> {
    let mut a = x.to_owned();
    for layer in layers {
        a = layer.infer(a.view());
    }
    a
}

impl GradientNet for FcNet {
    fn initialize(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        Self::new(inputs, &DEFAULT_HIDDEN_LAYERS, outputs, rng)
    }

    fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        infer_through(&self.layers, x)
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let mut a = x.to_owned();
        for layer in self.layers.iter_mut() {
            a = layer.forward(a.view());
        }
        a
    }

    fn backward(&mut self, d_out: Array2<f32>) {
        self.backward_to_input(d_out);
    }

    fn feature_extractor(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let hidden = self.layers.len().saturating_sub(1);
        infer_through(&self.layers[..hidden], x)
    }

    fn zero_grad(&mut self) {
        self.layers.iter_mut().for_each(Dense::zero_grad);
    }

    fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer) {
        for layer in self.layers.iter_mut() {
            layer.apply_gradients(optimizer);
        }
    }

    fn parameters(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.size());
        for layer in &self.layers {
            layer.extend_parameters(&mut out);
        }
        out
    }
}
