use ndarray::{Array2, ArrayView2, Axis};
use rand::Rng;

use super::activation::ActFn;
use super::optimizer::Optimizer;

/// Fully connected layer `a = act(x·W + b)`.
///
/// `forward` caches its input and pre-activation so the following `backward`
/// can accumulate gradients; `infer` leaves the layer untouched.
#[derive(Debug, Clone)]
pub struct Dense {
    w: Array2<f32>,
    b: Array2<f32>,
    act_fn: Option<ActFn>,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,

    // Accumulated gradients
    dw: Array2<f32>,
    db: Array2<f32>,
}

impl Dense {
    /// Uniform `±1/sqrt(inputs)` initialisation.
    pub fn new<R: Rng>(dim: (usize, usize), act_fn: Option<ActFn>, rng: &mut R) -> Self {
        let bound = 1.0 / (dim.0.max(1) as f32).sqrt();
        let w = Array2::from_shape_fn(dim, |_| rng.random_range(-bound..bound));
        let b = Array2::from_shape_fn((1, dim.1), |_| rng.random_range(-bound..bound));
        Self {
            dw: Array2::zeros(w.raw_dim()),
            db: Array2::zeros(b.raw_dim()),
            w,
            b,
            act_fn,
            x: Array2::zeros((0, dim.0)),
            z: Array2::zeros((0, dim.1)),
        }
    }

    pub fn inputs(&self) -> usize {
        self.w.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.w.ncols()
    }

    pub fn size(&self) -> usize {
        self.w.len() + self.b.len()
    }

    pub fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let z = x.dot(&self.w) + &self.b;
        match self.act_fn {
            Some(act_fn) => z.mapv_into(|v| act_fn.f(v)),
            None => z,
        }
    }

    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        self.x = x.to_owned();
        self.z = x.dot(&self.w) + &self.b;
        match self.act_fn {
            Some(act_fn) => self.z.mapv(|v| act_fn.f(v)),
            None => self.z.clone(),
        }
    }

    /// Takes the gradient w.r.t. this layer's output and returns the one
    /// w.r.t. its input.
    pub fn backward(&mut self, mut d: Array2<f32>) -> Array2<f32> {
        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }
        self.dw += &self.x.t().dot(&d);
        self.db += &d.sum_axis(Axis(0)).insert_axis(Axis(0));
        d.dot(&self.w.t())
    }

    pub fn zero_grad(&mut self) {
        self.dw.fill(0.0);
        self.db.fill(0.0);
    }

    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer) {
        optimizer.update_params(self.w.view_mut(), self.dw.view());
        optimizer.update_params(self.b.view_mut(), self.db.view());
    }

    pub fn extend_parameters(&self, out: &mut Vec<f32>) {
        out.extend(self.w.iter().copied());
        out.extend(self.b.iter().copied());
    }
}
