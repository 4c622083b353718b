use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::core::Task;
use crate::error::{ModelError, Result};
use crate::learners::gradient_boosting::argmax;
use crate::learners::{BatchEstimator, FitOptions};
use crate::nn::{ActFn, Criterion, FcNet, GradientNet, Optimizer, Sgd};

pub const TABULAR_HIDDEN_LAYERS: [usize; 2] = [32, 16];
const TABULAR_SEED: u64 = 0;
const TABULAR_LEARNING_RATE: f32 = 0.02;

/// Per-feature sigmoid gate `x'[i, j] = x[i, j] * sigmoid(w[j])`.
#[derive(Debug, Clone)]
struct FeatureGate {
    w: Array2<f32>,
    dw: Array2<f32>,
    x: Array2<f32>,
}

impl FeatureGate {
    fn new(features: usize) -> Self {
        Self {
            w: Array2::zeros((1, features)),
            dw: Array2::zeros((1, features)),
            x: Array2::zeros((0, features)),
        }
    }

    fn gates(&self) -> Array2<f32> {
        self.w.mapv(|v| ActFn::Sigmoid.f(v))
    }

    fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        &x * &self.gates()
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        self.x = x.to_owned();
        self.infer(x)
    }

    fn backward(&mut self, d: ArrayView2<f32>) {
        let slopes = self.w.mapv(|v| ActFn::Sigmoid.df(v));
        let dg = (&d * &self.x).sum_axis(Axis(0)).insert_axis(Axis(0));
        self.dw += &(dg * slopes);
    }
}

/// Tabular deep net: a learned feature-gating layer in front of an MLP,
/// trained with mini-batch SGD on every refit.
///
/// Each `fit` starts from the same seeded initialisation, so a refit only
/// depends on the data it is given.
#[derive(Debug, Clone)]
pub struct TabularNet {
    task: Task,
    inputs: usize,
    outputs: usize,
    learning_rate: f32,
    state: Option<(FeatureGate, FcNet)>,
}

impl TabularNet {
    pub fn new(task: Task, inputs: usize, num_classes: usize) -> Self {
        let outputs = match task {
            Task::Classification => num_classes.max(1),
            Task::Regression => 1,
        };
        Self {
            task,
            inputs,
            outputs,
            learning_rate: TABULAR_LEARNING_RATE,
            state: None,
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    fn raw_output(&self, x: ArrayView2<f32>) -> Option<Array2<f32>> {
        let (gate, body) = self.state.as_ref()?;
        Some(body.infer(gate.infer(x).view()))
    }
}

impl BatchEstimator for TabularNet {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<f32>, options: FitOptions) -> Result<()> {
        if x.ncols() != self.inputs {
            return Err(ModelError::shape_mismatch("tabular net inputs", x.ncols(), self.inputs));
        }
        if x.nrows() != y.len() {
            return Err(ModelError::shape_mismatch("x rows", x.nrows(), y.len()));
        }
        if options.batch_size == 0 {
            return Err(ModelError::configuration("batch_size must be positive"));
        }
        if options.epochs == 0 {
            log::debug!("Tabular net keeps its current weights: zero epochs requested");
            return Ok(());
        }

        let mut rng = StdRng::seed_from_u64(TABULAR_SEED);
        let mut gate = FeatureGate::new(self.inputs);
        let mut body = FcNet::new(self.inputs, &TABULAR_HIDDEN_LAYERS, self.outputs, &mut rng);
        let criterion = Criterion::for_task(self.task);
        let mut sgd = Sgd::new(self.learning_rate);

        for _ in 0..options.epochs {
            let mut start = 0;
            while start < y.len() {
                let end = (start + options.batch_size).min(y.len());
                let xb = x.slice(ndarray::s![start..end, ..]);
                let yb = y.slice(ndarray::s![start..end]);

                body.zero_grad();
                gate.dw.fill(0.0);
                let gated = gate.forward(xb);
                let out = body.forward(gated.view());
                let (_, grad) = criterion.loss_and_grad(out.view(), yb)?;
                let d_gated = body.backward_to_input(grad);
                gate.backward(d_gated.view());

                body.apply_gradients(&mut sgd);
                sgd.update_params(gate.w.view_mut(), gate.dw.view());
                start = end;
            }
        }

        self.state = Some((gate, body));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<f32>> {
        let out = self
            .raw_output(x)
            .ok_or_else(|| ModelError::configuration("Tabular net has not been fitted"))?;
        Ok(match self.task {
            Task::Regression => out.column(0).to_owned(),
            Task::Classification => out.rows().into_iter().map(|r| argmax(r) as f32).collect(),
        })
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Array2<f32>, Array1<f32>) {
        let x = array![
            [0.0f32, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.1, 0.2],
            [2.0, 2.1],
            [2.1, 2.0],
            [1.9, 2.0],
            [2.0, 1.9]
        ];
        let y = array![0.0f32, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn learns_separable_classes() {
        let (x, y) = blobs();
        let mut net = TabularNet::new(Task::Classification, 2, 2).with_learning_rate(0.1);
        net.fit(x.view(), y.view(), FitOptions { batch_size: 4, epochs: 300 }).unwrap();
        assert_eq!(net.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn refit_is_deterministic() {
        let (x, y) = blobs();
        let options = FitOptions { batch_size: 2, epochs: 5 };
        let mut a = TabularNet::new(Task::Regression, 2, 1);
        let mut b = TabularNet::new(Task::Regression, 2, 1);
        a.fit(x.view(), y.view(), options).unwrap();
        b.fit(x.view(), y.view(), options).unwrap();
        b.fit(x.view(), y.view(), options).unwrap();
        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn zero_epochs_keep_current_weights() {
        let (x, y) = blobs();
        let mut net = TabularNet::new(Task::Regression, 2, 1);
        assert!(net.fit(x.view(), y.view(), FitOptions { batch_size: 0, epochs: 0 }).is_err());
        net.fit(x.view(), y.view(), FitOptions { batch_size: 2, epochs: 0 }).unwrap();
        assert!(!net.is_fitted());

        net.fit(x.view(), y.view(), FitOptions { batch_size: 2, epochs: 3 }).unwrap();
        let before = net.predict(x.view()).unwrap();
        let shifted = y.mapv(|v| v + 9.0);
        net.fit(x.view(), shifted.view(), FitOptions { batch_size: 2, epochs: 0 })
            .unwrap();
        assert_eq!(net.predict(x.view()).unwrap(), before);
    }

    #[test]
    fn gates_start_half_open() {
        let gate = FeatureGate::new(3);
        let out = gate.infer(array![[2.0f32, 4.0, -2.0]].view());
        assert_eq!(out, array![[1.0f32, 2.0, -1.0]]);
    }

    #[test]
    fn rejects_wrong_width_and_unfitted_predict() {
        let mut net = TabularNet::new(Task::Classification, 3, 2);
        assert!(net.predict(array![[0.0f32, 0.0, 0.0]].view()).is_err());
        let err = net
            .fit(array![[0.0f32]].view(), array![0.0f32].view(), FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }
}
