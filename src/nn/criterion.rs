use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::core::{Task, label_of};
use crate::error::{ModelError, Result};

/// Training objective bound to a model at `process_model` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Softmax cross-entropy over integer class labels.
    CrossEntropy,
    /// Mean squared error over the flattened output.
    Mse,
}

impl Criterion {
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Classification => Criterion::CrossEntropy,
            Task::Regression => Criterion::Mse,
        }
    }

    /// Returns the mean loss over the batch and its gradient w.r.t. `out`.
    pub fn loss_and_grad(
        &self,
        out: ArrayView2<f32>,
        y: ArrayView1<f32>,
    ) -> Result<(f32, Array2<f32>)> {
        match self {
            Criterion::CrossEntropy => cross_entropy(out, y),
            Criterion::Mse => mse(out, y),
        }
    }
}

fn cross_entropy(out: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<(f32, Array2<f32>)> {
    if out.nrows() != y.len() {
        return Err(ModelError::shape_mismatch("criterion rows", y.len(), out.nrows()));
    }
    let n = out.nrows().max(1) as f32;
    let classes = out.ncols();
    let mut grad = softmax_rows(out);
    let mut total = 0.0;

    for (mut row, &label) in grad.axis_iter_mut(Axis(0)).zip(y.iter()) {
        let c = match label_of(label) {
            Some(c) if c < classes => c,
            _ => return Err(ModelError::shape_mismatch("class label", label as usize, classes)),
        };
        total -= row[c].max(f32::MIN_POSITIVE).ln();
        row[c] -= 1.0;
    }
    grad.mapv_inplace(|g| g / n);
    Ok((total / n, grad))
}

fn mse(out: ArrayView2<f32>, y: ArrayView1<f32>) -> Result<(f32, Array2<f32>)> {
    if out.len() != y.len() {
        return Err(ModelError::shape_mismatch("regression output", out.len(), y.len()));
    }
    let n = y.len().max(1) as f32;
    let mut grad = out.to_owned();
    let mut total = 0.0;
    for (g, &target) in grad.iter_mut().zip(y.iter()) {
        let diff = *g - target;
        total += diff * diff;
        *g = 2.0 * diff / n;
    }
    Ok((total / n, grad))
}

/// Numerically stable row-wise softmax.
pub fn softmax_rows(out: ArrayView2<f32>) -> Array2<f32> {
    let mut probs = out.to_owned();
    for mut row in probs.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
    probs
}
