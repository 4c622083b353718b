use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::core::{Task, label_of};
use crate::error::{ModelError, Result};
use crate::learners::{BatchEstimator, argmax};
use crate::nn::GradientNet;

/// How a model is queried for predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// Forward pass returning one score (or value) per output unit.
    Forward,
    /// Batch `predict` returning labels or values directly.
    Predict,
}

/// Borrowed handle to the model a loss is evaluated against.
#[derive(Clone, Copy)]
pub enum Scorer<'a> {
    Forward(&'a dyn GradientNet),
    Predict(&'a dyn BatchEstimator),
}

impl Scorer<'_> {
    pub fn convention(&self) -> Convention {
        match self {
            Scorer::Forward(_) => Convention::Forward,
            Scorer::Predict(_) => Convention::Predict,
        }
    }
}

/// Task-aware error of a model on one window, evaluated before any update.
///
/// Classification reports `1 - accuracy`, regression the mean squared error.
/// With an outlier mask, flagged samples (mask value 1) drop out of both the
/// numerator and the denominator. A window where nothing is left to score
/// yields `NaN`, the same "no observation" value the streaming estimators use.
///
/// Implementations never mutate the model.
pub trait LossTemplate {
    fn task(&self) -> Task;

    fn convention(&self) -> Convention;

    fn loss(
        &self,
        scorer: Scorer<'_>,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        y_outlier: Option<ArrayView1<f32>>,
    ) -> Result<f64>;
}

fn convention_mismatch(expected: Convention, scorer: Scorer<'_>) -> ModelError {
    ModelError::configuration(format!(
        "Loss expects the {expected} calling convention, got {}",
        scorer.convention()
    ))
}

fn forward_labels(net: &dyn GradientNet, x: ArrayView2<f32>) -> Array1<f32> {
    net.infer(x)
        .rows()
        .into_iter()
        .map(|row| argmax(row) as f32)
        .collect()
}

fn forward_values(net: &dyn GradientNet, x: ArrayView2<f32>) -> Array1<f32> {
    let out = net.infer(x);
    Array1::from_iter(out.iter().copied())
}

/// Sample weights `1 - outlier`, or all ones without a mask.
fn keep_weights(len: usize, y_outlier: Option<ArrayView1<f32>>) -> Result<Array1<f64>> {
    match y_outlier {
        None => Ok(Array1::ones(len)),
        Some(mask) if mask.len() == len => Ok(mask.mapv(|o| 1.0 - f64::from(o))),
        Some(mask) => Err(ModelError::shape_mismatch("y_outlier", mask.len(), len)),
    }
}

fn weighted_mean(values: impl Iterator<Item = f64>, weights: &Array1<f64>) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (v, &w) in values.zip(weights.iter()) {
        num += v * w;
        den += w;
    }
    if den > 0.0 { num / den } else { f64::NAN }
}

fn error_rate(
    predicted: ArrayView1<f32>,
    y: ArrayView1<f32>,
    y_outlier: Option<ArrayView1<f32>>,
) -> Result<f64> {
    if predicted.len() != y.len() {
        return Err(ModelError::shape_mismatch("predictions", predicted.len(), y.len()));
    }
    let weights = keep_weights(y.len(), y_outlier)?;
    let matches = predicted.iter().zip(y.iter()).map(|(&p, &t)| {
        if label_of(p).is_some() && label_of(p) == label_of(t) {
            1.0
        } else {
            0.0
        }
    });
    Ok(1.0 - weighted_mean(matches, &weights))
}

fn squared_error(
    predicted: ArrayView1<f32>,
    y: ArrayView1<f32>,
    y_outlier: Option<ArrayView1<f32>>,
) -> Result<f64> {
    if predicted.len() != y.len() {
        return Err(ModelError::shape_mismatch("predictions", predicted.len(), y.len()));
    }
    let weights = keep_weights(y.len(), y_outlier)?;
    let errors = predicted.iter().zip(y.iter()).map(|(&p, &t)| {
        let d = f64::from(p) - f64::from(t);
        d * d
    });
    Ok(weighted_mean(errors, &weights))
}

/// Classification error of a forward-kind net (arg-max over outputs).
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassificationLoss;

/// Classification error of a predict-kind estimator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassificationTreeLoss;

/// Mean squared error of a forward-kind net; its output is flattened.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegressionLoss;

/// Mean squared error of a predict-kind estimator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegressionTreeLoss;

impl LossTemplate for ClassificationLoss {
    fn task(&self) -> Task {
        Task::Classification
    }

    fn convention(&self) -> Convention {
        Convention::Forward
    }

    fn loss(
        &self,
        scorer: Scorer<'_>,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        y_outlier: Option<ArrayView1<f32>>,
    ) -> Result<f64> {
        match scorer {
            Scorer::Forward(net) => error_rate(forward_labels(net, x).view(), y, y_outlier),
            other => Err(convention_mismatch(self.convention(), other)),
        }
    }
}

impl LossTemplate for ClassificationTreeLoss {
    fn task(&self) -> Task {
        Task::Classification
    }

    fn convention(&self) -> Convention {
        Convention::Predict
    }

    fn loss(
        &self,
        scorer: Scorer<'_>,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        y_outlier: Option<ArrayView1<f32>>,
    ) -> Result<f64> {
        match scorer {
            Scorer::Predict(estimator) => error_rate(estimator.predict(x)?.view(), y, y_outlier),
            other => Err(convention_mismatch(self.convention(), other)),
        }
    }
}

impl LossTemplate for RegressionLoss {
    fn task(&self) -> Task {
        Task::Regression
    }

    fn convention(&self) -> Convention {
        Convention::Forward
    }

    fn loss(
        &self,
        scorer: Scorer<'_>,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        y_outlier: Option<ArrayView1<f32>>,
    ) -> Result<f64> {
        match scorer {
            Scorer::Forward(net) => squared_error(forward_values(net, x).view(), y, y_outlier),
            other => Err(convention_mismatch(self.convention(), other)),
        }
    }
}

impl LossTemplate for RegressionTreeLoss {
    fn task(&self) -> Task {
        Task::Regression
    }

    fn convention(&self) -> Convention {
        Convention::Predict
    }

    fn loss(
        &self,
        scorer: Scorer<'_>,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        y_outlier: Option<ArrayView1<f32>>,
    ) -> Result<f64> {
        match scorer {
            Scorer::Predict(estimator) => squared_error(estimator.predict(x)?.view(), y, y_outlier),
            other => Err(convention_mismatch(self.convention(), other)),
        }
    }
}

/// The four loss strategies, indexed by task and calling convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum LossKind {
    Classification,
    ClassificationTree,
    Regression,
    RegressionTree,
}

impl LossKind {
    pub fn select(task: Task, convention: Convention) -> Self {
        match (task, convention) {
            (Task::Classification, Convention::Forward) => LossKind::Classification,
            (Task::Classification, Convention::Predict) => LossKind::ClassificationTree,
            (Task::Regression, Convention::Forward) => LossKind::Regression,
            (Task::Regression, Convention::Predict) => LossKind::RegressionTree,
        }
    }

    fn strategy(&self) -> &'static dyn LossTemplate {
        match self {
            LossKind::Classification => &ClassificationLoss,
            LossKind::ClassificationTree => &ClassificationTreeLoss,
            LossKind::Regression => &RegressionLoss,
            LossKind::RegressionTree => &RegressionTreeLoss,
        }
    }
}

impl LossTemplate for LossKind {
    fn task(&self) -> Task {
        self.strategy().task()
    }

    fn convention(&self) -> Convention {
        self.strategy().convention()
    }

    fn loss(
        &self,
        scorer: Scorer<'_>,
        x: ArrayView2<f32>,
        y: ArrayView1<f32>,
        y_outlier: Option<ArrayView1<f32>>,
    ) -> Result<f64> {
        self.strategy().loss(scorer, x, y, y_outlier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedLabels, FixedOutputs};
    use ndarray::{Array2, array};
    use strum::IntoEnumIterator;

    /// Ten samples, output_dim 2; the net mispredicts rows 2, 5 and 7.
    fn scenario_a() -> (FixedOutputs, Array2<f32>, Array1<f32>) {
        let y = array![0.0f32, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut predicted = y.clone();
        for i in [2, 5, 7] {
            predicted[i] = 1.0 - predicted[i];
        }
        let net = FixedOutputs::one_hot(predicted.view(), 2);
        (net, Array2::zeros((10, 3)), y)
    }

    #[test]
    fn unmasked_classification_is_error_rate() {
        let (net, x, y) = scenario_a();
        let loss = ClassificationLoss
            .loss(Scorer::Forward(&net), x.view(), y.view(), None)
            .unwrap();
        assert!((loss - 0.3).abs() < 1e-12);
    }

    #[test]
    fn masking_the_mismatches_gives_zero() {
        let (net, x, y) = scenario_a();
        let mut mask = Array1::zeros(10);
        for i in [2, 5, 7] {
            mask[i] = 1.0f32;
        }
        let loss = ClassificationLoss
            .loss(Scorer::Forward(&net), x.view(), y.view(), Some(mask.view()))
            .unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn masking_is_elementwise() {
        let (net, x, y) = scenario_a();
        // Flag one correct and one wrong sample: 2 wrong out of 8 kept.
        let mut mask = Array1::zeros(10);
        mask[0] = 1.0f32;
        mask[2] = 1.0;
        let loss = ClassificationLoss
            .loss(Scorer::Forward(&net), x.view(), y.view(), Some(mask.view()))
            .unwrap();
        assert!((loss - 0.25).abs() < 1e-12);
    }

    #[test]
    fn regression_is_exact_mse() {
        let est = FixedLabels::new(array![1.0f32, 2.0, 3.0, 6.0]);
        let x = Array2::zeros((4, 1));
        let y = array![1.0f32, 2.0, 3.0, 4.0];
        let loss = RegressionTreeLoss
            .loss(Scorer::Predict(&est), x.view(), y.view(), None)
            .unwrap();
        assert_eq!(loss, 1.0);

        let masked = RegressionTreeLoss
            .loss(
                Scorer::Predict(&est),
                x.view(),
                y.view(),
                Some(array![0.0f32, 0.0, 0.0, 1.0].view()),
            )
            .unwrap();
        assert_eq!(masked, 0.0);
    }

    #[test]
    fn forward_regression_flattens_output() {
        let net = FixedOutputs::new(array![[1.0f32], [2.0], [3.0], [6.0]]);
        let loss = RegressionLoss
            .loss(
                Scorer::Forward(&net),
                Array2::zeros((4, 2)).view(),
                array![1.0f32, 2.0, 3.0, 4.0].view(),
                None,
            )
            .unwrap();
        assert_eq!(loss, 1.0);
    }

    #[test]
    fn fully_masked_window_is_nan() {
        let est = FixedLabels::new(array![0.0f32, 1.0]);
        let loss = ClassificationTreeLoss
            .loss(
                Scorer::Predict(&est),
                Array2::zeros((2, 1)).view(),
                array![1.0f32, 0.0].view(),
                Some(array![1.0f32, 1.0].view()),
            )
            .unwrap();
        assert!(loss.is_nan());
    }

    #[test]
    fn wrong_convention_is_a_configuration_error() {
        let est = FixedLabels::new(array![0.0f32]);
        let err = ClassificationLoss
            .loss(
                Scorer::Predict(&est),
                Array2::zeros((1, 1)).view(),
                array![0.0f32].view(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn select_covers_task_by_convention() {
        for task in Task::iter() {
            for convention in Convention::iter() {
                let kind = LossKind::select(task, convention);
                assert_eq!(kind.task(), task);
                assert_eq!(kind.convention(), convention);
            }
        }
        assert_eq!(LossKind::select(Task::Regression, Convention::Predict).to_string(), "regression-tree");
    }
}
