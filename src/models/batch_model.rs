use crate::algorithms::{Convention, LossKind, LossTemplate, Scorer};
use crate::config::ModelKind;
use crate::core::{Device, Window};
use crate::error::Result;
use crate::learners::{BatchEstimator, BoostingOptions, DecisionTree, FitOptions, GradientBoosting, TabularNet};
use crate::models::template::{ModelTemplate, TaskMetadata, check_batch_size, not_processed, report_loss};
use crate::streams::Dataloader;

pub type TreeModel = BatchFitModel<DecisionTree>;
pub type GbdtModel = BatchFitModel<GradientBoosting>;
pub type TabNetModel = BatchFitModel<TabularNet>;

/// Model around a [`BatchEstimator`] that is refitted on every window.
///
/// Only the naive protocol is available; exemplar replay fails with
/// `UnsupportedOperation` and leaves the estimator as it was.
#[derive(Debug, Clone)]
pub struct BatchFitModel<E: BatchEstimator> {
    kind: ModelKind,
    metadata: TaskMetadata,
    device: Device,
    estimator: E,
    ensemble: Vec<E>,
    loss: Option<LossKind>,
}

impl BatchFitModel<DecisionTree> {
    pub fn tree(loader: &dyn Dataloader, ensemble: usize, device: Device, max_depth: Option<usize>) -> Result<Self> {
        let metadata = TaskMetadata::from_dataloader(loader);
        let make = || {
            let tree = DecisionTree::for_task(metadata.task, metadata.output_dim);
            match max_depth {
                Some(depth) => tree.with_max_depth(depth),
                None => tree,
            }
        };
        Self::build(ModelKind::Tree, metadata, device, ensemble, make)
    }
}

impl BatchFitModel<GradientBoosting> {
    pub fn gbdt(loader: &dyn Dataloader, ensemble: usize, device: Device, options: BoostingOptions) -> Result<Self> {
        let metadata = TaskMetadata::from_dataloader(loader);
        let make = || GradientBoosting::new(metadata.task, metadata.output_dim, options);
        Self::build(ModelKind::Gbdt, metadata, device, ensemble, make)
    }
}

impl BatchFitModel<TabularNet> {
    /// The tabular net never carries an ensemble.
    pub fn tab_net(loader: &dyn Dataloader, device: Device, learning_rate: Option<f32>) -> Result<Self> {
        let metadata = TaskMetadata::from_dataloader(loader);
        let make = || {
            let net = TabularNet::new(metadata.task, metadata.num_columns, metadata.output_dim);
            match learning_rate {
                Some(lr) => net.with_learning_rate(lr),
                None => net,
            }
        };
        Self::build(ModelKind::TabNet, metadata, device, 0, make)
    }
}

impl<E: BatchEstimator> BatchFitModel<E> {
    fn build(
        kind: ModelKind,
        metadata: TaskMetadata,
        device: Device,
        ensemble: usize,
        make: impl Fn() -> E,
    ) -> Result<Self> {
        let device = device.ensure_supported()?;
        log::debug!("Built {kind} model for a {} task", metadata.task);
        Ok(Self {
            kind,
            metadata,
            device,
            estimator: make(),
            ensemble: (0..ensemble).map(|_| make()).collect(),
            loss: None,
        })
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn net_ensemble(&self) -> &[E] {
        &self.ensemble
    }
}

impl<E: BatchEstimator> ModelTemplate for BatchFitModel<E> {
    fn model_kind(&self) -> ModelKind {
        self.kind
    }

    fn metadata(&self) -> &TaskMetadata {
        &self.metadata
    }

    fn device(&self) -> Device {
        self.device
    }

    fn ensemble_number(&self) -> usize {
        self.ensemble.len()
    }

    fn process_model(&mut self, _learning_rate: Option<f32>) -> Result<()> {
        self.loss = Some(LossKind::select(self.metadata.task, Convention::Predict));
        Ok(())
    }

    fn train_naive(
        &mut self,
        window: &Window,
        batch_size: usize,
        epochs: usize,
        need_test: bool,
    ) -> Result<Option<f64>> {
        let loss_kind = self.loss.ok_or_else(|| not_processed(self.kind))?;
        check_batch_size(batch_size)?;

        let loss = if !need_test {
            None
        } else if !self.estimator.is_fitted() {
            log::debug!("Skipping test: the {} model has not been fitted yet", self.kind);
            None
        } else {
            let loss = loss_kind.loss(
                Scorer::Predict(&self.estimator),
                window.x.view(),
                window.y.view(),
                window.outlier_mask(),
            )?;
            report_loss(loss);
            Some(loss)
        };

        self.estimator
            .fit(window.x.view(), window.y.view(), FitOptions { batch_size, epochs })?;
        Ok(loss)
    }
}
