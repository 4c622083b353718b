use crate::config::ModelKind;
use crate::core::{Device, Task, Window};
use crate::error::{ModelError, Result};
use crate::streams::Dataloader;

/// Shape information a model is built from, read once from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMetadata {
    pub num_columns: usize,
    pub output_dim: usize,
    pub window_size: usize,
    pub task: Task,
}

impl TaskMetadata {
    pub fn from_dataloader(loader: &dyn Dataloader) -> Self {
        Self {
            num_columns: loader.num_columns(),
            output_dim: loader.output_dim(),
            window_size: loader.window_size(),
            task: loader.task(),
        }
    }

    /// Width of a net's output layer: one unit per class, or one value.
    pub fn net_outputs(&self) -> usize {
        match self.task {
            Task::Classification => self.output_dim.max(1),
            Task::Regression => 1,
        }
    }
}

/// Uniform training contract shared by every model kind.
///
/// A model is constructed from a [`Dataloader`]'s metadata, bound to its
/// optimizer, criterion and loss by [`process_model`], then trained window by
/// window with either protocol. Every training call can report the error the
/// model made on the window *before* it was updated.
///
/// [`process_model`]: ModelTemplate::process_model
pub trait ModelTemplate {
    fn model_kind(&self) -> ModelKind;

    fn metadata(&self) -> &TaskMetadata;

    fn device(&self) -> Device;

    /// Number of ensemble replicas built next to the primary model.
    fn ensemble_number(&self) -> usize;

    fn task(&self) -> Task {
        self.metadata().task
    }

    /// Binds the training machinery. May be called again to rebind.
    fn process_model(&mut self, learning_rate: Option<f32>) -> Result<()>;

    /// Trains on `window` without any memory of earlier windows.
    fn train_naive(
        &mut self,
        window: &Window,
        batch_size: usize,
        epochs: usize,
        need_test: bool,
    ) -> Result<Option<f64>>;

    /// Trains on `window` while replaying stored exemplars, then refreshes
    /// the exemplar memory.
    fn train_icarl(
        &mut self,
        _window: &Window,
        _batch_size: usize,
        _epochs: usize,
        _buffer_size: usize,
        _need_test: bool,
    ) -> Result<Option<f64>> {
        Err(ModelError::unsupported(self.model_kind(), "train_icarl"))
    }
}

pub(crate) fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(ModelError::configuration("batch_size must be positive"));
    }
    Ok(())
}

pub(crate) fn not_processed(kind: ModelKind) -> ModelError {
    ModelError::configuration(format!(
        "The {kind} model must be processed before training"
    ))
}

pub(crate) fn report_loss(loss: f64) {
    log::info!("Current accuracy loss: {loss}");
}
