use crate::config::{Protocol, TrainingConfig};
use crate::error::{ModelError, Result};
use crate::evaluation::{BasicEstimator, Estimator, LearningCurve, Measurement, Snapshot};
use crate::models::ModelTemplate;
use crate::streams::Dataloader;
use std::sync::mpsc::Sender;
use std::time::Instant;

/// Drives a model over a dataloader one window at a time.
///
/// Each window is handed to the configured protocol; the loss the model
/// reports before updating becomes one [`Snapshot`] on the learning curve.
pub struct WindowedTrainer {
    model: Box<dyn ModelTemplate>,
    dataloader: Box<dyn Dataloader>,
    config: TrainingConfig,

    curve: LearningCurve,
    mean_loss: BasicEstimator,
    last_loss: f64,

    windows: u64,
    instances: u64,
    start_time: Instant,

    progress_tx: Option<Sender<Snapshot>>,
}

impl WindowedTrainer {
    pub fn new(
        model: Box<dyn ModelTemplate>,
        dataloader: Box<dyn Dataloader>,
        config: TrainingConfig,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(ModelError::configuration("batch_size must be > 0"));
        }
        if config.epochs == 0 {
            return Err(ModelError::configuration("epochs must be > 0"));
        }
        if config.protocol == Protocol::Icarl && config.buffer_size == 0 {
            return Err(ModelError::configuration(
                "buffer_size must be > 0 for the icarl protocol",
            ));
        }

        Ok(Self {
            model,
            dataloader,
            config,
            curve: LearningCurve::default(),
            mean_loss: BasicEstimator::default(),
            last_loss: f64::NAN,
            windows: 0,
            instances: 0,
            start_time: Instant::now(),
            progress_tx: None,
        })
    }

    pub fn with_progress(mut self, tx: Sender<Snapshot>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn run(&mut self) -> Result<()> {
        self.model.process_model(self.config.learning_rate)?;
        self.start_time = Instant::now();
        log::info!(
            "Training {} model with the {} protocol",
            self.model.model_kind(),
            self.config.protocol
        );

        while self.dataloader.has_more_windows() {
            if let Some(n) = self.config.max_windows {
                if self.windows >= n as u64 {
                    break;
                }
            }
            let Some(window) = self.dataloader.next_window() else {
                break;
            };

            let cfg = &self.config;
            let loss = match cfg.protocol {
                Protocol::Naive => {
                    self.model
                        .train_naive(&window, cfg.batch_size, cfg.epochs, cfg.need_test)?
                }
                Protocol::Icarl => self.model.train_icarl(
                    &window,
                    cfg.batch_size,
                    cfg.epochs,
                    cfg.buffer_size,
                    cfg.need_test,
                )?,
            };

            self.windows += 1;
            self.instances += window.len() as u64;
            self.last_loss = loss.unwrap_or(f64::NAN);
            self.mean_loss.add(self.last_loss);
            self.push_snapshot();
        }

        log::info!(
            "Finished after {} windows, mean loss {}",
            self.windows,
            self.mean_loss.estimation()
        );
        Ok(())
    }

    pub fn curve(&self) -> &LearningCurve {
        &self.curve
    }

    pub fn model(&self) -> &dyn ModelTemplate {
        self.model.as_ref()
    }

    pub fn performance(&self) -> Vec<Measurement> {
        vec![
            Measurement::new("windows", self.windows as f64),
            Measurement::new("mean_loss", self.mean_loss.estimation()),
            Measurement::new("last_loss", self.last_loss),
        ]
    }

    fn push_snapshot(&mut self) {
        let snapshot = Snapshot {
            windows_seen: self.windows,
            instances_seen: self.instances,
            loss: self.last_loss,
            mean_loss: self.mean_loss.estimation(),
            seconds: self.start_time.elapsed().as_secs_f64(),
        };
        log::debug!("{snapshot}");

        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(snapshot);
        }

        self.curve.push(snapshot);
    }
}
