use ndarray::ArrayView2;

use crate::config::ModelKind;
use crate::core::{Device, Window};
use crate::error::Result;
use crate::models::template::{ModelTemplate, TaskMetadata, check_batch_size, not_processed};
use crate::networks::{OutlierDetectorNet, OutlierOutput, StreamingDetector};
use crate::streams::Dataloader;

/// Model around a streaming outlier detector.
#[derive(Debug, Clone)]
pub struct OutlierModel<D: StreamingDetector + Clone> {
    metadata: TaskMetadata,
    device: Device,
    net: OutlierDetectorNet<D>,
    ensemble: Vec<OutlierDetectorNet<D>>,
    processed: bool,
}

impl<D: StreamingDetector + Clone> OutlierModel<D> {
    pub fn new(loader: &dyn Dataloader, detector: D, ensemble: usize, device: Device) -> Result<Self> {
        let device = device.ensure_supported()?;
        Ok(Self {
            metadata: TaskMetadata::from_dataloader(loader),
            device,
            ensemble: (0..ensemble).map(|_| OutlierDetectorNet::new(detector.clone())).collect(),
            net: OutlierDetectorNet::new(detector),
            processed: false,
        })
    }

    pub fn net(&self) -> &OutlierDetectorNet<D> {
        &self.net
    }

    pub fn net_ensemble(&self) -> &[OutlierDetectorNet<D>] {
        &self.ensemble
    }

    pub fn detect_outliers(&self, x: ArrayView2<f32>) -> OutlierOutput {
        self.net.forward(x)
    }
}

impl<D: StreamingDetector + Clone> ModelTemplate for OutlierModel<D> {
    fn model_kind(&self) -> ModelKind {
        ModelKind::OutlierDetector
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
        self.processed = true;
        Ok(())
    }

    fn train_naive(
        &mut self,
        window: &Window,
        batch_size: usize,
        epochs: usize,
        need_test: bool,
    ) -> Result<Option<f64>> {
        if !self.processed {
            return Err(not_processed(ModelKind::OutlierDetector));
        }
        check_batch_size(batch_size)?;
        if need_test {
            log::debug!("Outlier detection has no supervised loss; skipping test");
        }
        for _ in 0..epochs {
            self.net.fit(window.x.view());
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Task;
    use crate::networks::Loda;
    use crate::testing::VecDataloader;
    use ndarray::{Array1, Array2};

    #[test]
    fn detects_after_fitting() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| ((i + j) % 5) as f32);
        let window = Window::new(x, Array1::zeros(40), None).unwrap();
        let loader = VecDataloader::new(Task::Classification, 2, vec![window.clone()]);
        let mut model = OutlierModel::new(&loader, Loda::new(10, 5, 20, 0), 0, Device::Cpu).unwrap();
        model.process_model(None).unwrap();
        assert_eq!(model.train_naive(&window, 10, 1, true).unwrap(), None);
        assert!(model.net().detector().is_ready());

        let out = model.detect_outliers(window.x.view());
        assert_eq!(out.labels.len(), 40);
        assert_eq!(out.scores.len(), 40);
    }
}
