use ndarray::{Array1, ArrayView2};

use crate::config::ModelKind;
use crate::core::{Device, Window};
use crate::error::Result;
use crate::models::template::{ModelTemplate, TaskMetadata, check_batch_size, not_processed};
use crate::networks::{ClusterNet, StreamingClusterer};
use crate::streams::Dataloader;

/// Model around a streaming clusterer.
///
/// Training feeds every row of the window to the clusterer once per epoch.
/// There is no supervised loss, so a requested test reports nothing.
#[derive(Debug, Clone)]
pub struct ClusterModel<C: StreamingClusterer + Clone> {
    metadata: TaskMetadata,
    device: Device,
    net: ClusterNet<C>,
    ensemble: Vec<ClusterNet<C>>,
    processed: bool,
}

impl<C: StreamingClusterer + Clone> ClusterModel<C> {
    pub fn new(loader: &dyn Dataloader, clusterer: C, ensemble: usize, device: Device) -> Result<Self> {
        let device = device.ensure_supported()?;
        Ok(Self {
            metadata: TaskMetadata::from_dataloader(loader),
            device,
            ensemble: (0..ensemble).map(|_| ClusterNet::new(clusterer.clone())).collect(),
            net: ClusterNet::new(clusterer),
            processed: false,
        })
    }

    pub fn net(&self) -> &ClusterNet<C> {
        &self.net
    }

    pub fn net_ensemble(&self) -> &[ClusterNet<C>] {
        &self.ensemble
    }

    pub fn predict_cluster(&self, x: ArrayView2<f32>) -> Array1<usize> {
        self.net.forward(x)
    }
}

impl<C: StreamingClusterer + Clone> ModelTemplate for ClusterModel<C> {
    fn model_kind(&self) -> ModelKind {
        ModelKind::Cluster
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
            return Err(not_processed(ModelKind::Cluster));
        }
        check_batch_size(batch_size)?;
        if need_test {
            log::debug!("Clustering has no supervised loss; skipping test");
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
    use crate::error::ModelError;
    use crate::networks::SequentialKMeans;
    use crate::testing::VecDataloader;
    use ndarray::array;

    #[test]
    fn trains_and_assigns_clusters() {
        let window = Window::new(
            array![[0.0f32], [10.0], [0.5], [9.5]],
            array![0.0f32, 1.0, 0.0, 1.0],
            None,
        )
        .unwrap();
        let loader = VecDataloader::new(Task::Classification, 2, vec![window.clone()]);
        let mut model = ClusterModel::new(&loader, SequentialKMeans::new(2), 1, Device::Cpu).unwrap();
        assert_eq!(model.model_kind(), ModelKind::Cluster);
        assert_eq!(model.ensemble_number(), 1);

        model.process_model(None).unwrap();
        assert_eq!(model.train_naive(&window, 2, 1, true).unwrap(), None);

        let assigned = model.predict_cluster(window.x.view());
        assert_eq!(assigned.len(), 4);
        assert_eq!(assigned[0], assigned[2]);
        assert_eq!(assigned[1], assigned[3]);
        assert_ne!(assigned[0], assigned[1]);
    }

    #[test]
    fn icarl_is_unsupported() {
        let window = Window::new(array![[0.0f32]], array![0.0f32], None).unwrap();
        let loader = VecDataloader::new(Task::Classification, 2, vec![window.clone()]);
        let mut model = ClusterModel::new(&loader, SequentialKMeans::new(2), 0, Device::Cpu).unwrap();
        model.process_model(None).unwrap();
        let err = model.train_icarl(&window, 1, 1, 4, false).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedOperation { model: ModelKind::Cluster, .. }));
        assert_eq!(model.net().clusterer().n_clusters(), 0);
    }
}
