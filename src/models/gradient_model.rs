use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::algorithms::{Convention, LossKind, LossTemplate, Scorer};
use crate::config::ModelKind;
use crate::core::{Device, Task, Window};
use crate::error::{ModelError, Result};
use crate::models::exemplar::ExemplarBuffer;
use crate::models::template::{ModelTemplate, TaskMetadata, check_batch_size, report_loss, not_processed};
use crate::nn::{ArmNet, Criterion, FcNet, GradientNet, Sgd};
use crate::streams::Dataloader;

/// Fully connected net model.
pub type MlpModel = GradientModel<FcNet>;
/// Field-embedding net model.
pub type ArmNetModel = GradientModel<ArmNet>;

#[derive(Debug, Clone)]
struct Binding {
    optimizer: Sgd,
    criterion: Criterion,
    loss: LossKind,
}

/// Model around a [`GradientNet`] trained by mini-batch SGD.
///
/// Supports both the naive protocol and exemplar replay. Ensemble replicas
/// share the primary net's architecture and are seeded `seed + 1 + i`.
#[derive(Debug, Clone)]
pub struct GradientModel<N: GradientNet> {
    kind: ModelKind,
    metadata: TaskMetadata,
    device: Device,
    net: N,
    ensemble: Vec<N>,
    binding: Option<Binding>,
    exemplars: ExemplarBuffer,
}

impl GradientModel<FcNet> {
    pub fn mlp(loader: &dyn Dataloader, ensemble: usize, device: Device, seed: u64) -> Result<Self> {
        Self::build(ModelKind::Mlp, loader, ensemble, device, seed)
    }
}

impl GradientModel<ArmNet> {
    pub fn arm_net(loader: &dyn Dataloader, ensemble: usize, device: Device, seed: u64) -> Result<Self> {
        Self::build(ModelKind::ArmNet, loader, ensemble, device, seed)
    }
}

impl<N: GradientNet> GradientModel<N> {
    fn build(kind: ModelKind, loader: &dyn Dataloader, ensemble: usize, device: Device, seed: u64) -> Result<Self> {
        let device = device.ensure_supported()?;
        let metadata = TaskMetadata::from_dataloader(loader);
        let (inputs, outputs) = (metadata.num_columns, metadata.net_outputs());

        let net = N::initialize(inputs, outputs, &mut StdRng::seed_from_u64(seed));
        let ensemble = (0..ensemble as u64)
            .map(|i| N::initialize(inputs, outputs, &mut StdRng::seed_from_u64(seed + 1 + i)))
            .collect();
        log::debug!("Built {kind} model: {inputs} inputs, {outputs} outputs, {} task", metadata.task);

        Ok(Self {
            kind,
            metadata,
            device,
            net,
            ensemble,
            binding: None,
            exemplars: ExemplarBuffer::new(),
        })
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn net_ensemble(&self) -> &[N] {
        &self.ensemble
    }

    pub fn exemplars(&self) -> &ExemplarBuffer {
        &self.exemplars
    }

    fn test(&self, window: &Window) -> Result<f64> {
        let binding = self.binding.as_ref().ok_or_else(|| not_processed(self.kind))?;
        let loss = binding.loss.loss(
            Scorer::Forward(&self.net),
            window.x.view(),
            window.y.view(),
            window.outlier_mask(),
        )?;
        report_loss(loss);
        Ok(loss)
    }

    /// Shared preamble of both protocols: validation and the optional pre-update test.
    fn begin(&self, window: &Window, batch_size: usize, need_test: bool) -> Result<Option<f64>> {
        if self.binding.is_none() {
            return Err(not_processed(self.kind));
        }
        check_batch_size(batch_size)?;
        if need_test { self.test(window).map(Some) } else { Ok(None) }
    }

    fn run_epochs(&mut self, window: &Window, batch_size: usize, epochs: usize, replay: bool) -> Result<()> {
        let Self {
            net,
            binding,
            exemplars,
            kind,
            ..
        } = self;
        let binding = binding.as_mut().ok_or_else(|| not_processed(*kind))?;
        let replay = if replay { exemplars.exemplars().filter(|set| !set.is_empty()) } else { None };

        for epoch in 0..epochs {
            log::info!("Starting epoch {}/{}", epoch + 1, epochs);
            for (xb, yb) in window.batches(batch_size) {
                net.zero_grad();
                let out = net.forward(xb);
                let (_, grad) = binding.criterion.loss_and_grad(out.view(), yb)?;
                net.backward(grad);

                if let Some(set) = replay {
                    let out = net.forward(set.x.view());
                    let (_, grad) = binding.criterion.loss_and_grad(out.view(), set.y.view())?;
                    net.backward(grad);
                }
                net.apply_gradients(&mut binding.optimizer);
            }
        }
        Ok(())
    }

    fn update_exemplars(&mut self, window: &Window, buffer_size: usize) {
        let net = &self.net;
        let embed = |x: ndarray::ArrayView2<f32>| net.feature_extractor(x);
        match self.metadata.task {
            Task::Classification => {
                self.exemplars
                    .update_per_class(window, buffer_size, self.metadata.output_dim, embed);
            }
            Task::Regression => {
                self.exemplars.select_global(window, buffer_size, embed);
            }
        }
    }
}

impl<N: GradientNet> ModelTemplate for GradientModel<N> {
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

    fn process_model(&mut self, learning_rate: Option<f32>) -> Result<()> {
        let learning_rate = learning_rate.ok_or_else(|| {
            ModelError::configuration(format!("The {} model needs a learning rate", self.kind))
        })?;
        let task = self.metadata.task;
        self.binding = Some(Binding {
            optimizer: Sgd::new(learning_rate),
            criterion: Criterion::for_task(task),
            loss: LossKind::select(task, Convention::Forward),
        });
        log::debug!("Processed {} model with learning rate {learning_rate}", self.kind);
        Ok(())
    }

    fn train_naive(
        &mut self,
        window: &Window,
        batch_size: usize,
        epochs: usize,
        need_test: bool,
    ) -> Result<Option<f64>> {
        let loss = self.begin(window, batch_size, need_test)?;
        self.run_epochs(window, batch_size, epochs, false)?;
        Ok(loss)
    }

    fn train_icarl(
        &mut self,
        window: &Window,
        batch_size: usize,
        epochs: usize,
        buffer_size: usize,
        need_test: bool,
    ) -> Result<Option<f64>> {
        let loss = self.begin(window, batch_size, need_test)?;
        self.run_epochs(window, batch_size, epochs, true)?;
        self.update_exemplars(window, buffer_size);
        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::{SeaFunction, SeaGenerator};
    use crate::testing::VecDataloader;
    use ndarray::array;

    fn sea(window_size: usize) -> SeaGenerator {
        SeaGenerator::new(SeaFunction::F1, false, 0, window_size, None, 11).unwrap()
    }

    fn toy_classification() -> (VecDataloader, Window) {
        let window = Window::new(
            array![[0.0f32, 0.1], [0.1, 0.0], [0.2, 0.2], [3.0, 3.1], [3.1, 3.0], [2.9, 3.2]],
            array![0.0f32, 0.0, 0.0, 1.0, 1.0, 1.0],
            None,
        )
        .unwrap();
        (VecDataloader::new(Task::Classification, 2, vec![window.clone()]), window)
    }

    #[test]
    fn construction_reads_metadata_and_seeds_ensemble() {
        let loader = sea(16);
        let model = MlpModel::mlp(&loader, 3, Device::Cpu, 7).unwrap();
        assert_eq!(model.model_kind(), ModelKind::Mlp);
        assert_eq!(model.ensemble_number(), 3);
        assert_eq!(model.task(), Task::Classification);
        assert_eq!(model.metadata().num_columns, 3);

        let replica = FcNet::initialize(3, 2, &mut StdRng::seed_from_u64(8));
        assert_eq!(model.net_ensemble()[0].parameters(), replica.parameters());
        assert_ne!(model.net().parameters(), replica.parameters());
    }

    #[test]
    fn accelerator_is_rejected() {
        let err = ArmNetModel::arm_net(&sea(8), 0, Device::Accelerator, 0).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn training_requires_processing_and_learning_rate() {
        let (loader, window) = toy_classification();
        let mut model = MlpModel::mlp(&loader, 0, Device::Cpu, 0).unwrap();
        assert!(matches!(
            model.train_naive(&window, 2, 1, false),
            Err(ModelError::Configuration(_))
        ));
        assert!(matches!(model.process_model(None), Err(ModelError::Configuration(_))));
        model.process_model(Some(0.1)).unwrap();
        assert!(matches!(
            model.train_naive(&window, 0, 1, false),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn naive_training_reports_pre_update_loss_and_learns() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (loader, window) = toy_classification();
        let mut model = MlpModel::mlp(&loader, 0, Device::Cpu, 1).unwrap();
        model.process_model(Some(0.1)).unwrap();

        let first = model.train_naive(&window, 3, 200, true).unwrap().unwrap();
        assert!((0.0..=1.0).contains(&first));
        let after = model.train_naive(&window, 3, 1, true).unwrap().unwrap();
        assert_eq!(after, 0.0);
        assert_eq!(model.train_naive(&window, 3, 1, false).unwrap(), None);
    }

    #[test]
    fn zero_epochs_leave_parameters_alone() {
        let (loader, window) = toy_classification();
        let mut model = MlpModel::mlp(&loader, 0, Device::Cpu, 2).unwrap();
        model.process_model(Some(0.5)).unwrap();
        let before = model.net().parameters();
        model.train_naive(&window, 2, 0, false).unwrap();
        assert_eq!(model.net().parameters(), before);
    }

    #[test]
    fn icarl_fills_per_class_buffer_up_to_cap() {
        let (loader, window) = toy_classification();
        let mut model = ArmNetModel::arm_net(&loader, 0, Device::Cpu, 3).unwrap();
        model.process_model(Some(0.05)).unwrap();

        model.train_icarl(&window, 2, 1, 4, false).unwrap();
        model.train_icarl(&window, 2, 1, 4, false).unwrap();

        let buffer = model.exemplars();
        assert_eq!(buffer.class_count(0), 2);
        assert_eq!(buffer.class_count(1), 2);
        assert_eq!(buffer.version(), 1);
        assert_eq!(buffer.exemplars().unwrap().y, array![0.0f32, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn stored_exemplars_join_the_gradient_step() {
        let (loader, window) = toy_classification();
        let mut fresh = MlpModel::mlp(&loader, 0, Device::Cpu, 5).unwrap();
        fresh.process_model(Some(0.1)).unwrap();

        // empty memory: replay adds nothing to the step
        let mut naive = fresh.clone();
        let mut replay = fresh.clone();
        naive.train_naive(&window, 3, 2, false).unwrap();
        replay.train_icarl(&window, 3, 2, 4, false).unwrap();
        assert_eq!(replay.net().parameters(), naive.net().parameters());

        // populated memory: the summed loss moves the weights differently
        assert!(!replay.exemplars().is_empty());
        let mut naive = replay.clone();
        let before = replay.net().parameters();
        naive.train_naive(&window, 3, 1, false).unwrap();
        replay.train_icarl(&window, 3, 1, 4, false).unwrap();
        assert_ne!(replay.net().parameters(), before);
        assert_ne!(replay.net().parameters(), naive.net().parameters());
    }

    #[test]
    fn icarl_with_zero_epochs_still_selects_exemplars() {
        let (loader, window) = toy_classification();
        let mut model = MlpModel::mlp(&loader, 0, Device::Cpu, 3).unwrap();
        model.process_model(Some(0.05)).unwrap();
        let before = model.net().parameters();
        model.train_icarl(&window, 2, 0, 2, false).unwrap();
        assert_eq!(model.net().parameters(), before);
        assert_eq!(model.exemplars().class_count(0), 1);
        assert_eq!(model.exemplars().class_count(1), 1);
    }

    #[test]
    fn regression_buffer_is_selected_once() {
        let first = Window::new(
            array![[0.0f32], [1.0], [2.0], [3.0], [4.0]],
            array![0.0f32, 2.0, 4.0, 6.0, 8.0],
            None,
        )
        .unwrap();
        let second = Window::new(array![[9.0f32], [10.0]], array![18.0f32, 20.0], None).unwrap();
        let loader = VecDataloader::new(Task::Regression, 1, vec![first.clone(), second.clone()]);
        let mut model = MlpModel::mlp(&loader, 0, Device::Cpu, 4).unwrap();
        model.process_model(Some(0.01)).unwrap();

        let loss = model.train_icarl(&first, 5, 1, 3, true).unwrap();
        assert!(loss.is_some());
        let selected = model.exemplars().exemplars().unwrap().clone();
        assert_eq!(selected.len(), 3);

        model.train_icarl(&second, 5, 1, 3, false).unwrap();
        assert_eq!(model.exemplars().exemplars(), Some(&selected));
        assert_eq!(model.exemplars().version(), 1);
    }
}
