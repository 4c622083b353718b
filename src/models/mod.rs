mod batch_model;
mod cluster_model;
pub mod exemplar;
mod gradient_model;
mod outlier_model;
mod template;

pub use crate::config::ModelKind;
pub use batch_model::{BatchFitModel, GbdtModel, TabNetModel, TreeModel};
pub use cluster_model::ClusterModel;
pub use exemplar::{ExemplarBuffer, ExemplarSet};
pub use gradient_model::{ArmNetModel, GradientModel, MlpModel};
pub use outlier_model::OutlierModel;
pub use template::{ModelTemplate, TaskMetadata};
