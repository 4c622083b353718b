use crate::core::Device;
use crate::error::Result;
use crate::learners::BoostingOptions;
use crate::models::{ClusterModel, GbdtModel, MlpModel, ArmNetModel, ModelTemplate, OutlierModel, TabNetModel, TreeModel};
use crate::networks::{HalfSpaceTrees, LeaderClustering, Loda, SequentialKMeans};
use crate::streams::Dataloader;
use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::{Display, EnumDiscriminants, EnumIter, EnumMessage, EnumString, IntoStaticStr};

fn default_seed() -> u64 {
    0
}

fn default_rounds() -> usize {
    100
}

fn default_boosting_lr() -> f32 {
    0.1
}

fn default_boosting_depth() -> usize {
    3
}

/// Which model to build, with its construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, EnumDiscriminants)]
#[serde(tag = "type", content = "params", rename_all = "kebab-case")]
#[strum_discriminants(name(ModelKind))]
#[strum_discriminants(derive(EnumIter, EnumString, Display, IntoStaticStr, EnumMessage, Hash))]
#[strum_discriminants(strum(serialize_all = "kebab-case"))]
pub enum ModelConfig {
    #[strum_discriminants(strum(
        message = "MLP",
        detailed_message = "Fully connected net with hidden layers 32, 16 and 8."
    ))]
    Mlp(GradientParams),

    #[strum_discriminants(strum(
        message = "ARM-Net",
        detailed_message = "Field-embedding encoder followed by a fully connected body."
    ))]
    ArmNet(GradientParams),

    #[strum_discriminants(strum(
        message = "Decision Tree",
        detailed_message = "CART tree refitted on every window."
    ))]
    Tree(TreeParams),

    #[strum_discriminants(strum(
        message = "Gradient Boosting",
        detailed_message = "Boosted depth-limited regression trees refitted on every window."
    ))]
    Gbdt(BoostingParams),

    #[strum_discriminants(strum(
        message = "Tabular Net",
        detailed_message = "Feature-gated MLP retrained from scratch on every window."
    ))]
    TabNet(TabularParams),

    #[strum_discriminants(strum(
        message = "Streaming Clusterer",
        detailed_message = "Unsupervised clusterer fed one sample at a time."
    ))]
    Cluster(StreamingParams<ClustererChoice>),

    #[strum_discriminants(strum(
        message = "Streaming Outlier Detector",
        detailed_message = "Unsupervised anomaly detector fed one sample at a time."
    ))]
    OutlierDetector(StreamingParams<DetectorChoice>),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct GradientParams {
    #[serde(default)]
    #[schemars(title = "Ensemble", description = "Number of replicas built next to the primary net")]
    pub ensemble: usize,

    #[serde(default)]
    #[schemars(title = "Device")]
    pub device: Device,

    #[serde(default = "default_seed")]
    #[schemars(title = "Seed", description = "Seed of the primary net; replica i uses seed + 1 + i")]
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct TreeParams {
    #[serde(default)]
    pub ensemble: usize,

    #[serde(default)]
    pub device: Device,

    #[serde(default)]
    #[schemars(title = "Max depth", description = "None grows until leaves are pure")]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BoostingParams {
    #[serde(default)]
    pub ensemble: usize,

    #[serde(default)]
    pub device: Device,

    #[serde(default = "default_rounds")]
    #[schemars(title = "Rounds", range(min = 1))]
    pub rounds: usize,

    #[serde(default = "default_boosting_lr")]
    #[schemars(title = "Learning rate")]
    pub learning_rate: f32,

    #[serde(default = "default_boosting_depth")]
    #[schemars(title = "Tree depth", range(min = 1))]
    pub max_depth: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            ensemble: 0,
            device: Device::default(),
            rounds: default_rounds(),
            learning_rate: default_boosting_lr(),
            max_depth: default_boosting_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct TabularParams {
    #[serde(default)]
    pub device: Device,

    #[serde(default)]
    #[schemars(title = "Learning rate", description = "SGD step size used on every refit")]
    pub learning_rate: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct StreamingParams<A> {
    pub algorithm: A,

    #[serde(default)]
    pub ensemble: usize,

    #[serde(default)]
    pub device: Device,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ClustererChoice {
    KMeans { k: usize },
    Leader { radius: f32, max_clusters: usize },
}

impl Default for ClustererChoice {
    fn default() -> Self {
        ClustererChoice::KMeans { k: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum DetectorChoice {
    HalfSpaceTrees {
        n_trees: usize,
        height: usize,
        window_size: usize,
        seed: u64,
    },
    Loda {
        n_projections: usize,
        bins: usize,
        warmup: usize,
        seed: u64,
    },
}

impl Default for DetectorChoice {
    fn default() -> Self {
        DetectorChoice::HalfSpaceTrees {
            n_trees: 10,
            height: 8,
            window_size: 250,
            seed: 0,
        }
    }
}

impl ModelConfig {
    pub fn kind(&self) -> ModelKind {
        ModelKind::from(self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        super::load_json(path)
    }

    pub fn schema() -> Schema {
        schema_for!(ModelConfig)
    }

    /// Builds the configured model from the loader's metadata.
    pub fn build(&self, loader: &dyn Dataloader) -> Result<Box<dyn ModelTemplate>> {
        log::info!("Building {} model", self.kind());
        Ok(match self {
            ModelConfig::Mlp(p) => Box::new(MlpModel::mlp(loader, p.ensemble, p.device, p.seed)?),
            ModelConfig::ArmNet(p) => Box::new(ArmNetModel::arm_net(loader, p.ensemble, p.device, p.seed)?),
            ModelConfig::Tree(p) => Box::new(TreeModel::tree(loader, p.ensemble, p.device, p.max_depth)?),
            ModelConfig::Gbdt(p) => {
                let options = BoostingOptions {
                    rounds: p.rounds,
                    learning_rate: p.learning_rate,
                    max_depth: p.max_depth,
                };
                Box::new(GbdtModel::gbdt(loader, p.ensemble, p.device, options)?)
            }
            ModelConfig::TabNet(p) => Box::new(TabNetModel::tab_net(loader, p.device, p.learning_rate)?),
            ModelConfig::Cluster(p) => match p.algorithm {
                ClustererChoice::KMeans { k } => {
                    Box::new(ClusterModel::new(loader, SequentialKMeans::new(k), p.ensemble, p.device)?)
                }
                ClustererChoice::Leader { radius, max_clusters } => Box::new(ClusterModel::new(
                    loader,
                    LeaderClustering::new(radius, max_clusters),
                    p.ensemble,
                    p.device,
                )?),
            },
            ModelConfig::OutlierDetector(p) => match p.algorithm {
                DetectorChoice::HalfSpaceTrees {
                    n_trees,
                    height,
                    window_size,
                    seed,
                } => Box::new(OutlierModel::new(
                    loader,
                    HalfSpaceTrees::new(n_trees, height, window_size, seed),
                    p.ensemble,
                    p.device,
                )?),
                DetectorChoice::Loda {
                    n_projections,
                    bins,
                    warmup,
                    seed,
                } => Box::new(OutlierModel::new(
                    loader,
                    Loda::new(n_projections, bins, warmup, seed),
                    p.ensemble,
                    p.device,
                )?),
            },
        })
    }
}
