mod model_config;
mod training_config;

pub use model_config::{
    BoostingParams, ClustererChoice, DetectorChoice, GradientParams, ModelConfig, ModelKind,
    StreamingParams, TabularParams, TreeParams,
};
pub use training_config::{Protocol, TrainingConfig};

use crate::error::Result;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Reads a JSON configuration file.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
