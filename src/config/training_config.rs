use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::{Display, EnumIter, EnumString};

/// How each window is trained.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Protocol {
    /// Train on the current window only.
    #[default]
    Naive,
    /// Replay stored exemplars and refresh the memory after each window.
    Icarl,
}

fn default_batch_size() -> usize {
    64
}

fn default_epochs() -> usize {
    1
}

fn default_buffer_size() -> usize {
    200
}

fn default_need_test() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainingConfig {
    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default)]
    #[schemars(title = "Learning rate", description = "Optimizer step size; required by gradient models, ignored by every other kind")]
    pub learning_rate: Option<f32>,

    #[serde(default = "default_batch_size")]
    #[schemars(range(min = 1))]
    pub batch_size: usize,

    #[serde(default = "default_epochs")]
    #[schemars(range(min = 1))]
    pub epochs: usize,

    #[serde(default = "default_buffer_size")]
    #[schemars(title = "Buffer size", description = "Exemplar capacity used by the icarl protocol")]
    pub buffer_size: usize,

    #[serde(default = "default_need_test")]
    #[schemars(title = "Test before training", description = "Score each window before the model learns from it")]
    pub need_test: bool,

    #[serde(default)]
    #[schemars(title = "Max windows", description = "Stop after this many windows; None drains the loader")]
    pub max_windows: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            learning_rate: None,
            batch_size: default_batch_size(),
            epochs: default_epochs(),
            buffer_size: default_buffer_size(),
            need_test: default_need_test(),
            max_windows: None,
        }
    }
}

impl TrainingConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        super::load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use std::io::Write;
    use std::str::FromStr;

    #[test]
    fn empty_object_takes_defaults() {
        let cfg: TrainingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, TrainingConfig::default());
        assert_eq!(cfg.batch_size, 64);
        assert!(cfg.need_test);
    }

    #[test]
    fn learning_rate_schema_states_it_is_required_for_gradient_models() {
        let schema = serde_json::to_value(schemars::schema_for!(TrainingConfig)).unwrap();
        let description = schema["properties"]["learning_rate"]["description"].as_str().unwrap();
        assert!(description.contains("required by gradient models"));
        assert!(!description.contains("fall back"));
    }

    #[test]
    fn protocol_names() {
        assert_eq!(Protocol::from_str("icarl").unwrap(), Protocol::Icarl);
        assert_eq!(Protocol::Naive.to_string(), "naive");
        let cfg: TrainingConfig = serde_json::from_str(r#"{"protocol": "icarl", "buffer_size": 4}"#).unwrap();
        assert_eq!(cfg.protocol, Protocol::Icarl);
        assert_eq!(cfg.buffer_size, 4);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"epochs": 3, "max_windows": 5, "learning_rate": 0.5}}"#).unwrap();
        let cfg = TrainingConfig::load(file.path()).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.max_windows, Some(5));
        assert_eq!(cfg.learning_rate, Some(0.5));
    }

    #[test]
    fn load_reports_io_and_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TrainingConfig::load(dir.path().join("missing.json")),
            Err(ModelError::Io(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(TrainingConfig::load(file.path()), Err(ModelError::Json(_))));
    }
}
