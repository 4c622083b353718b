use crate::error::{ModelError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Where a model keeps its parameters.
///
/// The ndarray backend only runs on the host processor, so models refuse
/// `Accelerator` when they are built instead of silently falling back.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Accelerator,
}

impl Device {
    pub fn ensure_supported(self) -> Result<Self> {
        match self {
            Device::Cpu => Ok(self),
            Device::Accelerator => Err(ModelError::configuration(
                "Device not supported: no accelerator backend is available",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cpu_is_supported() {
        assert_eq!(Device::Cpu.ensure_supported().unwrap(), Device::Cpu);
        assert!(matches!(
            Device::Accelerator.ensure_supported(),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn default_is_cpu() {
        assert_eq!(Device::default(), Device::Cpu);
    }
}
