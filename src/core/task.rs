use crate::error::{ModelError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Learning problem a model is built for.
///
/// Fixed per model at construction. Decides the label type, the training
/// criterion and the reported metric (error rate vs. mean squared error).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Task {
    Classification,
    Regression,
}

impl Task {
    /// Parses a task name, failing with a configuration error for anything
    /// other than `classification` or `regression`.
    pub fn parse(name: &str) -> Result<Self> {
        Task::from_str(name.trim())
            .map_err(|_| ModelError::configuration(format!("Task not supported: {name}")))
    }

    #[inline]
    pub fn is_classification(self) -> bool {
        matches!(self, Task::Classification)
    }
}
