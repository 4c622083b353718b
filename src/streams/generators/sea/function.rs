use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The four SEA concepts; a sample is class 0 when `a1 + a2 <= threshold`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, EnumIter)]
pub enum SeaFunction {
    F1 = 1,
    F2 = 2,
    F3 = 3,
    F4 = 4,
}

impl SeaFunction {
    pub fn threshold(self) -> f32 {
        match self {
            SeaFunction::F1 => 8.0,
            SeaFunction::F2 => 9.0,
            SeaFunction::F3 => 7.0,
            SeaFunction::F4 => 9.5,
        }
    }
}
