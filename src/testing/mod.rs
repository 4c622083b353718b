pub mod stubs;

pub use stubs::{FixedLabels, FixedOutputs, VecDataloader};
