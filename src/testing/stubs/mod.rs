mod fixed_scorers;
mod vec_dataloader;

pub use fixed_scorers::{FixedLabels, FixedOutputs};
pub use vec_dataloader::VecDataloader;
