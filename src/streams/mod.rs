mod dataloader;
pub mod generators;

pub use dataloader::Dataloader;
pub use generators::{SeaFunction, SeaGenerator};
