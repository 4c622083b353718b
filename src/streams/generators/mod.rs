mod sea;

pub use sea::{SeaFunction, SeaGenerator};
