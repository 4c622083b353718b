mod estimators;
mod measurement;
mod preview;

pub use estimators::{BasicEstimator, Estimator};
pub use measurement::{Measurement, find};
pub use preview::{CurveFormat, LearningCurve, Snapshot};
