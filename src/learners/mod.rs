mod batch_estimator;
mod decision_tree;
mod gradient_boosting;
mod tabular_net;

pub use batch_estimator::{BatchEstimator, FitOptions};
pub use decision_tree::{DecisionTree, SplitCriterion};
pub use gradient_boosting::{BoostingOptions, GradientBoosting, argmax};
pub use tabular_net::{TABULAR_HIDDEN_LAYERS, TabularNet};
