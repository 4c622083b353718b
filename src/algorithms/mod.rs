pub mod loss;

pub use loss::{
    ClassificationLoss, ClassificationTreeLoss, Convention, LossKind, LossTemplate,
    RegressionLoss, RegressionTreeLoss, Scorer,
};
