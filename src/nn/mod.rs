mod activation;
mod arm_net;
mod criterion;
mod dense;
mod fc_net;
mod gradient_net;
mod optimizer;

pub use activation::ActFn;
pub use arm_net::ArmNet;
pub use criterion::{Criterion, softmax_rows};
pub use dense::Dense;
pub use fc_net::{DEFAULT_HIDDEN_LAYERS, FcNet};
pub use gradient_net::GradientNet;
pub use optimizer::{Optimizer, Sgd};
