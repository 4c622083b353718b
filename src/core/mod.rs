mod device;
mod task;
mod window;

pub use device::Device;
pub use task::Task;
pub use window::{Batches, Window, label_of};
