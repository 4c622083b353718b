use serde::Serialize;
use std::fmt::{Display, Formatter, Result};

/// Progress record taken after each training window.
///
/// `loss` is the pre-update loss on that window (`NaN` when no test was
/// run); `mean_loss` is the running mean over all tested windows so far.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub windows_seen: u64,
    pub instances_seen: u64,
    pub loss: f64,
    pub mean_loss: f64,
    pub seconds: f64,
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "windows={}, seen={}, loss={:.6}, mean_loss={:.6}, t={:.3}s",
            self.windows_seen, self.instances_seen, self.loss, self.mean_loss, self.seconds
        )
    }
}
