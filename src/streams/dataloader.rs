use crate::core::{Task, Window};
use crate::error::Result;

/// Pull-based source of training windows plus the metadata models are built from.
///
/// Implementations may be finite datasets or unbounded generators. The
/// metadata (`num_columns`, `output_dim`, `window_size`, `task`) must stay
/// fixed for the lifetime of the loader; every window it yields has
/// `num_columns` feature columns.
pub trait Dataloader {
    /// Number of feature columns in every window.
    fn num_columns(&self) -> usize;

    /// Number of classes for classification, 1 for regression.
    fn output_dim(&self) -> usize;

    /// Nominal number of rows per window; the last window of a finite
    /// source may be shorter.
    fn window_size(&self) -> usize;

    fn task(&self) -> Task;

    /// Indicates whether the loader *may* produce more windows.
    ///
    /// If it returns `false`, a subsequent call to [`next_window`] must
    /// return `None`.
    ///
    /// [`next_window`]: Dataloader::next_window
    fn has_more_windows(&self) -> bool;

    /// Produces the next window, or `None` once the source is exhausted.
    fn next_window(&mut self) -> Option<Window>;

    /// Resets the loader to its initial state; generators re-seed their RNG.
    fn restart(&mut self) -> Result<()>;
}
