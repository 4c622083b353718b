use crate::core::{Task, Window};
use crate::error::Result;
use crate::streams::Dataloader;

/// Replays a fixed list of windows.
///
/// `num_columns` and `window_size` come from the first window (0 if empty).
pub struct VecDataloader {
    task: Task,
    output_dim: usize,
    windows: Vec<Window>,
    idx: usize,
}

impl VecDataloader {
    pub fn new(task: Task, output_dim: usize, windows: Vec<Window>) -> Self {
        Self {
            task,
            output_dim,
            windows,
            idx: 0,
        }
    }
}

impl Dataloader for VecDataloader {
    fn num_columns(&self) -> usize {
        self.windows.first().map_or(0, Window::num_columns)
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn window_size(&self) -> usize {
        self.windows.first().map_or(0, Window::len)
    }

    fn task(&self) -> Task {
        self.task
    }

    fn has_more_windows(&self) -> bool {
        self.idx < self.windows.len()
    }

    fn next_window(&mut self) -> Option<Window> {
        let window = self.windows.get(self.idx)?.clone();
        self.idx += 1;
        Some(window)
    }

    fn restart(&mut self) -> Result<()> {
        self.idx = 0;
        Ok(())
    }
}
