//! Exemplar memory for replay-based continual training.
//!
//! Exemplars are the samples whose embeddings lie closest to their class
//! mean (or, for regression, to the mean of the whole window). The flat
//! `(x, y)` view used for replay is an immutable [`ExemplarSet`] that is
//! replaced wholesale whenever the selection changes; every replacement bumps
//! the buffer's version.

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::core::Window;

/// Flat replay arrays: one exemplar per row, labels as floats.
#[derive(Debug, Clone, PartialEq)]
pub struct ExemplarSet {
    pub x: Array2<f32>,
    pub y: Array1<f32>,
}

impl ExemplarSet {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExemplarBuffer {
    per_class: Vec<Vec<Array1<f32>>>,
    current: Option<ExemplarSet>,
    version: u64,
}

impl ExemplarBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of installed buffer values; 0 until the first selection.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn exemplars(&self) -> Option<&ExemplarSet> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.as_ref().is_none_or(ExemplarSet::is_empty)
    }

    pub fn class_count(&self, label: usize) -> usize {
        self.per_class.get(label).map_or(0, Vec::len)
    }

    fn install(&mut self, set: ExemplarSet) {
        self.version += 1;
        log::debug!("Installed exemplar buffer v{} with {} samples", self.version, set.len());
        self.current = Some(set);
    }

    /// Tops every class up to `floor(buffer_size / output_dim)` exemplars.
    ///
    /// Only classes present in `window` and still below the cap are touched.
    /// Returns whether a new buffer value was installed.
    pub fn update_per_class<F>(&mut self, window: &Window, buffer_size: usize, output_dim: usize, embed: F) -> bool
    where
        F: Fn(ArrayView2<f32>) -> Array2<f32>,
    {
        if output_dim == 0 {
            return false;
        }
        let cap = buffer_size / output_dim;
        if self.per_class.len() < output_dim {
            self.per_class.resize_with(output_dim, Vec::new);
        }

        let mut changed = false;
        for label in 0..output_dim {
            let stored = self.per_class[label].len();
            if stored >= cap || !window.contains_label(label) {
                continue;
            }
            let rows = window.rows_with_label(label);
            let take = (cap - stored).min(rows.nrows());
            let chosen = closest_to_mean(embed(rows.view()).view(), take);
            self.per_class[label].extend(chosen.into_iter().map(|i| rows.row(i).to_owned()));
            changed |= take > 0;
        }

        if changed {
            let set = self.flatten(window.num_columns());
            self.install(set);
        }
        changed
    }

    /// Selects the `min(buffer_size, n)` samples closest to the window mean,
    /// once. Later calls leave the buffer untouched.
    pub fn select_global<F>(&mut self, window: &Window, buffer_size: usize, embed: F) -> bool
    where
        F: Fn(ArrayView2<f32>) -> Array2<f32>,
    {
        let take = buffer_size.min(window.len());
        if !self.is_empty() || take == 0 {
            return false;
        }
        let chosen = closest_to_mean(embed(window.x.view()).view(), take);
        self.install(ExemplarSet {
            x: window.x.select(Axis(0), &chosen),
            y: window.y.select(Axis(0), &chosen),
        });
        true
    }

    fn flatten(&self, columns: usize) -> ExemplarSet {
        let total: usize = self.per_class.iter().map(Vec::len).sum();
        let mut x = Array2::zeros((total, columns));
        let mut y = Array1::zeros(total);
        let rows = self
            .per_class
            .iter()
            .enumerate()
            .flat_map(|(label, rows)| rows.iter().map(move |r| (label, r)));
        for (i, (label, row)) in rows.enumerate() {
            x.row_mut(i).assign(row);
            y[i] = label as f32;
        }
        ExemplarSet { x, y }
    }
}

/// Indices of the `k` rows nearest the mean row; equal distances keep row order.
pub fn closest_to_mean(embeddings: ArrayView2<f32>, k: usize) -> Vec<usize> {
    let Some(mean) = embeddings.mean_axis(Axis(0)) else {
        return Vec::new();
    };
    let mut ranked: Vec<(usize, f32)> = embeddings
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let d: f32 = row.iter().zip(mean.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
            (i, d.sqrt())
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().take(k).map(|(i, _)| i).collect()
}
