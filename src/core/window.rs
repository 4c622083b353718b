use crate::error::{ModelError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

/// A batch of consecutive stream records handed to one training call.
///
/// `x` holds one sample per row, `y` the matching labels (class indices are
/// stored as floats) and `y_outlier` an optional 0/1 mask where 1 removes the
/// sample from loss and accuracy without removing it from training.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub x: Array2<f32>,
    pub y: Array1<f32>,
    pub y_outlier: Option<Array1<f32>>,
}

impl Window {
    pub fn new(x: Array2<f32>, y: Array1<f32>, y_outlier: Option<Array1<f32>>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ModelError::shape_mismatch("x rows", x.nrows(), y.len()));
        }
        if let Some(mask) = &y_outlier {
            if mask.len() != y.len() {
                return Err(ModelError::shape_mismatch("y_outlier", mask.len(), y.len()));
            }
        }
        Ok(Self { x, y, y_outlier })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        self.x.ncols()
    }

    pub fn outlier_mask(&self) -> Option<ArrayView1<'_, f32>> {
        self.y_outlier.as_ref().map(|m| m.view())
    }

    /// Contiguous batches in stream order; the last one may be shorter.
    pub fn batches(&self, batch_size: usize) -> Batches<'_> {
        Batches {
            window: self,
            batch_size: batch_size.max(1),
            start: 0,
        }
    }

    /// Rows whose label equals `label`, in window order.
    pub fn rows_with_label(&self, label: usize) -> Array2<f32> {
        let indices: Vec<usize> = self
            .y
            .iter()
            .enumerate()
            .filter(|(_, y)| label_of(**y) == Some(label))
            .map(|(i, _)| i)
            .collect();
        self.x.select(Axis(0), &indices)
    }

    pub fn contains_label(&self, label: usize) -> bool {
        self.y.iter().any(|y| label_of(*y) == Some(label))
    }
}

/// Reads a float-encoded class index.
#[inline]
pub fn label_of(y: f32) -> Option<usize> {
    if y.is_finite() && y >= 0.0 {
        Some(y.round() as usize)
    } else {
        None
    }
}

pub struct Batches<'a> {
    window: &'a Window,
    batch_size: usize,
    start: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = (ArrayView2<'a, f32>, ArrayView1<'a, f32>);

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.window.len();
        if self.start >= len {
            return None;
        }
        let end = (self.start + self.batch_size).min(len);
        let x = self.window.x.slice(s![self.start..end, ..]);
        let y = self.window.y.slice(s![self.start..end]);
        self.start = end;
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn window() -> Window {
        Window::new(
            array![[0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0]],
            array![0.0, 1.0, 0.0, 1.0, 1.0],
            None,
        )
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_rows() {
        let err = Window::new(array![[0.0], [1.0]], array![0.0], None).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ShapeMismatch {
                what: "x rows",
                got: 2,
                expected: 1
            }
        ));
    }

    #[test]
    fn rejects_mismatched_mask() {
        let err = Window::new(array![[0.0]], array![0.0], Some(array![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { what: "y_outlier", .. }));
    }

    #[test]
    fn batches_keep_order_and_tail() {
        let w = window();
        let sizes: Vec<usize> = w.batches(2).map(|(x, y)| {
            assert_eq!(x.nrows(), y.len());
            y.len()
        }).collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        let firsts: Vec<f32> = w.batches(2).map(|(x, _)| x[[0, 0]]).collect();
        assert_eq!(firsts, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn selects_rows_by_label() {
        let w = window();
        let ones = w.rows_with_label(1);
        assert_eq!(ones.column(0).to_vec(), vec![1.0, 3.0, 4.0]);
        assert!(w.contains_label(0));
        assert!(!w.contains_label(2));
    }
}
