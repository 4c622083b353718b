use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::networks::outlier::BatchScorer;

/// Empirical-CDF outlier scorer (ECOD).
///
/// Each feature contributes `-ln` of its left and right tail probabilities
/// under the fitted empirical distribution. The score is the largest of the
/// left-tail sum, the right-tail sum and the skewness-directed sum.
#[derive(Debug, Clone, Default)]
pub struct Ecod {
    sorted_columns: Vec<Vec<f32>>,
    skewness: Vec<f32>,
}

impl Ecod {
    fn left_tail(column: &[f32], v: f32) -> f64 {
        let count = column.partition_point(|&c| c <= v);
        count.max(1) as f64 / column.len().max(1) as f64
    }

    fn right_tail(column: &[f32], v: f32) -> f64 {
        let count = column.len() - column.partition_point(|&c| c < v);
        count.max(1) as f64 / column.len().max(1) as f64
    }

    fn score_row(&self, row: ArrayView1<f32>) -> f32 {
        let (mut left, mut right, mut auto) = (0.0, 0.0, 0.0);
        for ((column, &skew), &v) in self.sorted_columns.iter().zip(&self.skewness).zip(row) {
            let l = -Self::left_tail(column, v).ln();
            let r = -Self::right_tail(column, v).ln();
            left += l;
            right += r;
            auto += if skew < 0.0 { l } else { r };
        }
        left.max(right).max(auto) as f32
    }
}

fn skewness(column: ArrayView1<f32>) -> f32 {
    let n = column.len() as f32;
    if n == 0.0 {
        return 0.0;
    }
    let mean = column.sum() / n;
    let m2 = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let m3 = column.iter().map(|v| (v - mean).powi(3)).sum::<f32>() / n;
    if m2 > 0.0 { m3 / m2.powf(1.5) } else { 0.0 }
}

impl BatchScorer for Ecod {
    fn fit(&mut self, x: ArrayView2<f32>) {
        self.sorted_columns = x
            .columns()
            .into_iter()
            .map(|c| {
                let mut sorted = c.to_vec();
                sorted.sort_by(f32::total_cmp);
                sorted
            })
            .collect();
        self.skewness = x.columns().into_iter().map(skewness).collect();
    }

    fn score(&self, x: ArrayView2<f32>) -> Array1<f32> {
        x.rows().into_iter().map(|row| self.score_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn extreme_value_scores_highest() {
        let x = array![[1.0f32, 1.0], [1.1, 0.9], [0.9, 1.1], [1.0, 1.05], [1.05, 1.0], [9.0, 9.0]];
        let mut ecod = Ecod::default();
        ecod.fit(x.view());
        let scores = ecod.score(x.view());
        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(5));
    }

    #[test]
    fn tails_count_ties_inclusively() {
        let column = [1.0f32, 2.0, 2.0, 3.0];
        assert_eq!(Ecod::left_tail(&column, 2.0), 0.75);
        assert_eq!(Ecod::right_tail(&column, 2.0), 0.75);
        assert_eq!(Ecod::left_tail(&column, 0.0), 0.25);
    }
}
