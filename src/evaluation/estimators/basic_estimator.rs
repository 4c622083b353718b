use crate::evaluation::estimators::Estimator;

/// Streaming mean: `sum / len`, skipping `NaN` observations.
///
/// A fully masked window reports a `NaN` loss, so skipping keeps such windows
/// from poisoning the running mean.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicEstimator {
    len: u64,
    sum: f64,
}

impl Estimator for BasicEstimator {
    #[inline]
    fn add(&mut self, v: f64) {
        if v.is_nan() {
            return;
        }
        self.len += 1;
        self.sum += v;
    }

    #[inline]
    fn estimation(&self) -> f64 {
        if self.len > 0 {
            self.sum / self.len as f64
        } else {
            f64::NAN
        }
    }

    fn count(&self) -> u64 {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_estimator_is_nan() {
        assert!(BasicEstimator::default().estimation().is_nan());
    }

    #[test]
    fn nan_observations_are_skipped() {
        let mut e = BasicEstimator::default();
        e.add(0.5);
        e.add(f64::NAN);
        e.add(0.25);
        assert_eq!(e.count(), 2);
        assert_eq!(e.estimation(), 0.375);
    }
}
