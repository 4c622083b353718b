/// Named scalar reported by the trainer, e.g. `"mean_loss"` or `"windows"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
}

impl Measurement {
    #[inline]
    pub fn new<N: Into<String>>(name: N, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Looks a measurement up by name.
pub fn find(measurements: &[Measurement], name: &str) -> Option<f64> {
    measurements.iter().find(|m| m.name == name).map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_name() {
        let ms = vec![Measurement::new("windows", 3.0), Measurement::new("mean_loss", 0.5)];
        assert_eq!(find(&ms, "mean_loss"), Some(0.5));
        assert_eq!(find(&ms, "kappa"), None);
    }
}
