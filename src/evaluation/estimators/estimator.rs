/// Online scalar estimator, e.g. a streaming mean of per-window losses.
///
/// Values arrive one at a time through [`add`](Estimator::add); the current
/// estimate is available at any point through
/// [`estimation`](Estimator::estimation).
pub trait Estimator {
    /// Incorporates a new observation. `NaN` means "nothing observed".
    fn add(&mut self, v: f64);

    /// Returns the current estimate, `NaN` before any observation.
    fn estimation(&self) -> f64;

    /// Number of observations incorporated so far.
    fn count(&self) -> u64;
}
