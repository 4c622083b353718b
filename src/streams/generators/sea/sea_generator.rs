use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{Task, Window};
use crate::error::{ModelError, Result};
use crate::streams::Dataloader;
use crate::streams::generators::sea::SeaFunction;

const SEA_COLUMNS: usize = 3;
const SEA_CLASSES: usize = 2;

/// SEA concepts generator producing fixed-size windows.
///
/// Three attributes are drawn uniformly from `[0, 10)`; only the first two
/// decide the class. Labels are flipped with probability `noise_percentage`.
/// With [`with_drift`](SeaGenerator::with_drift) the concept switches to a
/// second function once a number of windows has been produced, which is the
/// abrupt drift continual learners are benchmarked against. When
/// [`flag_noise`](SeaGenerator::flag_noise) is set, each window carries an
/// outlier mask marking the flipped labels.
#[derive(Debug)]
pub struct SeaGenerator {
    seed: u64,
    rng: StdRng,
    function: SeaFunction,
    threshold: f32,
    initial_concept: (SeaFunction, f32),
    balance_classes: bool,
    next_class_should_be_zero: bool,
    noise_percentage: u32,
    window_size: usize,
    max_windows: Option<usize>,
    drift: Option<(usize, SeaFunction)>,
    flag_noise: bool,
    produced: usize,
}

impl SeaGenerator {
    pub fn new(
        function: SeaFunction,
        balance: bool,
        noise_percentage: u32,
        window_size: usize,
        max_windows: Option<usize>,
        seed: u64,
    ) -> Result<Self> {
        if noise_percentage > 100 {
            return Err(ModelError::configuration("Noise percentage must be in [0, 100]"));
        }
        if window_size == 0 {
            return Err(ModelError::configuration("Window size must be positive"));
        }

        Ok(Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            function,
            threshold: function.threshold(),
            initial_concept: (function, function.threshold()),
            balance_classes: balance,
            next_class_should_be_zero: false,
            noise_percentage,
            window_size,
            max_windows,
            drift: None,
            flag_noise: false,
            produced: 0,
        })
    }

    pub fn new_with_threshold(
        threshold: f32,
        noise_percentage: u32,
        window_size: usize,
        max_windows: Option<usize>,
        seed: u64,
    ) -> Result<Self> {
        if !(0.0..=20.0).contains(&threshold) {
            return Err(ModelError::configuration(
                "Threshold must be in [0.0, 20.0] for attributes [0,10]",
            ));
        }
        let mut generator = Self::new(SeaFunction::F2, false, noise_percentage, window_size, max_windows, seed)?;
        generator.threshold = threshold;
        generator.initial_concept.1 = threshold;
        Ok(generator)
    }

    /// Switches to `function` once `after_windows` windows have been produced.
    pub fn with_drift(mut self, after_windows: usize, function: SeaFunction) -> Self {
        self.drift = Some((after_windows, function));
        self
    }

    /// Marks noise-flipped labels in the window's outlier mask.
    pub fn flag_noise(mut self, flag: bool) -> Self {
        self.flag_noise = flag;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn windows_produced(&self) -> usize {
        self.produced
    }

    #[inline]
    fn gen_attr(&mut self) -> f32 {
        self.rng.random_range(0.0..10.0)
    }

    #[inline]
    fn determine_class(&self, a1: f32, a2: f32) -> u8 {
        if a1 + a2 <= self.threshold { 0 } else { 1 }
    }

    #[inline]
    fn roll_noise(&mut self) -> bool {
        let roll: u32 = self.rng.random_range(1..=100);
        roll <= self.noise_percentage
    }

    fn next_sample(&mut self) -> ([f32; SEA_COLUMNS], u8, bool) {
        let (attrs, cls) = loop {
            let attrs = [self.gen_attr(), self.gen_attr(), self.gen_attr()];
            let g = self.determine_class(attrs[0], attrs[1]);

            if !self.balance_classes {
                break (attrs, g);
            }
            let want_zero = self.next_class_should_be_zero;
            if (want_zero && g == 0) || (!want_zero && g == 1) {
                self.next_class_should_be_zero = !self.next_class_should_be_zero;
                break (attrs, g);
            }
        };

        let flipped = self.roll_noise();
        let cls = if flipped { 1 - cls } else { cls };
        (attrs, cls, flipped)
    }

    fn apply_drift(&mut self) {
        if let Some((after, function)) = self.drift {
            if self.produced == after && self.function != function {
                log::info!("SEA concept drift: {} -> {} after {after} windows", self.function, function);
                self.function = function;
                self.threshold = function.threshold();
            }
        }
    }
}

impl Dataloader for SeaGenerator {
    fn num_columns(&self) -> usize {
        SEA_COLUMNS
    }

    fn output_dim(&self) -> usize {
        SEA_CLASSES
    }

    fn window_size(&self) -> usize {
        self.window_size
    }

    fn task(&self) -> Task {
        Task::Classification
    }

    fn has_more_windows(&self) -> bool {
        self.max_windows.is_none_or(|max| self.produced < max)
    }

    fn next_window(&mut self) -> Option<Window> {
        if !self.has_more_windows() {
            return None;
        }
        self.apply_drift();

        let n = self.window_size;
        let mut x = Array2::zeros((n, SEA_COLUMNS));
        let mut y = Array1::zeros(n);
        let mut mask = Array1::zeros(n);
        for i in 0..n {
            let (attrs, cls, flipped) = self.next_sample();
            for (j, a) in attrs.into_iter().enumerate() {
                x[[i, j]] = a;
            }
            y[i] = f32::from(cls);
            mask[i] = if flipped { 1.0 } else { 0.0 };
        }
        self.produced += 1;

        let y_outlier = self.flag_noise.then_some(mask);
        Some(Window { x, y, y_outlier })
    }

    fn restart(&mut self) -> Result<()> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.produced = 0;
        self.next_class_should_be_zero = false;
        (self.function, self.threshold) = self.initial_concept;
        Ok(())
    }
}
