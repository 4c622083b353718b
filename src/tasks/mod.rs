mod windowed_trainer;

pub use windowed_trainer::WindowedTrainer;
