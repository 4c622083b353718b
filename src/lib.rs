pub mod algorithms;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod learners;
pub mod models;
pub mod networks;
pub mod nn;
pub mod streams;
pub mod tasks;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
