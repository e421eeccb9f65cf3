//! Trial execution

pub mod executor;

pub use executor::{Executor, ExecutorConfig, TrialRow};
