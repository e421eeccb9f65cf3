//! Financial Decision Survey Harness
//!
//! This crate dispatches a fixed 14-question financial-decision survey
//! to LLM providers, runs many independent trials in parallel, extracts
//! structured answers (a letter A/B or a numeric value) from free-form
//! replies, and writes one CSV row per trial.
//!
//! # Features
//!
//! - OpenAI (incl. o1/o3 reasoning models), DeepSeek, and Gemini clients
//!   behind a single provider trait
//! - Bounded-concurrency trial runner with transient-error retry
//! - Format-drift-tolerant answer parsing (labeled and positional)
//! - `Trial,Q1..Q14` CSV output, dry-run mode for offline testing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use decision_benchmark::{
//!     providers::DryRunClient,
//!     reporting::write_csv,
//!     runner::{Executor, ExecutorConfig},
//!     survey::Survey,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let survey = Arc::new(Survey::new("the fourteen questions...", 14));
//!     let provider = Arc::new(DryRunClient::new(14));
//!
//!     let executor = Executor::new(provider, survey, ExecutorConfig::default());
//!     let rows = executor.run(10).await;
//!
//!     write_csv("results.csv", &rows, 14).unwrap();
//! }
//! ```

pub mod config;
pub mod parser;
pub mod providers;
pub mod reporting;
pub mod runner;
pub mod survey;
