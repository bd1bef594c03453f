//! Grading engine for head-to-head coding duels.
//!
//! A submission is wrapped in a generated test harness, executed remotely,
//! and its printed results are graded against the problem's stored test
//! cases using type-aware comparison.

pub mod config;
pub mod demux;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod harness;
pub mod literal;
pub mod type_grammar;

#[cfg(test)]
mod engine_tests;

pub use config::{LanguageConfig, LanguageConfigManager};
pub use engine::{GradingEngine, INTERNAL_ERROR_MESSAGE};
pub use error::EngineError;
pub use executor::{CodeRunner, ExecuteRequest, ExecutionClient, ExecutionResult, RetryPolicy};
pub use harness::{HarnessCompiler, HarnessSource};

pub type Result<T> = std::result::Result<T, EngineError>;
