//! Structured error types for the report engine.
//!
//! Only `UnsupportedShape` is allowed to terminate an invocation. Provider
//! failures live in `provider::ProviderError` and are always recovered into
//! a deterministic fallback result by the analyzer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
  #[error("unsupported report shape: {0}")]
  UnsupportedShape(String),
}

impl AnalyzerError {
  pub fn unsupported(reason: impl Into<String>) -> Self {
    Self::UnsupportedShape(reason.into())
  }
}
