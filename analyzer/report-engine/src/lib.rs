//! Test-run report analysis engine.
//!
//! Normalizes a raw test report (flat record list or Playwright-style
//! hierarchical JSON) into a canonical form, computes a deterministic
//! summary, and produces a structured AI analysis (root causes, flaky
//! candidates, new test ideas, action items) with a rule-based fallback
//! whenever the model path is disabled or fails.
//!
//! One report per invocation; no DB, no persistence, no retry loops.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod sanitize;
pub mod summary;
pub mod types;

pub use analyzer::AiAnalyzer;
pub use config::AiConfig;
pub use error::AnalyzerError;
pub use types::{AiAnalysisResult, CanonicalReport, RunSummary};
