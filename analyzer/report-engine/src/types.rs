//! Core types for the report engine (JSON contracts + canonical models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what hierarchical report files contain)
// ---------------------------------------------------------------------------
//
// Flat records and the report root are read field by field in `normalize`
// so a wrong-typed field never invalidates a whole record or document; only
// the suite tree keeps a serde contract.

/// One suite group; may nest further groups and hold specs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundSuite {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub file: Option<String>,
  #[serde(default)]
  pub suites: Vec<InboundSuite>,
  #[serde(default)]
  pub specs: Vec<InboundSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundSpec {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub file: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub tests: Vec<InboundTest>,
}

/// One test execution under a spec: a project/environment label plus zero or
/// more result attempts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundTest {
  #[serde(default)]
  pub project_name: Option<String>,
  #[serde(default)]
  pub results: Vec<InboundAttempt>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundAttempt {
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub duration: Option<f64>,
  #[serde(default)]
  pub retry: u32,
  #[serde(default)]
  pub error: Option<InboundAttemptError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundAttemptError {
  #[serde(default)]
  pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Status enum (normalized)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
  Passed,
  Failed,
  Flaky,
  Skipped,
}

impl TestStatus {
  /// Map a raw status string that is present in the source.
  ///
  /// Fail-closed: anything unrecognized (including "timedOut" and
  /// "interrupted") maps to Failed, never to Passed. A genuinely absent
  /// status is handled by the caller (Skipped for records with no outcome).
  pub fn from_raw(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "passed" | "pass" | "ok" => Self::Passed,
      "skipped" | "pending" => Self::Skipped,
      "flaky" => Self::Flaky,
      _ => Self::Failed,
    }
  }
}

// ---------------------------------------------------------------------------
// Canonical report (normalized, shape-independent)
// ---------------------------------------------------------------------------

/// One canonical test case. `id` is stable and unique within a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
  pub id: String,
  pub title: String,
  pub status: TestStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retries: Option<u32>,
  pub tags: Vec<String>,
}

/// Aggregate counts, always recomputed from the case list.
/// Invariant: total == passed + failed + flaky + skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
  pub total: u32,
  pub passed: u32,
  pub failed: u32,
  pub flaky: u32,
  pub skipped: u32,
}

/// The normalized, shape-independent in-memory representation of a test run.
/// Constructed once per invocation and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReport {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ended_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub environment: BTreeMap<String, String>,
  pub summary: SummaryCounts,
  pub tests: Vec<TestCase>,
}

// ---------------------------------------------------------------------------
// Deterministic summary
// ---------------------------------------------------------------------------

/// Output of the deterministic summarizer: totals plus ordered notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
  pub total: u32,
  pub passed: u32,
  pub failed: u32,
  pub skipped: u32,
  pub notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// AI analysis result (strict output shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  Medium,
  High,
  Critical,
}

impl Priority {
  /// Exact enum match; anything else is rejected (callers default to Medium).
  pub fn from_raw(s: &str) -> Option<Self> {
    match s {
      "low" => Some(Self::Low),
      "medium" => Some(Self::Medium),
      "high" => Some(Self::High),
      "critical" => Some(Self::Critical),
      _ => None,
    }
  }
}

impl Default for Priority {
  fn default() -> Self {
    Self::Medium
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCauseHypothesis {
  pub id: String,
  /// e.g. "frontend", "backend", "network", "data", "general"
  pub area: String,
  pub description: String,
  pub evidence: Vec<String>,
  /// 0..1
  pub likelihood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlakyCandidate {
  /// References a TestCase.id from the canonical report.
  pub test_id: String,
  pub reason: String,
  pub evidence: Vec<String>,
  /// 0..1
  pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestIdea {
  pub title: String,
  pub description: String,
  pub target_area: String,
  pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
  pub title: String,
  pub description: String,
  /// e.g. "QA", "Backend", "DevOps"
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner_hint: Option<String>,
  pub priority: Priority,
}

/// Fully-defaulted structured analysis. No field is ever absent or null;
/// lists may be empty. Constructed fresh per analyze call and immutable
/// once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysisResult {
  pub root_causes: Vec<RootCauseHypothesis>,
  pub flaky_candidates: Vec<FlakyCandidate>,
  pub new_test_ideas: Vec<NewTestIdea>,
  pub actions: Vec<ActionItem>,
}
