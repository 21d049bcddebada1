//! Deterministic fallback analysis, used whenever the model path is
//! disabled, gated off, or fails.
//!
//! Guarantees non-empty `root_causes` and `actions` for every input; the
//! orchestrator relies on this so `analyze` never returns an empty result.

use std::fmt;

use crate::types::{
  ActionItem, AiAnalysisResult, CanonicalReport, FlakyCandidate, NewTestIdea, Priority,
  RootCauseHypothesis, TestStatus,
};

/// Why the model path was skipped or abandoned. Informational only: logged,
/// never exposed in the result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
  Disabled,
  QuotaOrRateLimit,
  AiError,
}

impl fmt::Display for FallbackReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let tag = match self {
      Self::Disabled => "disabled",
      Self::QuotaOrRateLimit => "quota_or_rate_limit",
      Self::AiError => "ai_error",
    };
    f.write_str(tag)
  }
}

/// Fraction of failed cases above which the infra-instability branch fires.
const FAILURE_RATIO_THRESHOLD: f64 = 0.10;
/// Cap on emitted flaky candidates, in report order.
const MAX_FLAKY_CANDIDATES: usize = 10;

/// Derive a structured analysis from heuristics over the canonical report.
pub fn fallback(report: &CanonicalReport, reason: FallbackReason) -> AiAnalysisResult {
  let counts = report.summary;

  let mut root_causes = Vec::new();
  let mut flaky_candidates = Vec::new();
  let mut new_test_ideas = Vec::new();
  let mut actions = Vec::new();

  let failure_ratio = if counts.total > 0 {
    counts.failed as f64 / counts.total as f64
  } else {
    0.0
  };
  let has_many_failures = counts.failed > 0 && failure_ratio >= FAILURE_RATIO_THRESHOLD;
  let has_flaky = counts.flaky > 0;

  if has_many_failures {
    root_causes.push(hypothesis(
      "backend",
      "High failure ratio suggests environment/auth or infra instability",
      0.6,
    ));
    new_test_ideas.push(NewTestIdea {
      title: "Smoke: Auth & Flags".to_string(),
      description: "Add smoke tests for login, feature flags and critical APIs".to_string(),
      target_area: "backend".to_string(),
      priority: Priority::High,
    });
    actions.push(action(
      "Re-run smoke on clean env",
      "Run a minimal smoke suite in an isolated env to detect infra issues",
      Priority::High,
      Some("QA"),
    ));
    actions.push(action(
      "Limit retries to idempotent ops",
      "Apply retries only to known idempotent API calls",
      Priority::Medium,
      Some("Backend"),
    ));
  }

  if has_flaky {
    root_causes.push(hypothesis(
      "frontend",
      "Flakiness indicates timing or network sensitivity",
      0.55,
    ));
    // Candidate selection is wider than the aggregate count: an explicit
    // flaky status OR any nonzero retry count qualifies.
    let candidates = report
      .tests
      .iter()
      .filter(|t| t.status == TestStatus::Flaky || t.retries.unwrap_or(0) > 0)
      .take(MAX_FLAKY_CANDIDATES);
    for case in candidates {
      let mut evidence = vec![case.title.clone()];
      evidence.extend(case.tags.iter().cloned());
      flaky_candidates.push(FlakyCandidate {
        test_id: case.id.clone(),
        reason: "Intermittent behavior detected".to_string(),
        evidence,
        confidence: 0.6,
      });
    }
    actions.push(action(
      "Replace arbitrary waits",
      "Use explicit assertions and stable waits for UI/network",
      Priority::High,
      Some("QA"),
    ));
    actions.push(action(
      "Stub external services",
      "Stub flaky external dependencies in CI to improve determinism",
      Priority::Medium,
      Some("DevOps"),
    ));
  }

  if !has_many_failures && !has_flaky {
    let description = match reason {
      FallbackReason::Disabled => "AI analysis disabled; no model-based insights available",
      FallbackReason::QuotaOrRateLimit => {
        "AI quota or rate limit exceeded; no model-based insights available"
      }
      FallbackReason::AiError => "AI provider failed; no model-based insights available",
    };
    root_causes.push(hypothesis("general", description, 0.4));
    actions.push(action(
      "Restore AI access",
      "Fix provider quota/keys or set AI_PROVIDER=off to skip the model pass",
      Priority::Medium,
      Some("DevOps"),
    ));
  }

  // Always last, always low priority.
  actions.push(action(
    "Re-run analysis after fixes",
    "Re-execute after restoring AI or stabilizing infra to get deeper insights",
    Priority::Low,
    Some("QA"),
  ));

  AiAnalysisResult {
    root_causes,
    flaky_candidates,
    new_test_ideas,
    actions,
  }
}

/// Content-derived id, stable across runs for the same hypothesis.
fn hypothesis(area: &str, description: &str, likelihood: f64) -> RootCauseHypothesis {
  let mut hasher = blake3::Hasher::new();
  hasher.update(area.as_bytes());
  hasher.update(b"|");
  hasher.update(description.as_bytes());
  let hex = hasher.finalize().to_hex();
  RootCauseHypothesis {
    id: format!("fallback-{}", &hex[..12]),
    area: area.to_string(),
    description: description.to_string(),
    evidence: vec!["deterministic fallback heuristic".to_string()],
    likelihood,
  }
}

fn action(title: &str, description: &str, priority: Priority, owner_hint: Option<&str>) -> ActionItem {
  ActionItem {
    title: title.to_string(),
    description: description.to_string(),
    owner_hint: owner_hint.map(String::from),
    priority,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{SummaryCounts, TestCase};
  use std::collections::BTreeMap;

  fn case(id: &str, status: TestStatus, retries: Option<u32>) -> TestCase {
    TestCase {
      id: id.into(),
      title: format!("title of {}", id),
      status,
      duration_ms: None,
      error_message: None,
      retries,
      tags: vec!["ui".into()],
    }
  }

  fn report(cases: Vec<TestCase>) -> CanonicalReport {
    let mut counts = SummaryCounts::default();
    for c in &cases {
      counts.total += 1;
      match c.status {
        TestStatus::Passed => counts.passed += 1,
        TestStatus::Failed => counts.failed += 1,
        TestStatus::Flaky => counts.flaky += 1,
        TestStatus::Skipped => counts.skipped += 1,
      }
    }
    CanonicalReport {
      commit: None,
      branch: None,
      started_at: None,
      ended_at: None,
      environment: BTreeMap::new(),
      summary: counts,
      tests: cases,
    }
  }

  #[test]
  fn failure_branch_fires_at_ten_percent() {
    let mut cases = vec![case("f1", TestStatus::Failed, None)];
    for i in 0..9 {
      cases.push(case(&format!("p{}", i), TestStatus::Passed, None));
    }
    let result = fallback(&report(cases), FallbackReason::AiError);

    assert_eq!(result.root_causes.len(), 1);
    assert_eq!(result.root_causes[0].area, "backend");
    assert_eq!(result.root_causes[0].likelihood, 0.6);
    assert_eq!(result.new_test_ideas.len(), 1);
    assert_eq!(result.new_test_ideas[0].priority, Priority::High);
    // Two branch actions plus the final re-run action.
    assert_eq!(result.actions.len(), 3);
    assert_eq!(result.actions[0].priority, Priority::High);
    assert_eq!(result.actions[1].priority, Priority::Medium);
  }

  #[test]
  fn low_failure_ratio_does_not_fire() {
    let mut cases = vec![case("f1", TestStatus::Failed, None)];
    for i in 0..19 {
      cases.push(case(&format!("p{}", i), TestStatus::Passed, None));
    }
    let result = fallback(&report(cases), FallbackReason::AiError);
    // 1/20 = 5%: below the threshold, so only the general branch fires.
    assert_eq!(result.root_causes[0].area, "general");
  }

  #[test]
  fn flaky_branch_selects_by_status_or_retries() {
    let result = fallback(
      &report(vec![
        case("flaky-1", TestStatus::Flaky, Some(1)),
        case("retried", TestStatus::Passed, Some(2)),
        case("stable", TestStatus::Passed, None),
      ]),
      FallbackReason::QuotaOrRateLimit,
    );

    assert_eq!(result.root_causes[0].area, "frontend");
    assert_eq!(result.flaky_candidates.len(), 2);
    assert_eq!(result.flaky_candidates[0].test_id, "flaky-1");
    assert_eq!(result.flaky_candidates[1].test_id, "retried");
    assert_eq!(result.flaky_candidates[0].confidence, 0.6);
    // Evidence carries the title plus tags.
    assert!(result.flaky_candidates[0]
      .evidence
      .contains(&"title of flaky-1".to_string()));
    assert!(result.flaky_candidates[0].evidence.contains(&"ui".to_string()));
  }

  #[test]
  fn flaky_candidates_are_capped_at_ten() {
    let cases: Vec<TestCase> = (0..15)
      .map(|i| case(&format!("flaky-{}", i), TestStatus::Flaky, Some(1)))
      .collect();
    let result = fallback(&report(cases), FallbackReason::AiError);
    assert_eq!(result.flaky_candidates.len(), 10);
    assert_eq!(result.flaky_candidates[0].test_id, "flaky-0");
  }

  #[test]
  fn both_branches_can_fire_together() {
    let result = fallback(
      &report(vec![
        case("f1", TestStatus::Failed, None),
        case("flaky-1", TestStatus::Flaky, Some(1)),
      ]),
      FallbackReason::AiError,
    );
    assert_eq!(result.root_causes.len(), 2);
    assert_eq!(result.root_causes[0].area, "backend");
    assert_eq!(result.root_causes[1].area, "frontend");
    assert_eq!(result.actions.len(), 5);
  }

  #[test]
  fn quiet_report_gets_general_hypothesis() {
    let result = fallback(
      &report(vec![case("p1", TestStatus::Passed, None)]),
      FallbackReason::Disabled,
    );
    assert_eq!(result.root_causes.len(), 1);
    assert_eq!(result.root_causes[0].area, "general");
    assert_eq!(result.root_causes[0].likelihood, 0.4);
    assert!(result.root_causes[0].description.contains("disabled"));
    assert_eq!(result.actions.len(), 2);
  }

  #[test]
  fn empty_report_still_yields_causes_and_actions() {
    let result = fallback(&report(Vec::new()), FallbackReason::AiError);
    assert!(!result.root_causes.is_empty());
    assert!(!result.actions.is_empty());
  }

  #[test]
  fn final_action_is_always_low_priority_rerun() {
    for reason in [
      FallbackReason::Disabled,
      FallbackReason::QuotaOrRateLimit,
      FallbackReason::AiError,
    ] {
      let result = fallback(&report(vec![case("p1", TestStatus::Passed, None)]), reason);
      let last = result.actions.last().unwrap();
      assert_eq!(last.title, "Re-run analysis after fixes");
      assert_eq!(last.priority, Priority::Low);
    }
  }

  #[test]
  fn ids_are_stable_across_runs() {
    let input = report(vec![case("f1", TestStatus::Failed, None)]);
    let a = fallback(&input, FallbackReason::AiError);
    let b = fallback(&input, FallbackReason::AiError);
    assert_eq!(a, b);
    assert!(a.root_causes[0].id.starts_with("fallback-"));
  }

  #[test]
  fn reason_tag_renders_for_logging() {
    assert_eq!(FallbackReason::Disabled.to_string(), "disabled");
    assert_eq!(
      FallbackReason::QuotaOrRateLimit.to_string(),
      "quota_or_rate_limit"
    );
    assert_eq!(FallbackReason::AiError.to_string(), "ai_error");
  }
}
