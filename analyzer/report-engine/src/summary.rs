//! Deterministic report summarizer. No AI, no I/O.

use crate::types::{CanonicalReport, RunSummary, TestStatus};

/// Reduce a canonical report to totals plus rule-based notes.
///
/// Pure: the same report always yields the same summary, including note
/// order. Rules run in a fixed order and each is independently optional;
/// notes are never deduplicated or reordered.
pub fn summarize(report: &CanonicalReport) -> RunSummary {
  let counts = report.summary;
  let mut notes = Vec::new();

  if counts.failed > 0 {
    // First failed case (by list order) that actually carries a message.
    let example = report.tests.iter().find(|t| {
      t.status == TestStatus::Failed
        && t.error_message.as_deref().is_some_and(|m| !m.is_empty())
    });
    if let Some(case) = example {
      if let Some(message) = case.error_message.as_deref() {
        notes.push(format!("Example failure: {} → {}", case.title, message));
      }
    }
  }

  if counts.skipped > 0 {
    notes.push(format!("Skipped: {}", counts.skipped));
  }

  // Vacuously true for an empty report as well.
  if counts.passed == counts.total {
    notes.push("All tests passed!".to_string());
  }

  RunSummary {
    total: counts.total,
    passed: counts.passed,
    failed: counts.failed,
    skipped: counts.skipped,
    notes,
  }
}
