//! Normalize raw report documents into a canonical report.
//!
//! Two shapes are recognized by structural inspection (no version tag):
//! a flat list of test records, and a hierarchical suite/spec/test report
//! (Playwright JSON format). Aggregate counts are always recomputed from
//! the case list, never trusted from the source.
//!
//! Extraction is lenient field by field: a wrong-typed auxiliary or
//! metadata field is dropped, never fatal, and never drops a record that
//! carries a result. Only a document with no extractable test results
//! fails.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AnalyzerError;
use crate::types::*;

/// Parse and normalize a raw report document.
///
/// Fails with `UnsupportedShape` when no test results can be extracted —
/// callers must distinguish "no data" from "zero tests ran". Pure apart
/// from an id-allocation state scoped to this call.
pub fn normalize(raw: &Value) -> Result<CanonicalReport, AnalyzerError> {
  match raw {
    Value::Array(items) => {
      let mut ids = IdAllocator::default();
      let cases = flat_cases(items, &mut ids);
      finish(cases, Metadata::default())
    }
    Value::Object(map) => {
      let mut ids = IdAllocator::default();
      let mut cases = Vec::new();
      for suite in suites_in(map) {
        walk_suite(&suite, None, &mut cases, &mut ids);
      }
      if cases.is_empty() {
        // Top-level flat list, honored only when traversal found nothing.
        if let Some(items) = map.get("tests").and_then(Value::as_array) {
          cases = flat_cases(items, &mut ids);
        }
      }
      finish(cases, metadata_from(map))
    }
    _ => Err(AnalyzerError::unsupported("expected a JSON array or object")),
  }
}

/// Optional run metadata carried alongside the case list.
#[derive(Default)]
struct Metadata {
  commit: Option<String>,
  branch: Option<String>,
  started_at: Option<DateTime<Utc>>,
  ended_at: Option<DateTime<Utc>>,
  environment: BTreeMap<String, String>,
}

/// Call-scoped id allocation. Never process-wide: repeated or concurrent
/// normalizations must not share state. Every emitted case id passes
/// through `reserve`, which keeps ids unique within the report.
#[derive(Default)]
struct IdAllocator {
  counter: u32,
  used: BTreeSet<String>,
}

impl IdAllocator {
  /// Next synthesized id candidate; uniqueness is enforced by `reserve`.
  fn next(&mut self) -> String {
    self.counter += 1;
    format!("case-{}", self.counter)
  }

  /// Claim `candidate`, suffixing duplicates until the id is free.
  fn reserve(&mut self, candidate: String) -> String {
    if self.used.insert(candidate.clone()) {
      return candidate;
    }
    let mut n = 2;
    loop {
      let alt = format!("{}~{}", candidate, n);
      if self.used.insert(alt.clone()) {
        return alt;
      }
      n += 1;
    }
  }
}

fn finish(cases: Vec<TestCase>, meta: Metadata) -> Result<CanonicalReport, AnalyzerError> {
  if cases.is_empty() {
    return Err(AnalyzerError::unsupported("no test results found"));
  }
  Ok(CanonicalReport {
    commit: meta.commit,
    branch: meta.branch,
    started_at: meta.started_at,
    ended_at: meta.ended_at,
    environment: meta.environment,
    summary: recompute_counts(&cases),
    tests: cases,
  })
}

/// Aggregate counts from the case list. The `flaky` count covers cases with
/// status Flaky only; nonzero retries feed flaky-candidate selection in the
/// fallback but not this count, so the four buckets partition `total`.
fn recompute_counts(cases: &[TestCase]) -> SummaryCounts {
  let mut counts = SummaryCounts::default();
  for case in cases {
    counts.total += 1;
    match case.status {
      TestStatus::Passed => counts.passed += 1,
      TestStatus::Failed => counts.failed += 1,
      TestStatus::Flaky => counts.flaky += 1,
      TestStatus::Skipped => counts.skipped += 1,
    }
  }
  counts
}

/// Suite entries that parse as suite objects; malformed entries are dropped
/// rather than failing the document.
fn suites_in(map: &Map<String, Value>) -> Vec<InboundSuite> {
  map
    .get("suites")
    .and_then(Value::as_array)
    .map(|items| {
      items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
    })
    .unwrap_or_default()
}

/// Flat shape: each object item with a title becomes one case. Fields are
/// read individually, so one wrong-typed auxiliary field never drops a
/// record that carries a result.
fn flat_cases(items: &[Value], ids: &mut IdAllocator) -> Vec<TestCase> {
  items
    .iter()
    .filter_map(|item| {
      let title = item.get("title").and_then(Value::as_str)?;
      if title.is_empty() {
        return None;
      }
      // A missing status means no recorded outcome, i.e. skipped. A status
      // that is present but unrecognized, or not even a string, fails closed.
      let status = match item.get("status") {
        None | Some(Value::Null) => TestStatus::Skipped,
        Some(Value::String(s)) => TestStatus::from_raw(s),
        Some(_) => TestStatus::Failed,
      };
      let id = match item.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => ids.next(),
      };
      Some(TestCase {
        id: ids.reserve(id),
        title: title.to_string(),
        status,
        duration_ms: item.get("durationMs").and_then(Value::as_f64),
        error_message: item
          .get("errorMessage")
          .and_then(Value::as_str)
          .map(String::from),
        retries: item.get("retries").and_then(Value::as_u64).map(|r| r as u32),
        tags: item
          .get("tags")
          .and_then(Value::as_array)
          .map(|tags| tags.iter().filter_map(Value::as_str).map(String::from).collect())
          .unwrap_or_default(),
      })
    })
    .collect()
}

/// Depth-first traversal: a group's own specs first, then nested groups.
fn walk_suite(
  suite: &InboundSuite,
  parent_file: Option<&str>,
  cases: &mut Vec<TestCase>,
  ids: &mut IdAllocator,
) {
  let file = suite.file.as_deref().or(parent_file);
  for spec in &suite.specs {
    emit_spec(spec, file, cases, ids);
  }
  for child in &suite.suites {
    walk_suite(child, file, cases, ids);
  }
}

fn emit_spec(
  spec: &InboundSpec,
  suite_file: Option<&str>,
  cases: &mut Vec<TestCase>,
  ids: &mut IdAllocator,
) {
  let file = spec.file.as_deref().or(suite_file);
  let base_id = match (&spec.id, file) {
    (Some(id), _) if !id.is_empty() => id.clone(),
    (_, Some(f)) if !spec.title.is_empty() => format!("{}:{}", f, spec.title),
    _ => ids.next(),
  };

  for (index, test) in spec.tests.iter().enumerate() {
    let mut test_id = base_id.clone();
    if spec.tests.len() > 1 {
      // Same spec under multiple projects: keep ids unique within the report.
      match test.project_name.as_deref() {
        Some(p) if !p.is_empty() => test_id = format!("{}@{}", test_id, p),
        _ => test_id = format!("{}@{}", test_id, index),
      }
    }

    let mut tags = spec.tags.clone();
    if let Some(project) = test.project_name.as_deref() {
      if !project.is_empty() {
        tags.push(project.to_string());
      }
    }

    if test.results.is_empty() {
      // No recorded outcome at all: skipped, not failed.
      cases.push(TestCase {
        id: ids.reserve(test_id),
        title: spec.title.clone(),
        status: TestStatus::Skipped,
        duration_ms: None,
        error_message: None,
        retries: None,
        tags,
      });
      continue;
    }

    for attempt in &test.results {
      let id = if attempt.retry > 0 {
        format!("{}#r{}", test_id, attempt.retry)
      } else {
        test_id.clone()
      };
      // A recorded attempt with no status is ambiguous, so it fails closed.
      let status = match attempt.status.as_deref() {
        Some(s) => TestStatus::from_raw(s),
        None => TestStatus::Failed,
      };
      cases.push(TestCase {
        id: ids.reserve(id),
        title: spec.title.clone(),
        status,
        duration_ms: attempt.duration,
        error_message: attempt.error.as_ref().and_then(|e| e.message.clone()),
        retries: Some(attempt.retry),
        tags: tags.clone(),
      });
    }
  }
}

/// Run metadata, extracted field by field. A wrong-typed field (or map
/// entry) is dropped; metadata problems are never fatal.
fn metadata_from(map: &Map<String, Value>) -> Metadata {
  let stats = map.get("stats");
  let started_at = map
    .get("startedAt")
    .and_then(Value::as_str)
    .and_then(parse_ts)
    .or_else(|| {
      stats
        .and_then(|s| s.get("startTime"))
        .and_then(Value::as_str)
        .and_then(parse_ts)
    });
  let run_ms = stats.and_then(|s| s.get("duration")).and_then(Value::as_f64);
  let ended_at = map
    .get("endedAt")
    .and_then(Value::as_str)
    .and_then(parse_ts)
    .or_else(|| match (started_at, run_ms) {
      (Some(start), Some(ms)) => Some(start + Duration::milliseconds(ms as i64)),
      _ => None,
    });
  Metadata {
    commit: map.get("commit").and_then(Value::as_str).map(String::from),
    branch: map.get("branch").and_then(Value::as_str).map(String::from),
    started_at,
    ended_at,
    environment: map
      .get("environment")
      .and_then(Value::as_object)
      .map(|env| {
        env
          .iter()
          .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
          .collect()
      })
      .unwrap_or_default(),
  }
}

/// Lenient timestamp parsing: invalid metadata is dropped, never fatal.
fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .ok()
    .map(|t| t.with_timezone(&Utc))
}
