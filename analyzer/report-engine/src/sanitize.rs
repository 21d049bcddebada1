//! Coerce untrusted AI JSON into a strict, fully-defaulted analysis result.
//!
//! This is the sole boundary trusted to accept adversarial or malformed
//! input. It never fails: non-list fields become empty lists, falsy list
//! elements are dropped, and every sub-field is coerced to its declared
//! type with a fixed default when absent or wrong-typed.

use serde_json::Value;

use crate::types::{
  ActionItem, AiAnalysisResult, FlakyCandidate, NewTestIdea, Priority, RootCauseHypothesis,
};

pub fn sanitize(json: &Value) -> AiAnalysisResult {
  let root_causes = list(json, "rootCauses")
    .into_iter()
    .enumerate()
    .map(|(i, item)| RootCauseHypothesis {
      id: string_field(item, "id").unwrap_or_else(|| format!("ai-{}", i)),
      area: string_field(item, "area").unwrap_or_else(|| "general".to_string()),
      description: string_field(item, "description").unwrap_or_else(|| "Unspecified".to_string()),
      evidence: string_list(item, "evidence"),
      likelihood: number_field(item, "likelihood").unwrap_or(0.5).clamp(0.0, 1.0),
    })
    .collect();

  let flaky_candidates = list(json, "flakyCandidates")
    .into_iter()
    .enumerate()
    .map(|(i, item)| FlakyCandidate {
      test_id: string_field(item, "testId").unwrap_or_else(|| format!("test-{}", i)),
      reason: string_field(item, "reason")
        .unwrap_or_else(|| "Potential timing / network sensitivity".to_string()),
      evidence: string_list(item, "evidence"),
      confidence: number_field(item, "confidence").unwrap_or(0.5).clamp(0.0, 1.0),
    })
    .collect();

  let new_test_ideas = list(json, "newTestIdeas")
    .into_iter()
    .map(|item| NewTestIdea {
      title: string_field(item, "title").unwrap_or_else(|| "New test idea".to_string()),
      description: string_field(item, "description").unwrap_or_else(|| "Unspecified".to_string()),
      target_area: string_field(item, "targetArea").unwrap_or_else(|| "general".to_string()),
      priority: priority_field(item, "priority"),
    })
    .collect();

  let actions = list(json, "actions")
    .into_iter()
    .map(|item| ActionItem {
      title: string_field(item, "title").unwrap_or_else(|| "Action".to_string()),
      description: string_field(item, "description").unwrap_or_else(|| "Unspecified".to_string()),
      owner_hint: item
        .get("ownerHint")
        .filter(|v| !is_falsy(v))
        .and_then(coerce_string),
      priority: priority_field(item, "priority"),
    })
    .collect();

  AiAnalysisResult {
    root_causes,
    flaky_candidates,
    new_test_ideas,
    actions,
  }
}

/// A named list field with falsy elements dropped; anything that is not an
/// ordered list is treated as empty.
fn list<'a>(json: &'a Value, key: &str) -> Vec<&'a Value> {
  json
    .get(key)
    .and_then(Value::as_array)
    .map(|items| items.iter().filter(|v| !is_falsy(v)).collect())
    .unwrap_or_default()
}

fn is_falsy(v: &Value) -> bool {
  match v {
    Value::Null => true,
    Value::Bool(b) => !b,
    Value::Number(n) => n.as_f64() == Some(0.0),
    Value::String(s) => s.is_empty(),
    _ => false,
  }
}

/// Scalar-to-string coercion; objects and arrays are treated as absent.
fn coerce_string(v: &Value) -> Option<String> {
  match v {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn string_field(item: &Value, key: &str) -> Option<String> {
  item.get(key).and_then(coerce_string)
}

fn number_field(item: &Value, key: &str) -> Option<f64> {
  item.get(key).and_then(Value::as_f64)
}

fn string_list(item: &Value, key: &str) -> Vec<String> {
  item
    .get(key)
    .and_then(Value::as_array)
    .map(|items| items.iter().filter_map(coerce_string).collect())
    .unwrap_or_default()
}

fn priority_field(item: &Value, key: &str) -> Priority {
  item
    .get(key)
    .and_then(Value::as_str)
    .and_then(Priority::from_raw)
    .unwrap_or_default()
}
