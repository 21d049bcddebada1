//! AI analysis orchestrator: provider call, sanitation, fallback on error.
//!
//! The only component with a failure-handling policy. A single provider
//! attempt (no retry loop); any failure in the call or in parsing its
//! output is classified and converted into the deterministic fallback.

use serde_json::Value;

use crate::config::AiConfig;
use crate::fallback::{fallback, FallbackReason};
use crate::prompt;
use crate::provider::{create_provider, GenerateOptions, LlmProvider};
use crate::sanitize::sanitize;
use crate::types::{AiAnalysisResult, CanonicalReport};

/// Orchestrates the AI pass. `analyze` never fails outward.
pub struct AiAnalyzer {
  provider: Option<Box<dyn LlmProvider>>,
  options: GenerateOptions,
}

impl AiAnalyzer {
  /// Analyzer wired from configuration. A gated-off or `off` selector
  /// yields no provider and every analysis goes straight to the fallback.
  pub fn from_config(config: &AiConfig) -> Self {
    Self {
      provider: create_provider(config),
      options: GenerateOptions {
        system: Some(prompt::SYSTEM_PROMPT.to_string()),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
      },
    }
  }

  /// Analyzer backed by an explicit provider (tests, embedding).
  pub fn with_provider(provider: Box<dyn LlmProvider>) -> Self {
    Self {
      provider: Some(provider),
      options: GenerateOptions {
        system: Some(prompt::SYSTEM_PROMPT.to_string()),
        ..GenerateOptions::default()
      },
    }
  }

  pub async fn analyze(&self, report: &CanonicalReport) -> AiAnalysisResult {
    let provider = match &self.provider {
      Some(p) => p,
      None => {
        eprintln!(
          "report-engine: ai pass skipped: reason={}",
          FallbackReason::Disabled
        );
        return fallback(report, FallbackReason::Disabled);
      }
    };

    let payload = match serde_json::to_string(report) {
      Ok(p) => p,
      Err(e) => {
        eprintln!("report-engine: report serialization failed: {}", e);
        return fallback(report, FallbackReason::AiError);
      }
    };
    let request = prompt::root_cause_prompt(&payload);

    let raw = match provider.generate(&request, &self.options).await {
      Ok(raw) => raw,
      Err(e) => {
        let reason = if e.is_quota_or_rate_limit() {
          FallbackReason::QuotaOrRateLimit
        } else {
          FallbackReason::AiError
        };
        eprintln!(
          "report-engine: provider {} failed, using fallback: reason={} error={}",
          provider.name(),
          reason,
          e
        );
        return fallback(report, reason);
      }
    };

    // Malformed JSON counts as a provider error, not a distinct failure mode.
    match serde_json::from_str::<Value>(strip_code_fences(&raw)) {
      Ok(json) => sanitize(&json),
      Err(e) => {
        eprintln!(
          "report-engine: provider {} returned non-JSON output, using fallback: {}",
          provider.name(),
          e
        );
        fallback(report, FallbackReason::AiError)
      }
    }
  }
}

/// Strip leading/trailing markdown code fences (``` with an optional
/// `json` language tag in any case).
fn strip_code_fences(raw: &str) -> &str {
  let mut text = raw.trim();
  if let Some(rest) = text.strip_prefix("```") {
    let rest = match rest.get(..4) {
      Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
      _ => rest,
    };
    text = rest.trim_start();
  }
  if let Some(rest) = text.strip_suffix("```") {
    text = rest.trim_end();
  }
  text
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::ProviderError;
  use crate::types::{SummaryCounts, TestCase, TestStatus};
  use async_trait::async_trait;
  use std::collections::BTreeMap;

  struct FixedProvider(String);

  #[async_trait]
  impl LlmProvider for FixedProvider {
    fn name(&self) -> &'static str {
      "fixed"
    }

    async fn generate(
      &self,
      _prompt: &str,
      _options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
      Ok(self.0.clone())
    }
  }

  struct FailingProvider {
    status: u16,
    body: &'static str,
  }

  #[async_trait]
  impl LlmProvider for FailingProvider {
    fn name(&self) -> &'static str {
      "failing"
    }

    async fn generate(
      &self,
      _prompt: &str,
      _options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
      Err(ProviderError::Api {
        status: self.status,
        body: self.body.to_string(),
      })
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

  fn passing_case() -> TestCase {
    TestCase {
      id: "t1".into(),
      title: "ok".into(),
      status: TestStatus::Passed,
      duration_ms: None,
      error_message: None,
      retries: None,
      tags: Vec::new(),
    }
  }

  #[test]
  fn fences_are_stripped() {
    assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("  ```JSON\n{}\n```  "), "{}");
    // Mixed-case language tags are recognized too.
    assert_eq!(strip_code_fences("```Json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("```"), "");
  }

  #[tokio::test]
  async fn valid_provider_output_is_sanitized() {
    let analyzer = AiAnalyzer::with_provider(Box::new(FixedProvider(
      r#"```json
{"rootCauses": [{"id": "rc-9", "area": "backend"}], "actions": "nope"}
```"#
        .to_string(),
    )));
    let result = analyzer.analyze(&report(vec![passing_case()])).await;
    assert_eq!(result.root_causes.len(), 1);
    assert_eq!(result.root_causes[0].id, "rc-9");
    // Wrong-typed actions field sanitizes to empty, not an error.
    assert!(result.actions.is_empty());
  }

  #[tokio::test]
  async fn garbage_output_falls_back() {
    let analyzer =
      AiAnalyzer::with_provider(Box::new(FixedProvider("not json at all".to_string())));
    let result = analyzer.analyze(&report(vec![passing_case()])).await;
    assert!(!result.root_causes.is_empty());
    assert!(!result.actions.is_empty());
  }

  #[tokio::test]
  async fn provider_errors_fall_back() {
    let analyzer = AiAnalyzer::with_provider(Box::new(FailingProvider {
      status: 429,
      body: "insufficient_quota",
    }));
    let result = analyzer.analyze(&report(vec![passing_case()])).await;
    assert!(!result.root_causes.is_empty());
    assert!(!result.actions.is_empty());
  }

  #[tokio::test]
  async fn no_provider_short_circuits_to_fallback() {
    let analyzer = AiAnalyzer::from_config(&AiConfig::default());
    let result = analyzer.analyze(&report(vec![passing_case()])).await;
    assert_eq!(result.root_causes[0].area, "general");
    assert!(result.root_causes[0].description.contains("disabled"));
  }

  #[tokio::test]
  async fn analyze_handles_the_empty_report() {
    let analyzer = AiAnalyzer::from_config(&AiConfig::default());
    let result = analyzer.analyze(&report(Vec::new())).await;
    assert!(!result.root_causes.is_empty());
    assert!(!result.actions.is_empty());
  }
}
