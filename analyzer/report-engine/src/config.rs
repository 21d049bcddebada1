//! AI configuration, constructed once at process start.
//!
//! Core logic never reads the environment; the entrypoint builds an
//! `AiConfig` and passes it in.

use std::env;

/// Which LLM provider backs the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
  Off,
  Null,
  OpenAi,
}

impl ProviderKind {
  pub fn from_str_loose(s: &str) -> Self {
    match s.to_ascii_lowercase().as_str() {
      "openai" => Self::OpenAi,
      "null" | "mock" => Self::Null,
      _ => Self::Off,
    }
  }
}

/// Tunable AI settings, immutable for the run.
#[derive(Debug, Clone)]
pub struct AiConfig {
  pub provider: ProviderKind,
  pub enabled: bool,
  pub model: String,
  pub api_key: String,
  /// Spending budget in cents; zero keeps the remote provider off.
  pub budget_cents: u32,
  /// Sampling temperature for generation.
  pub temperature: f32,
  /// Max output length for generation.
  pub max_tokens: u32,
}

impl Default for AiConfig {
  fn default() -> Self {
    Self {
      provider: ProviderKind::Off,
      enabled: false,
      model: "gpt-4o-mini".to_string(),
      api_key: String::new(),
      budget_cents: 0,
      temperature: 0.2,
      max_tokens: 1200,
    }
  }
}

impl AiConfig {
  /// Build from environment variables. Entrypoint only.
  pub fn from_env() -> Self {
    let defaults = Self::default();
    Self {
      provider: ProviderKind::from_str_loose(&env::var("AI_PROVIDER").unwrap_or_default()),
      enabled: env::var("AI_ENABLED")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false),
      model: env::var("AI_MODEL")
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(defaults.model),
      api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
      budget_cents: env::var("AI_BUDGET_CENTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.budget_cents),
      temperature: env::var("OPENAI_TEMPERATURE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.temperature),
      max_tokens: env::var("OPENAI_MAX_TOKENS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_tokens),
    }
  }

  /// The remote provider is only attempted when every gate passes: a real
  /// provider is selected, the enabled flag is set, a credential is present,
  /// and the budget is positive.
  pub fn ai_allowed(&self) -> bool {
    self.enabled
      && self.provider == ProviderKind::OpenAi
      && !self.api_key.is_empty()
      && self.budget_cents > 0
  }
}
