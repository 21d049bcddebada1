//! LLM provider capability: one operation, `generate`.
//!
//! This is the only network-facing boundary. The core never branches on
//! which concrete provider sits behind the trait; selection happens once,
//! in `create_provider`, keyed on configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AiConfig, ProviderKind};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Generation options passed through to the provider.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
  pub system: Option<String>,
  pub temperature: f32,
  pub max_tokens: u32,
}

impl Default for GenerateOptions {
  fn default() -> Self {
    Self {
      system: None,
      temperature: 0.2,
      max_tokens: 1200,
    }
  }
}

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("missing API key")]
  MissingApiKey,

  #[error("request failed: {0}")]
  Request(String),

  #[error("api error {status}: {body}")]
  Api { status: u16, body: String },

  #[error("malformed provider response: {0}")]
  MalformedResponse(String),
}

impl ProviderError {
  /// Rate-limit/quota detection across common API error shapes: an HTTP 429,
  /// or a "quota"/"rate limit" marker anywhere in the message.
  pub fn is_quota_or_rate_limit(&self) -> bool {
    match self {
      Self::Api { status: 429, .. } => true,
      Self::Api { body, .. } => contains_quota_marker(body),
      Self::Request(msg) | Self::MalformedResponse(msg) => contains_quota_marker(msg),
      Self::MissingApiKey => false,
    }
  }
}

fn contains_quota_marker(text: &str) -> bool {
  let lower = text.to_ascii_lowercase();
  lower.contains("quota") || lower.contains("rate limit")
}

/// Generate raw text from a prompt. Implementations own their transport,
/// auth, and timeouts.
#[async_trait]
pub trait LlmProvider: Send + Sync {
  fn name(&self) -> &'static str;

  async fn generate(
    &self,
    prompt: &str,
    options: &GenerateOptions,
  ) -> Result<String, ProviderError>;
}

/// Pick a provider from configuration.
///
/// `None` means the AI pass is off (selector `off`, or a gated-off remote
/// provider) and the caller must fall back without any network attempt.
/// The `null` selector always yields the offline stub; it performs no I/O.
pub fn create_provider(config: &AiConfig) -> Option<Box<dyn LlmProvider>> {
  match config.provider {
    ProviderKind::OpenAi if config.ai_allowed() => Some(Box::new(OpenAiProvider::new(
      config.api_key.clone(),
      config.model.clone(),
    ))),
    ProviderKind::Null => Some(Box::new(NullProvider)),
    _ => None,
  }
}

// ---------------------------------------------------------------------------
// Null provider (offline deterministic stub)
// ---------------------------------------------------------------------------

/// Offline stub for CI and keyless runs. Returns a fixed analysis payload
/// so downstream behavior is stable in tests.
pub struct NullProvider;

#[async_trait]
impl LlmProvider for NullProvider {
  fn name(&self) -> &'static str {
    "null"
  }

  async fn generate(
    &self,
    _prompt: &str,
    _options: &GenerateOptions,
  ) -> Result<String, ProviderError> {
    let simulated = serde_json::json!({
      "rootCauses": [{
        "id": "rc-1",
        "area": "frontend",
        "description": "UI timing sensitivity around asynchronous loaders.",
        "evidence": ["multiple failures in tests tagged 'ui'", "timeouts > 5s"],
        "likelihood": 0.72
      }],
      "flakyCandidates": [{
        "testId": "ui/login.spec.ts:should login with valid user",
        "reason": "Intermittent timeout on CI only.",
        "evidence": ["passed locally", "fails on CI with timeout"],
        "confidence": 0.68
      }],
      "newTestIdeas": [{
        "title": "Stress test for auth service",
        "description": "Simulate burst of parallel logins and token refresh flows.",
        "targetArea": "backend",
        "priority": "high"
      }],
      "actions": [{
        "title": "Add explicit waits for UI spinner disappearance",
        "description": "Replace fixed delays with condition-based waits in login and dashboard tests.",
        "ownerHint": "QA",
        "priority": "medium"
      }]
    });
    Ok(simulated.to_string())
  }
}

// ---------------------------------------------------------------------------
// OpenAI provider (chat completions over HTTP)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
  model: String,
  messages: Vec<ChatMessage>,
  temperature: f32,
  max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
  role: String,
  content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
  message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
  content: String,
}

pub struct OpenAiProvider {
  client: reqwest::Client,
  api_key: String,
  model: String,
}

impl OpenAiProvider {
  pub fn new(api_key: String, model: String) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_key,
      model,
    }
  }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
  fn name(&self) -> &'static str {
    "openai"
  }

  async fn generate(
    &self,
    prompt: &str,
    options: &GenerateOptions,
  ) -> Result<String, ProviderError> {
    if self.api_key.is_empty() {
      return Err(ProviderError::MissingApiKey);
    }

    let mut messages = Vec::new();
    if let Some(system) = &options.system {
      messages.push(ChatMessage {
        role: "system".to_string(),
        content: system.clone(),
      });
    }
    messages.push(ChatMessage {
      role: "user".to_string(),
      content: prompt.to_string(),
    });

    let request = ChatRequest {
      model: self.model.clone(),
      messages,
      temperature: options.temperature,
      max_tokens: options.max_tokens,
    };

    let response = self
      .client
      .post(OPENAI_URL)
      .header("Authorization", format!("Bearer {}", self.api_key))
      .header("Content-Type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| ProviderError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ProviderError::Api {
        status: status.as_u16(),
        body,
      });
    }

    let parsed: ChatResponse = response
      .json()
      .await
      .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    parsed
      .choices
      .into_iter()
      .next()
      .map(|c| c.message.content)
      .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".to_string()))
  }
}
