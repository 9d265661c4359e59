//! LLM integration for plan generation
//!
//! This module talks to the text-generation backends. Every provider is
//! reduced to "prompt in, raw text out"; what the text means is the parser's
//! business. Attempts are retried per the retry policy and a secondary
//! provider can take over when the primary one is exhausted.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::defaults::{ATTEMPT_TIMEOUT_SECS, DEFAULT_FAILURE_STATUS, DEFAULT_MAX_TOKENS};
use crate::http::{HttpClient, RequestOptions, TransportError};
use crate::retry::{execute_with_retry, RetryFailure, RetryPolicy, Sleeper, TokioSleeper};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

pub const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Wire envelope spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
  /// Anthropic Messages API
  Anthropic,
  /// OpenAI-style chat completions (OpenAI, Groq, Ollama, vLLM)
  OpenAiCompatible,
}

impl std::fmt::Display for ProviderKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Anthropic => write!(f, "anthropic"),
      Self::OpenAiCompatible => write!(f, "openai_compatible"),
    }
  }
}

#[derive(Clone)]
pub struct ProviderConfig {
  pub kind: ProviderKind,
  pub url: String,
  pub model: String,
  pub api_key: String,
  pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProviderConfig")
      .field("kind", &self.kind)
      .field("url", &self.url)
      .field("model", &self.model)
      .field("api_key", &"<redacted>")
      .field("max_tokens", &self.max_tokens)
      .finish()
  }
}

impl ProviderConfig {
  pub fn anthropic(api_key: impl Into<String>) -> Self {
    Self {
      kind: ProviderKind::Anthropic,
      url: CLAUDE_API_URL.to_string(),
      model: CLAUDE_MODEL.to_string(),
      api_key: api_key.into(),
      max_tokens: DEFAULT_MAX_TOKENS,
    }
  }

  pub fn openai_compatible(api_key: impl Into<String>) -> Self {
    Self {
      kind: ProviderKind::OpenAiCompatible,
      url: OPENAI_API_URL.to_string(),
      model: OPENAI_MODEL.to_string(),
      api_key: api_key.into(),
      max_tokens: DEFAULT_MAX_TOKENS,
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.url = url.into();
    self
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }
}

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum LlmError {
  #[error("Request failed: {0}")]
  Request(String),

  #[error("Connection failed: {0}")]
  Connection(String),

  #[error("Request timed out after {0}s")]
  Timeout(u64),

  #[error("API error {status}: {message}")]
  Api { status: u16, message: String },

  #[error("Parse error: {0}")]
  Parse(String),

  /// Retries exhausted, or a non-retryable upstream failure
  #[error("AI generation failed after {attempts} attempt(s) (status {status}): {message}")]
  GenerationFailed {
    status: u16,
    attempts: u32,
    message: String,
  },
}

impl LlmError {
  /// Timeouts, connection failures, 5xx, 429 and garbled success envelopes
  /// are worth another attempt
  pub fn is_retryable(&self) -> bool {
    match self {
      LlmError::Connection(_) | LlmError::Timeout(_) | LlmError::Parse(_) => true,
      LlmError::Api { status, .. } => *status == 429 || (500..=599).contains(status),
      _ => false,
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      LlmError::Api { status, .. } | LlmError::GenerationFailed { status, .. } => Some(*status),
      LlmError::Parse(_) => Some(502),
      _ => None,
    }
  }

  fn from_transport(error: TransportError, timeout: Duration) -> Self {
    match error {
      TransportError::Timeout => LlmError::Timeout(timeout.as_secs()),
      TransportError::Connection(msg) => LlmError::Connection(msg),
      TransportError::Other(msg) => LlmError::Request(msg),
    }
  }

  fn exhausted(failure: RetryFailure<LlmError>) -> Self {
    LlmError::GenerationFailed {
      status: failure.error.status().unwrap_or(DEFAULT_FAILURE_STATUS),
      attempts: failure.attempts,
      message: failure.error.to_string(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
  model: &'a str,
  max_tokens: u32,
  system: &'a str,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  #[allow(dead_code)]
  model: Option<String>,
  stop_reason: Option<String>,
  usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
  #[serde(alias = "prompt_tokens", default)]
  pub input_tokens: u32,
  #[serde(alias = "completion_tokens", default)]
  pub output_tokens: u32,
}

/// Both providers report errors as {"error": {"message": ...}}
#[derive(Debug, Deserialize)]
struct ErrorResponse {
  error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// OpenAI-compatible API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  max_tokens: u32,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<Choice>,
  usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
  finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Envelopes
/// ---------------------------------------------------------------------------

fn build_request(
  provider: &ProviderConfig,
  system: &str,
  prompt: &str,
  timeout: Duration,
) -> Result<(Value, RequestOptions), LlmError> {
  let options = RequestOptions::default()
    .header("content-type", "application/json")
    .timeout(timeout);

  let (body, options) = match provider.kind {
    ProviderKind::Anthropic => {
      let request = ClaudeRequest {
        model: &provider.model,
        max_tokens: provider.max_tokens,
        system,
        messages: vec![ChatMessage {
          role: "user",
          content: prompt,
        }],
      };
      (
        serde_json::to_value(&request),
        options
          .header("x-api-key", provider.api_key.as_str())
          .header("anthropic-version", API_VERSION),
      )
    }
    ProviderKind::OpenAiCompatible => {
      let request = ChatCompletionRequest {
        model: &provider.model,
        max_tokens: provider.max_tokens,
        messages: vec![
          ChatMessage {
            role: "system",
            content: system,
          },
          ChatMessage {
            role: "user",
            content: prompt,
          },
        ],
      };
      (
        serde_json::to_value(&request),
        options.header("authorization", format!("Bearer {}", provider.api_key)),
      )
    }
  };

  let body = body.map_err(|e| LlmError::Request(e.to_string()))?;
  Ok((body, options))
}

/// Unwrap the provider envelope to raw model text. A well-formed envelope
/// without any text yields an empty string, which the parser treats as
/// "no plan".
fn extract_text(kind: ProviderKind, body: &str) -> Result<(String, Usage), LlmError> {
  match kind {
    ProviderKind::Anthropic => {
      let response: ClaudeResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;

      if response.stop_reason.as_deref() == Some("max_tokens") {
        warn!("Claude response truncated at max_tokens");
      }

      let text = response
        .content
        .iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

      Ok((text, response.usage.unwrap_or_default()))
    }
    ProviderKind::OpenAiCompatible => {
      let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;

      let choice = response.choices.into_iter().next();
      if choice.as_ref().and_then(|c| c.finish_reason.as_deref()) == Some("length") {
        warn!("Chat completion truncated at max_tokens");
      }
      let text = choice.and_then(|c| c.message.content).unwrap_or_default();

      Ok((text, response.usage.unwrap_or_default()))
    }
  }
}

fn error_message(status: u16, body: &str) -> String {
  match serde_json::from_str::<ErrorResponse>(body) {
    Ok(error_resp) => error_resp.error.message,
    Err(_) => format!("HTTP {}: {}", status, body.chars().take(500).collect::<String>()),
  }
}

/// ---------------------------------------------------------------------------
/// Generation Client
/// ---------------------------------------------------------------------------

pub struct GenerationClient {
  http: Arc<dyn HttpClient>,
  primary: ProviderConfig,
  fallback: Option<ProviderConfig>,
  retry: RetryPolicy,
  attempt_timeout: Duration,
  sleeper: Arc<dyn Sleeper>,
}

impl GenerationClient {
  pub fn new(http: Arc<dyn HttpClient>, primary: ProviderConfig) -> Self {
    Self {
      http,
      primary,
      fallback: None,
      retry: RetryPolicy::default(),
      attempt_timeout: Duration::from_secs(ATTEMPT_TIMEOUT_SECS),
      sleeper: Arc::new(TokioSleeper),
    }
  }

  pub fn with_fallback(mut self, fallback: Option<ProviderConfig>) -> Self {
    self.fallback = fallback;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
    self.attempt_timeout = timeout;
    self
  }

  pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
    self.sleeper = sleeper;
    self
  }

  /// Raw model text for a prompt. The only error is
  /// `LlmError::GenerationFailed`, carrying the last upstream status.
  #[instrument(skip_all, fields(prompt_len = prompt.len()))]
  pub async fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
    let primary_error = match self.generate_with(&self.primary, system, prompt).await {
      Ok(text) => return Ok(text),
      Err(e) => e,
    };

    let Some(fallback) = &self.fallback else {
      return Err(primary_error);
    };

    warn!(
      primary = %self.primary.kind,
      fallback = %fallback.kind,
      error = %primary_error,
      "Primary provider failed, switching to fallback"
    );
    self.generate_with(fallback, system, prompt).await
  }

  async fn generate_with(
    &self,
    provider: &ProviderConfig,
    system: &str,
    prompt: &str,
  ) -> Result<String, LlmError> {
    let this = self;
    let result = execute_with_retry(
      &self.retry,
      self.sleeper.as_ref(),
      LlmError::is_retryable,
      move |attempt| {
        debug!(provider = %provider.kind, model = %provider.model, attempt, "Calling provider");
        this.attempt(provider, system, prompt)
      },
    )
    .await;

    result.map_err(LlmError::exhausted)
  }

  /// One bounded attempt against one provider
  async fn attempt(
    &self,
    provider: &ProviderConfig,
    system: &str,
    prompt: &str,
  ) -> Result<String, LlmError> {
    let (body, options) = build_request(provider, system, prompt, self.attempt_timeout)?;

    let response = tokio::time::timeout(
      self.attempt_timeout,
      self.http.post(&provider.url, &body, &options),
    )
    .await
    .map_err(|_| LlmError::Timeout(self.attempt_timeout.as_secs()))?
    .map_err(|e| LlmError::from_transport(e, self.attempt_timeout))?;

    if !response.is_success() {
      return Err(LlmError::Api {
        status: response.status,
        message: error_message(response.status, &response.body),
      });
    }

    let (text, usage) = extract_text(provider.kind, &response.body)?;
    info!(
      provider = %provider.kind,
      input_tokens = usage.input_tokens,
      output_tokens = usage.output_tokens,
      text_len = text.len(),
      "Provider responded"
    );
    Ok(text)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
