//! Environment-driven configuration
//!
//! Read once at startup; nothing here changes afterwards.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::defaults::{ATTEMPT_TIMEOUT_SECS, BASE_DELAY_MS, DEFAULT_MAX_TOKENS, MAX_ATTEMPTS};
use crate::knowledge::KnowledgeError;
use crate::llm::{ProviderConfig, CLAUDE_API_URL, CLAUDE_MODEL, OPENAI_API_URL, OPENAI_MODEL};
use crate::retry::RetryPolicy;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const MODEL_VAR: &str = "RUNPLAN_MODEL";
pub const API_URL_VAR: &str = "RUNPLAN_API_URL";
pub const MAX_TOKENS_VAR: &str = "RUNPLAN_MAX_TOKENS";
pub const FALLBACK_KEY_VAR: &str = "RUNPLAN_FALLBACK_API_KEY";
pub const FALLBACK_MODEL_VAR: &str = "RUNPLAN_FALLBACK_MODEL";
pub const FALLBACK_URL_VAR: &str = "RUNPLAN_FALLBACK_URL";
pub const KNOWLEDGE_PATH_VAR: &str = "RUNPLAN_KNOWLEDGE_PATH";
pub const MAX_ATTEMPTS_VAR: &str = "RUNPLAN_MAX_ATTEMPTS";
pub const BASE_DELAY_VAR: &str = "RUNPLAN_BASE_DELAY_MS";
pub const TIMEOUT_VAR: &str = "RUNPLAN_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  Missing(String),

  #[error("Invalid value for {name}: {reason}")]
  Invalid { name: String, reason: String },

  #[error("Knowledge base error: {0}")]
  Knowledge(#[from] KnowledgeError),
}

impl Serialize for ConfigError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
  pub primary: ProviderConfig,
  pub fallback: Option<ProviderConfig>,
  pub retry: RetryPolicy,
  pub attempt_timeout: Duration,
  pub knowledge_path: Option<PathBuf>,
}

impl PlannerConfig {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self, ConfigError> {
    let api_key = non_empty_var(API_KEY_VAR).ok_or_else(|| ConfigError::Missing(API_KEY_VAR.into()))?;
    let max_tokens = parse_var(MAX_TOKENS_VAR, DEFAULT_MAX_TOKENS)?;

    let mut primary = ProviderConfig::anthropic(api_key)
      .with_model(non_empty_var(MODEL_VAR).unwrap_or_else(|| CLAUDE_MODEL.to_string()))
      .with_url(url_var(API_URL_VAR, CLAUDE_API_URL)?);
    primary.max_tokens = max_tokens;

    let fallback = match non_empty_var(FALLBACK_KEY_VAR) {
      Some(key) => {
        let mut fallback = ProviderConfig::openai_compatible(key)
          .with_model(non_empty_var(FALLBACK_MODEL_VAR).unwrap_or_else(|| OPENAI_MODEL.to_string()))
          .with_url(url_var(FALLBACK_URL_VAR, OPENAI_API_URL)?);
        fallback.max_tokens = max_tokens;
        Some(fallback)
      }
      None => None,
    };

    let max_attempts: u32 = parse_var(MAX_ATTEMPTS_VAR, MAX_ATTEMPTS)?;
    if max_attempts == 0 {
      return Err(ConfigError::Invalid {
        name: MAX_ATTEMPTS_VAR.into(),
        reason: "must be at least 1".into(),
      });
    }

    Ok(Self {
      primary,
      fallback,
      retry: RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(parse_var(BASE_DELAY_VAR, BASE_DELAY_MS)?),
      },
      attempt_timeout: Duration::from_secs(parse_var(TIMEOUT_VAR, ATTEMPT_TIMEOUT_SECS)?),
      knowledge_path: non_empty_var(KNOWLEDGE_PATH_VAR).map(PathBuf::from),
    })
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match non_empty_var(name) {
    None => Ok(default),
    Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
      name: name.into(),
      reason: e.to_string(),
    }),
  }
}

fn url_var(name: &str, default: &str) -> Result<String, ConfigError> {
  let Some(raw) = non_empty_var(name) else {
    return Ok(default.to_string());
  };
  let parsed = url::Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
    name: name.into(),
    reason: e.to_string(),
  })?;
  match parsed.scheme() {
    "http" | "https" => Ok(parsed.to_string()),
    other => Err(ConfigError::Invalid {
      name: name.into(),
      reason: format!("unsupported scheme '{}'", other),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::llm::ProviderKind;
  use serial_test::serial;

  const ALL_VARS: [&str; 11] = [
    API_KEY_VAR,
    MODEL_VAR,
    API_URL_VAR,
    MAX_TOKENS_VAR,
    FALLBACK_KEY_VAR,
    FALLBACK_MODEL_VAR,
    FALLBACK_URL_VAR,
    KNOWLEDGE_PATH_VAR,
    MAX_ATTEMPTS_VAR,
    BASE_DELAY_VAR,
    TIMEOUT_VAR,
  ];

  /// Run `f` with exactly the given variables set and every other one unset
  fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let kvs: Vec<(&str, Option<&str>)> = ALL_VARS
      .iter()
      .map(|name| {
        let value = vars.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
        (*name, value)
      })
      .collect();
    temp_env::with_vars(kvs, f)
  }

  #[test]
  #[serial]
  fn test_missing_api_key() {
    let result = with_env(&[], PlannerConfig::from_env);
    assert!(matches!(result, Err(ConfigError::Missing(name)) if name == API_KEY_VAR));
  }

  #[test]
  #[serial]
  fn test_defaults() {
    let config = with_env(&[(API_KEY_VAR, "sk-test")], PlannerConfig::from_env).unwrap();

    assert_eq!(config.primary.kind, ProviderKind::Anthropic);
    assert_eq!(config.primary.model, CLAUDE_MODEL);
    assert_eq!(config.primary.url, CLAUDE_API_URL);
    assert_eq!(config.primary.max_tokens, 8000);
    assert!(config.fallback.is_none());
    assert_eq!(config.retry, RetryPolicy::default());
    assert_eq!(config.attempt_timeout, Duration::from_secs(30));
    assert!(config.knowledge_path.is_none());
  }

  #[test]
  #[serial]
  fn test_fallback_and_overrides() {
    let config = with_env(
      &[
        (API_KEY_VAR, "sk-test"),
        (MODEL_VAR, "claude-3-5-haiku-latest"),
        (FALLBACK_KEY_VAR, "sk-fallback"),
        (FALLBACK_URL_VAR, "http://localhost:11434/v1/chat/completions"),
        (MAX_ATTEMPTS_VAR, "5"),
        (BASE_DELAY_VAR, "250"),
        (TIMEOUT_VAR, "10"),
        (KNOWLEDGE_PATH_VAR, "/etc/runplan/knowledge.json"),
      ],
      PlannerConfig::from_env,
    )
    .unwrap();

    assert_eq!(config.primary.model, "claude-3-5-haiku-latest");
    let fallback = config.fallback.unwrap();
    assert_eq!(fallback.kind, ProviderKind::OpenAiCompatible);
    assert_eq!(fallback.model, OPENAI_MODEL);
    assert_eq!(fallback.url, "http://localhost:11434/v1/chat/completions");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    assert_eq!(config.attempt_timeout, Duration::from_secs(10));
    assert_eq!(
      config.knowledge_path,
      Some(PathBuf::from("/etc/runplan/knowledge.json"))
    );
  }

  #[test]
  #[serial]
  fn test_invalid_number() {
    let result = with_env(
      &[(API_KEY_VAR, "sk-test"), (MAX_ATTEMPTS_VAR, "three")],
      PlannerConfig::from_env,
    );
    assert!(matches!(result, Err(ConfigError::Invalid { name, .. }) if name == MAX_ATTEMPTS_VAR));
  }

  #[test]
  #[serial]
  fn test_zero_attempts_rejected() {
    let result = with_env(
      &[(API_KEY_VAR, "sk-test"), (MAX_ATTEMPTS_VAR, "0")],
      PlannerConfig::from_env,
    );
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
  }

  #[test]
  #[serial]
  fn test_invalid_url() {
    let result = with_env(
      &[(API_KEY_VAR, "sk-test"), (API_URL_VAR, "not a url")],
      PlannerConfig::from_env,
    );
    assert!(matches!(result, Err(ConfigError::Invalid { name, .. }) if name == API_URL_VAR));

    let result = with_env(
      &[(API_KEY_VAR, "sk-test"), (API_URL_VAR, "ftp://example.com/v1")],
      PlannerConfig::from_env,
    );
    assert!(result.is_err());
  }
}
