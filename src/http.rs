//! Minimal HTTP seam used by the generation client
//!
//! Providers only ever POST JSON, so the trait is a single method. The
//! reqwest implementation is the production one; tests script their own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub headers: HashMap<String, String>,
  pub timeout: Option<Duration>,
}

impl RequestOptions {
  pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_string(), value.into());
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Failures below the HTTP layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
  #[error("request timed out")]
  Timeout,

  /// Connection refused or reset, DNS failure
  #[error("connection failed: {0}")]
  Connection(String),

  #[error("request failed: {0}")]
  Other(String),
}

impl TransportError {
  pub fn is_retryable(&self) -> bool {
    matches!(self, TransportError::Timeout | TransportError::Connection(_))
  }
}

impl From<reqwest::Error> for TransportError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      TransportError::Timeout
    } else if e.is_connect() || e.is_request() || e.is_body() {
      // reqwest reports resets mid-request as request/body errors
      TransportError::Connection(e.to_string())
    } else {
      TransportError::Other(e.to_string())
    }
  }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
  async fn post(
    &self,
    url: &str,
    body: &Value,
    options: &RequestOptions,
  ) -> Result<HttpResponse, TransportError>;
}

/// ---------------------------------------------------------------------------
/// reqwest Implementation
/// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
  client: Client,
}

impl ReqwestHttpClient {
  pub fn new() -> Self {
    Self {
      client: Client::new(),
    }
  }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
  async fn post(
    &self,
    url: &str,
    body: &Value,
    options: &RequestOptions,
  ) -> Result<HttpResponse, TransportError> {
    let mut request = self.client.post(url).json(body);
    for (name, value) in &options.headers {
      request = request.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = options.timeout {
      request = request.timeout(timeout);
    }

    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;

    Ok(HttpResponse { status, body })
  }
}
