//! [`HttpSource`], which fetches the latest launch over HTTP.

use std::time::Duration;

use orbit_core::store::LaunchSource;
use reqwest::blocking::Client;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("source answered {0}")]
  Status(reqwest::StatusCode),

  #[error("response is not JSON: {0}")]
  Decode(#[from] serde_json::Error),
}

/// One blocking GET per fetch; no retries.
pub struct HttpSource {
  http: Client,
  url:  String,
}

impl HttpSource {
  pub fn new(url: impl Into<String>) -> Result<Self, SourceError> {
    let http = Client::builder()
      .user_agent(concat!("orbit/", env!("CARGO_PKG_VERSION")))
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { http, url: url.into() })
  }
}

impl LaunchSource for HttpSource {
  type Error = SourceError;

  fn url(&self) -> &str { &self.url }

  fn fetch_latest(&self) -> Result<Value, SourceError> {
    let resp = self.http.get(&self.url).send()?;
    if !resp.status().is_success() {
      return Err(SourceError::Status(resp.status()));
    }
    let body = resp.bytes()?;
    Ok(serde_json::from_slice(&body)?)
  }
}
