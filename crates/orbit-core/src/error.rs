//! Error types for `orbit-core`.

use thiserror::Error;

/// Backend errors are boxed so the pipeline can carry any store's failure as
/// the `source` of a core error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejection of a raw launch payload by the normalizer.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("mandatory field `{0}` is missing or null")]
  MissingField(&'static str),

  #[error("payload field has the wrong type: {0}")]
  WrongType(#[from] serde_json::Error),

  #[error("details mention a payload mass that is not an integer: {0:?}")]
  MalformedPayloadMass(String),

  #[error("launch date {0} is outside years 1..=9999")]
  LaunchDateOutOfRange(i64),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("fetching {url} failed: {source}")]
  Fetch {
    url:    String,
    #[source]
    source: BoxError,
  },

  #[error("launch payload rejected: {0}")]
  Validation(#[from] ValidationError),

  #[error("write to table {table} failed: {source}")]
  Write {
    table:  String,
    #[source]
    source: BoxError,
  },

  #[error("aggregation query over {table} failed: {source}")]
  Query {
    table:  String,
    #[source]
    source: BoxError,
  },

  #[error("invalid configuration: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
