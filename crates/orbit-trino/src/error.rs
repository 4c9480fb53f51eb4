//! Error type for `orbit-trino`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("coordinator answered {status} for {uri}")]
  Status { status: u16, uri: String },

  #[error("query failed ({name}): {message}")]
  Query { name: String, message: String },

  #[error("unexpected query result: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
