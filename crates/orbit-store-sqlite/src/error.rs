//! Error type for `orbit-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("launch {id:?} is already recorded in {table}")]
  DuplicateId { table: String, id: String },

  /// The fact breaks a CHECK constraint of the fact table.
  #[error("launch {id:?} rejected by {table}: {source}")]
  RejectedFact {
    table:  String,
    id:     String,
    #[source]
    source: rusqlite::Error,
  },

  /// One row of an upsert batch was refused; the whole batch was rolled back.
  #[error("aggregate row for {year} rejected, batch rolled back: {source}")]
  RejectedRow {
    year:   i32,
    #[source]
    source: rusqlite::Error,
  },

  #[error("connection lock poisoned")]
  Poisoned,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
