//! Capability traits for the pipeline's collaborators.
//!
//! Each trait is implemented by one or more backends: the relational store
//! (`orbit-store-sqlite`), the federated query engine (`orbit-trino`) and the
//! in-memory store in [`crate::memory`]. The pipeline depends on these
//! abstractions only, never on a concrete backend.
//!
//! All methods block the calling thread until the backend answers.

use crate::{aggregate::YearlyAggregate, launch::LaunchFact, table::TableName};

/// Where the raw "latest launch" object comes from.
pub trait LaunchSource {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Location reported in fetch errors.
  fn url(&self) -> &str;

  /// Fetch the latest launch as an untyped JSON value.
  fn fetch_latest(&self) -> Result<serde_json::Value, Self::Error>;
}

/// Append-only writer for the fact table.
pub trait FactStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert exactly one row. Fails (without applying anything) if a row with
  /// the same `id` already exists. Existing rows are never touched.
  fn append(&self, table: &TableName, fact: &LaunchFact) -> Result<(), Self::Error>;
}

/// Read-only analytical query over the fact table.
pub trait AggregationEngine {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Group the fact table by UTC year of `launch_date_unix`, skipping rows
  /// without a launch date. Rows come back ascending by year; an empty fact
  /// table yields an empty vector.
  fn aggregate(&self, fact_table: &TableName) -> Result<Vec<YearlyAggregate>, Self::Error>;
}

/// Writer for the derived aggregate table.
pub trait AggregateStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert-or-overwrite every row keyed on
  /// [`AGGREGATE_KEY`](crate::aggregate::AGGREGATE_KEY), as one atomic batch:
  /// either every row is applied or none is.
  fn upsert_all(&self, table: &TableName, rows: &[YearlyAggregate]) -> Result<(), Self::Error>;
}
