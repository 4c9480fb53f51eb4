//! Per-year aggregate rows, derived wholesale from the fact table.

use serde::{Deserialize, Serialize};

/// Primary key of the aggregate table; upserts resolve conflicts on it.
pub const AGGREGATE_KEY: &str = "aggregation_year";

/// Aggregate table columns, key first.
pub const AGGREGATE_COLUMNS: [&str; 5] = [
  AGGREGATE_KEY,
  "total_launches",
  "total_successful_launches",
  "average_payload_mass",
  "average_delay_hours",
];

/// Launch metrics for one calendar year (UTC) of `launch_date_unix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyAggregate {
  pub aggregation_year:          i32,
  pub total_launches:            i64,
  pub total_successful_launches: i64,
  /// Mean over every launch in the year, failed ones included.
  pub average_payload_mass:      f64,
  pub average_delay_hours:       f64,
}

impl YearlyAggregate {
  /// The first table constraint this row breaks, if any.
  ///
  /// Mirrors the CHECK constraints of the relational aggregate table so that
  /// every backend rejects the same rows.
  pub fn violation(&self) -> Option<&'static str> {
    if self.total_launches < 0 {
      Some("total_launches must not be negative")
    } else if self.total_successful_launches < 0
      || self.total_successful_launches > self.total_launches
    {
      Some("total_successful_launches must be within 0..=total_launches")
    } else if self.average_delay_hours.is_nan() || self.average_delay_hours < 0.0 {
      Some("average_delay_hours must not be negative")
    } else {
      None
    }
  }
}
