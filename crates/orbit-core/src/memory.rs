//! [`MemoryStore`], an in-process backend implementing every store trait.
//!
//! Used to exercise the normalizer and pipeline without a database. It keeps
//! the same contracts as the relational backend: duplicate ids and facts
//! breaking a table constraint are rejected, aggregation skips rows without a
//! launch date, and upserts are validated in full before any row is applied.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Datelike as _};
use thiserror::Error;

use crate::{
  aggregate::YearlyAggregate,
  launch::LaunchFact,
  store::{AggregateStore, AggregationEngine, FactStore},
  table::TableName,
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("duplicate id {id:?} in {table}")]
  DuplicateId { table: TableName, id: String },

  #[error("launch {id:?} rejected: {reason}")]
  RejectedFact { id: String, reason: &'static str },

  #[error("row for {year} rejected: {reason}")]
  RejectedRow { year: i32, reason: &'static str },

  #[error("launch date {0} is outside the representable range")]
  TimestampOutOfRange(i64),

  #[error("store lock poisoned")]
  Poisoned,
}

type FactTables = HashMap<TableName, BTreeMap<String, LaunchFact>>;
type AggregateTables = HashMap<TableName, BTreeMap<i32, YearlyAggregate>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
  facts:      Mutex<FactTables>,
  aggregates: Mutex<AggregateTables>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Snapshot of a fact table, ordered by id.
  pub fn facts(&self, table: &TableName) -> Result<Vec<LaunchFact>, MemoryError> {
    let tables = lock(&self.facts)?;
    Ok(tables.get(table).map(|t| t.values().cloned().collect()).unwrap_or_default())
  }

  /// Snapshot of an aggregate table, ordered by year.
  pub fn aggregates(&self, table: &TableName) -> Result<Vec<YearlyAggregate>, MemoryError> {
    let tables = lock(&self.aggregates)?;
    Ok(tables.get(table).map(|t| t.values().cloned().collect()).unwrap_or_default())
  }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, MemoryError> {
  m.lock().map_err(|_| MemoryError::Poisoned)
}

impl FactStore for MemoryStore {
  type Error = MemoryError;

  fn append(&self, table: &TableName, fact: &LaunchFact) -> Result<(), MemoryError> {
    if let Some(reason) = fact.violation() {
      return Err(MemoryError::RejectedFact { id: fact.id.clone(), reason });
    }

    let mut tables = lock(&self.facts)?;
    let rows = tables.entry(table.clone()).or_default();
    if rows.contains_key(&fact.id) {
      return Err(MemoryError::DuplicateId { table: table.clone(), id: fact.id.clone() });
    }
    rows.insert(fact.id.clone(), fact.clone());
    Ok(())
  }
}

/// Sums are kept in `i128` so no number of `i64` masses can overflow them.
#[derive(Default)]
struct YearTotals {
  launches:     i64,
  successful:   i64,
  payload_mass: i128,
  delay_hours:  i128,
}

impl AggregationEngine for MemoryStore {
  type Error = MemoryError;

  fn aggregate(&self, fact_table: &TableName) -> Result<Vec<YearlyAggregate>, MemoryError> {
    let tables = lock(&self.facts)?;
    let Some(rows) = tables.get(fact_table) else {
      return Ok(Vec::new());
    };

    let mut years: BTreeMap<i32, YearTotals> = BTreeMap::new();
    for fact in rows.values() {
      let Some(launch) = fact.launch_date_unix else { continue };
      let year = DateTime::from_timestamp(launch, 0)
        .ok_or(MemoryError::TimestampOutOfRange(launch))?
        .year();

      let totals = years.entry(year).or_default();
      totals.launches += 1;
      totals.successful += i64::from(fact.success);
      totals.payload_mass += i128::from(fact.payload_mass);
      totals.delay_hours += i128::from(fact.launch_delay_hours);
    }

    Ok(
      years
        .into_iter()
        .map(|(year, t)| YearlyAggregate {
          aggregation_year:          year,
          total_launches:            t.launches,
          total_successful_launches: t.successful,
          average_payload_mass:      t.payload_mass as f64 / t.launches as f64,
          average_delay_hours:       t.delay_hours as f64 / t.launches as f64,
        })
        .collect(),
    )
  }
}

impl AggregateStore for MemoryStore {
  type Error = MemoryError;

  fn upsert_all(&self, table: &TableName, rows: &[YearlyAggregate]) -> Result<(), MemoryError> {
    // Validate the whole batch first so a bad row leaves the table untouched.
    if let Some((row, reason)) = rows
      .iter()
      .find_map(|r| r.violation().map(|reason| (r, reason)))
    {
      return Err(MemoryError::RejectedRow { year: row.aggregation_year, reason });
    }

    let mut tables = lock(&self.aggregates)?;
    let target = tables.entry(table.clone()).or_default();
    for row in rows {
      target.insert(row.aggregation_year, row.clone());
    }
    Ok(())
  }
}
