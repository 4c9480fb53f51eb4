//! [`SqliteStore`], the SQLite implementation of the Orbit store traits.

use std::{
  path::PathBuf,
  sync::{Mutex, MutexGuard},
};

use orbit_core::{
  TableName,
  aggregate::YearlyAggregate,
  launch::LaunchFact,
  pipeline::Tables,
  store::{AggregateStore, AggregationEngine, FactStore},
};
use rusqlite::{Connection, ErrorCode, OpenFlags, Row, params};
use serde::Deserialize;

use crate::{Error, Result, schema};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection parameters for the relational backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
  /// Database file; created on first open.
  pub path: PathBuf,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Fact store, aggregation engine and aggregate store over one SQLite
/// connection. The connection is closed when the store is dropped.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the database described by `config`.
  pub fn open(config: &SqliteConfig) -> Result<Self> {
    let conn = Connection::open(&config.path)?;
    conn.execute_batch(schema::PRAGMAS)?;
    Ok(Self::from_connection(conn))
  }

  /// Open an existing database without write access, for use as a
  /// stand-alone aggregation engine.
  pub fn open_read_only(config: &SqliteConfig) -> Result<Self> {
    let conn = Connection::open_with_flags(
      &config.path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(Self::from_connection(conn))
  }

  /// Open an in-memory store, mostly for tests.
  pub fn open_in_memory() -> Result<Self> {
    Ok(Self::from_connection(Connection::open_in_memory()?))
  }

  fn from_connection(conn: Connection) -> Self { Self { conn: Mutex::new(conn) } }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| Error::Poisoned)
  }

  /// Create the fact and aggregate tables if they do not exist yet.
  pub fn ensure_tables(&self, tables: &Tables) -> Result<()> {
    let conn = self.lock()?;
    conn.execute_batch(&schema::create_fact_table(&tables.facts))?;
    conn.execute_batch(&schema::create_aggregate_table(&tables.aggregates))?;
    Ok(())
  }

  /// All rows of a fact table, ordered by id.
  pub fn facts(&self, table: &TableName) -> Result<Vec<LaunchFact>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(&schema::select_facts(table))?;
    let rows = stmt
      .query_map([], fact_from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  /// All rows of an aggregate table, ordered by year.
  pub fn aggregates(&self, table: &TableName) -> Result<Vec<YearlyAggregate>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(&schema::select_aggregates(table))?;
    let rows = stmt
      .query_map([], aggregate_from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }
}

fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<LaunchFact> {
  Ok(LaunchFact {
    id:                     row.get(0)?,
    name:                   row.get(1)?,
    launch_date_unix:       row.get(2)?,
    success:                row.get(3)?,
    payload_mass:           row.get(4)?,
    details:                row.get(5)?,
    engine_start_time_unix: row.get(6)?,
    launch_delay_hours:     row.get(7)?,
  })
}

fn aggregate_from_row(row: &Row<'_>) -> rusqlite::Result<YearlyAggregate> {
  Ok(YearlyAggregate {
    aggregation_year:          row.get(0)?,
    total_launches:            row.get(1)?,
    total_successful_launches: row.get(2)?,
    average_payload_mass:      row.get(3)?,
    average_delay_hours:       row.get(4)?,
  })
}

fn constraint_violated(err: &rusqlite::Error, extended_code: std::ffi::c_int) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == ErrorCode::ConstraintViolation && e.extended_code == extended_code
  )
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = Error;

  fn append(&self, table: &TableName, fact: &LaunchFact) -> Result<()> {
    let mut conn = self.lock()?;
    // Dropping `tx` without committing rolls the insert back.
    let tx = conn.transaction()?;

    tx.execute(
      &schema::insert_fact(table),
      params![
        fact.id,
        fact.name,
        fact.launch_date_unix,
        fact.success,
        fact.payload_mass,
        fact.details,
        fact.engine_start_time_unix,
        fact.launch_delay_hours,
      ],
    )
    .map_err(|e| {
      if constraint_violated(&e, rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) {
        Error::DuplicateId { table: table.to_string(), id: fact.id.clone() }
      } else if constraint_violated(&e, rusqlite::ffi::SQLITE_CONSTRAINT_CHECK) {
        Error::RejectedFact { table: table.to_string(), id: fact.id.clone(), source: e }
      } else {
        Error::Database(e)
      }
    })?;

    tx.commit()?;
    Ok(())
  }
}

impl AggregationEngine for SqliteStore {
  type Error = Error;

  fn aggregate(&self, fact_table: &TableName) -> Result<Vec<YearlyAggregate>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(&schema::aggregate_by_year(fact_table))?;
    let rows = stmt
      .query_map([], aggregate_from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }
}

impl AggregateStore for SqliteStore {
  type Error = Error;

  fn upsert_all(&self, table: &TableName, rows: &[YearlyAggregate]) -> Result<()> {
    if rows.is_empty() {
      return Ok(());
    }

    let mut conn = self.lock()?;
    // Dropping `tx` without committing rolls the whole batch back.
    let tx = conn.transaction()?;
    {
      let mut stmt = tx.prepare_cached(&schema::upsert_aggregate(table))?;
      for row in rows {
        stmt
          .execute(params![
            row.aggregation_year,
            row.total_launches,
            row.total_successful_launches,
            row.average_payload_mass,
            row.average_delay_hours,
          ])
          .map_err(|source| Error::RejectedRow { year: row.aggregation_year, source })?;
      }
    }
    tx.commit()?;
    Ok(())
  }
}
