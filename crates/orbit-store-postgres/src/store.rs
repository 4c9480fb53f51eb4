//! [`PostgresStore`], the PostgreSQL implementation of the Orbit store traits.

use std::{
  sync::{Mutex, MutexGuard},
  time::Duration,
};

use orbit_core::{
  TableName,
  aggregate::YearlyAggregate,
  launch::LaunchFact,
  pipeline::Tables,
  store::{AggregateStore, AggregationEngine, FactStore},
};
use postgres::{Client, NoTls, Row, error::SqlState};
use serde::Deserialize;

use crate::{Error, Result, schema};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection parameters, passed through to the driver untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
  #[serde(default = "default_host")]
  pub host:     String,
  #[serde(default = "default_port")]
  pub port:     u16,
  #[serde(default = "default_database")]
  pub database: String,
  #[serde(default = "default_user")]
  pub user:     String,
  #[serde(default)]
  pub password: Option<String>,
}

fn default_host() -> String { "localhost".to_string() }

fn default_port() -> u16 { 5432 }

fn default_database() -> String { "sampledb".to_string() }

fn default_user() -> String { "trino".to_string() }

impl Default for PostgresConfig {
  fn default() -> Self {
    Self {
      host:     default_host(),
      port:     default_port(),
      database: default_database(),
      user:     default_user(),
      password: None,
    }
  }
}

impl PostgresConfig {
  fn driver_config(&self) -> postgres::Config {
    let mut config = postgres::Config::new();
    config
      .host(&self.host)
      .port(self.port)
      .dbname(&self.database)
      .user(&self.user)
      .application_name("orbit")
      .connect_timeout(Duration::from_secs(30));
    if let Some(password) = &self.password {
      config.password(password);
    }
    config
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Fact store, aggregation engine and aggregate store over one PostgreSQL
/// session. The session is closed when the store is dropped.
pub struct PostgresStore {
  client: Mutex<Client>,
}

impl PostgresStore {
  pub fn connect(config: &PostgresConfig) -> Result<Self> {
    tracing::debug!(host = %config.host, port = config.port, database = %config.database, "connecting to postgres");
    Ok(Self::from_client(config.driver_config().connect(NoTls)?))
  }

  /// Open a second session whose transactions are all read-only, for use as
  /// a stand-alone aggregation engine.
  pub fn connect_read_only(config: &PostgresConfig) -> Result<Self> {
    let mut client = config.driver_config().connect(NoTls)?;
    client.batch_execute(schema::READ_ONLY_SESSION)?;
    Ok(Self::from_client(client))
  }

  pub(crate) fn from_client(client: Client) -> Self { Self { client: Mutex::new(client) } }

  pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Client>> {
    self.client.lock().map_err(|_| Error::Poisoned)
  }

  /// Create the fact and aggregate tables if they do not exist yet.
  pub fn ensure_tables(&self, tables: &Tables) -> Result<()> {
    let mut client = self.lock()?;
    client.batch_execute(&schema::create_fact_table(&tables.facts))?;
    client.batch_execute(&schema::create_aggregate_table(&tables.aggregates))?;
    Ok(())
  }

  /// All rows of a fact table, ordered by id.
  pub fn facts(&self, table: &TableName) -> Result<Vec<LaunchFact>> {
    let mut client = self.lock()?;
    let rows = client.query(schema::select_facts(table).as_str(), &[])?;
    Ok(rows.iter().map(fact_from_row).collect::<Result<_, _>>()?)
  }

  /// All rows of an aggregate table, ordered by year.
  pub fn aggregates(&self, table: &TableName) -> Result<Vec<YearlyAggregate>> {
    let mut client = self.lock()?;
    let rows = client.query(schema::select_aggregates(table).as_str(), &[])?;
    Ok(rows.iter().map(aggregate_from_row).collect::<Result<_, _>>()?)
  }
}

fn fact_from_row(row: &Row) -> Result<LaunchFact, postgres::Error> {
  Ok(LaunchFact {
    id:                     row.try_get(0)?,
    name:                   row.try_get(1)?,
    launch_date_unix:       row.try_get(2)?,
    success:                row.try_get(3)?,
    payload_mass:           row.try_get(4)?,
    details:                row.try_get(5)?,
    engine_start_time_unix: row.try_get(6)?,
    launch_delay_hours:     row.try_get(7)?,
  })
}

fn aggregate_from_row(row: &Row) -> Result<YearlyAggregate, postgres::Error> {
  Ok(YearlyAggregate {
    aggregation_year:          row.try_get(0)?,
    total_launches:            row.try_get(1)?,
    total_successful_launches: row.try_get(2)?,
    average_payload_mass:      row.try_get(3)?,
    average_delay_hours:       row.try_get(4)?,
  })
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl FactStore for PostgresStore {
  type Error = Error;

  fn append(&self, table: &TableName, fact: &LaunchFact) -> Result<()> {
    let mut client = self.lock()?;
    // Dropping `tx` without committing rolls the insert back.
    let mut tx = client.transaction()?;

    tx.execute(schema::insert_fact(table).as_str(), &[
      &fact.id,
      &fact.name,
      &fact.launch_date_unix,
      &fact.success,
      &fact.payload_mass,
      &fact.details,
      &fact.engine_start_time_unix,
      &fact.launch_delay_hours,
    ])
    .map_err(|e| {
      let code = e.code().cloned();
      if code == Some(SqlState::UNIQUE_VIOLATION) {
        Error::DuplicateId { table: table.to_string(), id: fact.id.clone() }
      } else if code == Some(SqlState::CHECK_VIOLATION) {
        Error::RejectedFact { table: table.to_string(), id: fact.id.clone(), source: e }
      } else {
        Error::Database(e)
      }
    })?;

    tx.commit()?;
    Ok(())
  }
}

impl AggregationEngine for PostgresStore {
  type Error = Error;

  fn aggregate(&self, fact_table: &TableName) -> Result<Vec<YearlyAggregate>> {
    let mut client = self.lock()?;
    let rows = client.query(schema::aggregate_by_year(fact_table).as_str(), &[])?;
    Ok(rows.iter().map(aggregate_from_row).collect::<Result<_, _>>()?)
  }
}

impl AggregateStore for PostgresStore {
  type Error = Error;

  fn upsert_all(&self, table: &TableName, rows: &[YearlyAggregate]) -> Result<()> {
    if rows.is_empty() {
      return Ok(());
    }

    let mut client = self.lock()?;
    // Dropping `tx` without committing rolls the whole batch back.
    let mut tx = client.transaction()?;
    let stmt = tx.prepare(&schema::upsert_aggregate(table))?;
    for row in rows {
      tx.execute(&stmt, &[
        &row.aggregation_year,
        &row.total_launches,
        &row.total_successful_launches,
        &row.average_payload_mass,
        &row.average_delay_hours,
      ])
      .map_err(|source| Error::RejectedRow { year: row.aggregation_year, source })?;
    }
    tx.commit()?;
    Ok(())
  }
}
