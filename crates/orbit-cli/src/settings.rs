//! Run configuration, layered from an optional TOML file and `ORBIT_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `ORBIT_STORE__KIND=postgres`, `ORBIT_STORE__HOST=db.internal` or
//! `ORBIT_ENGINE__KIND=trino`.

use std::path::{Path, PathBuf};

use orbit_core::{TableName, pipeline::Tables};
use orbit_store_postgres::PostgresConfig;
use orbit_store_sqlite::SqliteConfig;
use orbit_trino::TrinoConfig;
use serde::Deserialize;

pub const DEFAULT_SOURCE_URL: &str = "https://api.spacexdata.com/v5/launches/latest";

#[derive(Debug, Clone, Deserialize)]
pub struct OrbitConfig {
  #[serde(default = "default_source_url")]
  pub source_url:      String,
  #[serde(default = "default_fact_table")]
  pub fact_table:      String,
  #[serde(default = "default_aggregate_table")]
  pub aggregate_table: String,
  #[serde(default = "default_store")]
  pub store:           StoreConfig,
  #[serde(default)]
  pub engine:          EngineConfig,
}

/// Where facts and aggregates are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
  Sqlite(SqliteConfig),
  Postgres(PostgresConfig),
}

/// Which backend runs the yearly aggregation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineConfig {
  /// A second, read-only connection to the store database.
  #[default]
  Store,
  /// Trino reading the store's tables through a PostgreSQL catalog.
  Trino(TrinoConfig),
}

fn default_source_url() -> String { DEFAULT_SOURCE_URL.to_string() }

fn default_fact_table() -> String { "spacex_launches".to_string() }

fn default_aggregate_table() -> String { "agg_spacex_launches".to_string() }

fn default_store() -> StoreConfig {
  StoreConfig::Sqlite(SqliteConfig { path: PathBuf::from("orbit.db") })
}

impl OrbitConfig {
  /// Validated table names; rejects anything that is not a plain SQL
  /// identifier.
  pub fn tables(&self) -> orbit_core::Result<Tables> {
    Ok(Tables {
      facts:      TableName::new(self.fact_table.as_str())?,
      aggregates: TableName::new(self.aggregate_table.as_str())?,
    })
  }

  /// Reject engine and store pairs where the engine cannot see the tables
  /// the store writes.
  pub fn validate(&self) -> Result<(), config::ConfigError> {
    match (&self.store, &self.engine) {
      (StoreConfig::Sqlite(_), EngineConfig::Trino(_)) => Err(config::ConfigError::Message(
        "engine `trino` needs a `postgres` store: Trino cannot read a SQLite file".to_string(),
      )),
      _ => Ok(()),
    }
  }
}

/// Load from `path` (skipped if absent) overlaid with the process
/// environment.
pub fn load(path: &Path) -> Result<OrbitConfig, config::ConfigError> {
  build(path, environment())
}

fn environment() -> config::Environment {
  config::Environment::with_prefix("ORBIT")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

fn build(path: &Path, env: config::Environment) -> Result<OrbitConfig, config::ConfigError> {
  let settings: OrbitConfig = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(env)
    .build()?
    .try_deserialize()?;
  settings.validate()?;
  Ok(settings)
}
