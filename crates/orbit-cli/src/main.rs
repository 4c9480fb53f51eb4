//! `orbit`: run the launch pipeline once.
//!
//! Reads `orbit.toml` (or the path given with `--config`) plus `ORBIT_*`
//! environment overrides, fetches the latest launch, appends it to the fact
//! table and re-derives the yearly aggregate table. Exits non-zero if any
//! stage fails.
//!
//! With `--aggregate-only` the fetch and append are skipped and only the
//! aggregate table is rebuilt, e.g. after a run that failed at aggregation.

mod settings;
mod source;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use orbit_core::{
  pipeline::{Pipeline, Tables},
  store::{AggregateStore, AggregationEngine, FactStore},
};
use orbit_store_postgres::PostgresStore;
use orbit_store_sqlite::SqliteStore;
use orbit_trino::TrinoClient;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  settings::{EngineConfig, OrbitConfig, StoreConfig},
  source::HttpSource,
};

#[derive(Parser)]
#[command(author, version, about = "SpaceX launch ingestion and yearly aggregation")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "orbit.toml")]
  config: PathBuf,

  /// Skip fetch and append; rebuild the aggregate table from stored facts.
  #[arg(long)]
  aggregate_only: bool,
}

fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = settings::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  let tables = cfg.tables().context("invalid table configuration")?;

  match (&cfg.store, &cfg.engine) {
    (StoreConfig::Sqlite(sqlite), EngineConfig::Store) => {
      let store = SqliteStore::open(sqlite)
        .with_context(|| format!("failed to open store at {:?}", sqlite.path))?;
      store
        .ensure_tables(&tables)
        .context("failed to create pipeline tables")?;
      let engine = SqliteStore::open_read_only(sqlite)
        .context("failed to open read-only aggregation connection")?;
      execute(&cli, &cfg, &store, &engine, tables)
    }
    (StoreConfig::Postgres(postgres), engine) => {
      let store = PostgresStore::connect(postgres).with_context(|| {
        format!("failed to connect to postgres at {}:{}", postgres.host, postgres.port)
      })?;
      store
        .ensure_tables(&tables)
        .context("failed to create pipeline tables")?;
      match engine {
        EngineConfig::Store => {
          let engine = PostgresStore::connect_read_only(postgres)
            .context("failed to open read-only aggregation connection")?;
          execute(&cli, &cfg, &store, &engine, tables)
        }
        EngineConfig::Trino(trino) => {
          tracing::info!(host = %trino.host, port = trino.port, catalog = %trino.catalog, "aggregating through trino");
          let engine = TrinoClient::new(trino.clone()).context("failed to build trino client")?;
          execute(&cli, &cfg, &store, &engine, tables)
        }
      }
    }
    // `settings::load` already refuses this pairing.
    (StoreConfig::Sqlite(_), EngineConfig::Trino(_)) => {
      anyhow::bail!("engine `trino` needs a `postgres` store")
    }
  }
}

fn execute<S, E>(
  cli:    &Cli,
  cfg:    &OrbitConfig,
  store:  &S,
  engine: &E,
  tables: Tables,
) -> anyhow::Result<()>
where
  S: FactStore + AggregateStore,
  E: AggregationEngine,
{
  let source = HttpSource::new(cfg.source_url.as_str()).context("failed to build HTTP client")?;
  let pipeline = Pipeline::new(&source, store, engine, store, tables);

  if cli.aggregate_only {
    let rows = pipeline.reaggregate()?;
    tracing::info!(years = rows.len(), table = %pipeline.tables().aggregates, "aggregate table rebuilt");
    return Ok(());
  }

  let report = pipeline.run()?;
  for row in &report.aggregates {
    tracing::info!(
      year = row.aggregation_year,
      launches = row.total_launches,
      successful = row.total_successful_launches,
      average_payload_mass = row.average_payload_mass,
      average_delay_hours = row.average_delay_hours,
      "yearly aggregate"
    );
  }
  println!("{}", report.launch_id);
  Ok(())
}
