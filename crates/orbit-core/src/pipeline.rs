//! The run-once pipeline: `FETCH → NORMALIZE → APPEND → AGGREGATE → UPSERT`.
//!
//! Stages run strictly in order on the calling thread. The first failing
//! stage ends the run with a [`StageError`] naming that stage; later stages
//! are never attempted and nothing already committed is undone. In
//! particular a failed aggregation leaves the appended fact in place, and
//! [`Pipeline::reaggregate`] can be run later to catch the aggregate table
//! up without fetching again.

use std::fmt;

use crate::{
  Error,
  aggregate::YearlyAggregate,
  launch::{RawLaunch, normalize},
  store::{AggregateStore, AggregationEngine, FactStore, LaunchSource},
  table::TableName,
};

// ─── Stages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  Fetch,
  Normalize,
  Append,
  Aggregate,
  Upsert,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::Fetch => "fetch",
      Stage::Normalize => "normalize",
      Stage::Append => "append",
      Stage::Aggregate => "aggregate",
      Stage::Upsert => "upsert",
    })
  }
}

/// A run that ended in the `FAILED` state.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
  pub stage:  Stage,
  #[source]
  pub source: Error,
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
  pub launch_id:  String,
  pub aggregates: Vec<YearlyAggregate>,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Target tables of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
  pub facts:      TableName,
  pub aggregates: TableName,
}

/// Wires a source and three store capabilities together for one run.
///
/// The same backend may fill several roles (the SQLite store is fact store,
/// aggregation engine and aggregate store at once).
pub struct Pipeline<'a, S, F, E, A> {
  source:     &'a S,
  facts:      &'a F,
  engine:     &'a E,
  aggregates: &'a A,
  tables:     Tables,
}

impl<'a, S, F, E, A> Pipeline<'a, S, F, E, A>
where
  S: LaunchSource,
  F: FactStore,
  E: AggregationEngine,
  A: AggregateStore,
{
  pub fn new(
    source:     &'a S,
    facts:      &'a F,
    engine:     &'a E,
    aggregates: &'a A,
    tables:     Tables,
  ) -> Self {
    Self { source, facts, engine, aggregates, tables }
  }

  pub fn tables(&self) -> &Tables { &self.tables }

  /// Run every stage once, end to end.
  pub fn run(&self) -> Result<RunReport, StageError> {
    tracing::info!(stage = %Stage::Fetch, url = self.source.url(), "fetching latest launch");
    let payload = self.source.fetch_latest().map_err(|e| StageError {
      stage:  Stage::Fetch,
      source: Error::Fetch { url: self.source.url().to_owned(), source: Box::new(e) },
    })?;

    tracing::info!(stage = %Stage::Normalize, "validating launch payload");
    let fact = RawLaunch::from_json(payload)
      .and_then(normalize)
      .map_err(|e| StageError { stage: Stage::Normalize, source: e.into() })?;

    tracing::info!(
      stage = %Stage::Append,
      table = %self.tables.facts,
      launch_id = %fact.id,
      payload_mass = fact.payload_mass,
      launch_delay_hours = fact.launch_delay_hours,
      "appending launch fact"
    );
    self.facts.append(&self.tables.facts, &fact).map_err(|e| StageError {
      stage:  Stage::Append,
      source: Error::Write { table: self.tables.facts.to_string(), source: Box::new(e) },
    })?;

    let aggregates = self.reaggregate()?;
    tracing::info!(launch_id = %fact.id, years = aggregates.len(), "pipeline run complete");

    Ok(RunReport { launch_id: fact.id, aggregates })
  }

  /// Recompute the aggregate table from the fact table as it stands now
  /// (`AGGREGATE → UPSERT`). Running it twice on an unchanged fact table
  /// leaves the aggregate table unchanged.
  pub fn reaggregate(&self) -> Result<Vec<YearlyAggregate>, StageError> {
    tracing::info!(stage = %Stage::Aggregate, table = %self.tables.facts, "aggregating facts by year");
    let rows = self.engine.aggregate(&self.tables.facts).map_err(|e| StageError {
      stage:  Stage::Aggregate,
      source: Error::Query { table: self.tables.facts.to_string(), source: Box::new(e) },
    })?;

    tracing::info!(
      stage = %Stage::Upsert,
      table = %self.tables.aggregates,
      rows = rows.len(),
      "upserting yearly aggregates"
    );
    self
      .aggregates
      .upsert_all(&self.tables.aggregates, &rows)
      .map_err(|e| StageError {
        stage:  Stage::Upsert,
        source: Error::Write { table: self.tables.aggregates.to_string(), source: Box::new(e) },
      })?;

    Ok(rows)
  }
}
