//! SQL text for the fact and aggregate tables.
//!
//! Table names are caller-chosen, so every statement is rendered from a
//! validated [`TableName`]. DDL is idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`.

use orbit_core::{
  TableName,
  aggregate::{AGGREGATE_COLUMNS, AGGREGATE_KEY},
  launch::{FACT_COLUMNS, LAUNCH_DATE_RANGE},
};

pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
";

/// Facts are strictly append-only: no UPDATE or DELETE is ever issued
/// against this table.
/// `launch_date_unix` is bounded so `strftime('%Y', ...)` always yields a year.
pub fn create_fact_table(table: &TableName) -> String {
  let (first, last) = (LAUNCH_DATE_RANGE.start(), LAUNCH_DATE_RANGE.end());
  format!(
    "CREATE TABLE IF NOT EXISTS {table} (
        id                     TEXT    PRIMARY KEY NOT NULL,
        name                   TEXT,
        launch_date_unix       INTEGER CHECK (launch_date_unix BETWEEN {first} AND {last}),
        success                INTEGER NOT NULL CHECK (success IN (0, 1)),
        payload_mass           INTEGER NOT NULL DEFAULT 0 CHECK (payload_mass >= 0),
        details                TEXT,
        engine_start_time_unix INTEGER,
        launch_delay_hours     INTEGER NOT NULL DEFAULT 0 CHECK (launch_delay_hours >= 0)
    );
    CREATE INDEX IF NOT EXISTS {table}_launch_date_idx ON {table}(launch_date_unix);"
  )
}

/// The aggregate table is fully derived from the fact table; rows are only
/// ever inserted or overwritten.
pub fn create_aggregate_table(table: &TableName) -> String {
  format!(
    "CREATE TABLE IF NOT EXISTS {table} (
        aggregation_year          INTEGER PRIMARY KEY NOT NULL,
        total_launches            INTEGER NOT NULL CHECK (total_launches >= 0),
        total_successful_launches INTEGER NOT NULL,
        average_payload_mass      REAL    NOT NULL,
        average_delay_hours       REAL    NOT NULL CHECK (average_delay_hours >= 0),
        CHECK (total_successful_launches BETWEEN 0 AND total_launches)
    );"
  )
}

pub fn insert_fact(table: &TableName) -> String {
  let placeholders: Vec<String> = (1..=FACT_COLUMNS.len()).map(|i| format!("?{i}")).collect();
  format!(
    "INSERT INTO {table} ({}) VALUES ({})",
    FACT_COLUMNS.join(", "),
    placeholders.join(", ")
  )
}

pub fn select_facts(table: &TableName) -> String {
  format!("SELECT {} FROM {table} ORDER BY id", FACT_COLUMNS.join(", "))
}

/// `INSERT … ON CONFLICT (aggregation_year) DO UPDATE SET` every non-key
/// column to the incoming value.
pub fn upsert_aggregate(table: &TableName) -> String {
  let placeholders: Vec<String> =
    (1..=AGGREGATE_COLUMNS.len()).map(|i| format!("?{i}")).collect();
  let assignments: Vec<String> = AGGREGATE_COLUMNS
    .iter()
    .filter(|col| **col != AGGREGATE_KEY)
    .map(|col| format!("{col} = excluded.{col}"))
    .collect();

  format!(
    "INSERT INTO {table} ({}) VALUES ({})
     ON CONFLICT ({AGGREGATE_KEY}) DO UPDATE SET {}",
    AGGREGATE_COLUMNS.join(", "),
    placeholders.join(", "),
    assignments.join(", ")
  )
}

pub fn select_aggregates(table: &TableName) -> String {
  format!(
    "SELECT {} FROM {table} ORDER BY {AGGREGATE_KEY}",
    AGGREGATE_COLUMNS.join(", ")
  )
}

/// Yearly metrics over the stored columns. `launch_delay_hours` is read as
/// persisted, never recomputed from the timestamps.
pub fn aggregate_by_year(fact_table: &TableName) -> String {
  format!(
    "SELECT
        CAST(strftime('%Y', launch_date_unix, 'unixepoch') AS INTEGER) AS aggregation_year,
        COUNT(id)                                                      AS total_launches,
        COUNT(CASE WHEN success = 1 THEN id END)                       AS total_successful_launches,
        AVG(payload_mass)                                              AS average_payload_mass,
        AVG(launch_delay_hours)                                        AS average_delay_hours
     FROM {fact_table}
     WHERE launch_date_unix IS NOT NULL
     GROUP BY aggregation_year
     ORDER BY aggregation_year"
  )
}
