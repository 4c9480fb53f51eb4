//! SQL text for the fact and aggregate tables, PostgreSQL dialect.
//!
//! Column types are chosen so Trino's `postgresql` connector maps them onto
//! `bigint`, `boolean`, `integer` and `double`, which is what the federated
//! aggregation query expects.

use orbit_core::{
  TableName,
  aggregate::{AGGREGATE_COLUMNS, AGGREGATE_KEY},
  launch::{FACT_COLUMNS, LAUNCH_DATE_RANGE},
};

pub const READ_ONLY_SESSION: &str = "SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY";

pub fn create_fact_table(table: &TableName) -> String {
  let (first, last) = (LAUNCH_DATE_RANGE.start(), LAUNCH_DATE_RANGE.end());
  format!(
    "CREATE TABLE IF NOT EXISTS {table} (
        id                     TEXT    PRIMARY KEY,
        name                   TEXT,
        launch_date_unix       BIGINT  CHECK (launch_date_unix BETWEEN {first} AND {last}),
        success                BOOLEAN NOT NULL,
        payload_mass           BIGINT  NOT NULL DEFAULT 0 CHECK (payload_mass >= 0),
        details                TEXT,
        engine_start_time_unix BIGINT,
        launch_delay_hours     BIGINT  NOT NULL DEFAULT 0 CHECK (launch_delay_hours >= 0)
    );
    CREATE INDEX IF NOT EXISTS {table}_launch_date_idx ON {table} (launch_date_unix);"
  )
}

pub fn create_aggregate_table(table: &TableName) -> String {
  format!(
    "CREATE TABLE IF NOT EXISTS {table} (
        aggregation_year          INTEGER          PRIMARY KEY,
        total_launches            BIGINT           NOT NULL CHECK (total_launches >= 0),
        total_successful_launches BIGINT           NOT NULL,
        average_payload_mass      DOUBLE PRECISION NOT NULL,
        average_delay_hours       DOUBLE PRECISION NOT NULL CHECK (average_delay_hours >= 0),
        CHECK (total_successful_launches BETWEEN 0 AND total_launches)
    );"
  )
}

fn placeholders(count: usize) -> String {
  (1..=count).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ")
}

pub fn insert_fact(table: &TableName) -> String {
  format!(
    "INSERT INTO {table} ({}) VALUES ({})",
    FACT_COLUMNS.join(", "),
    placeholders(FACT_COLUMNS.len())
  )
}

pub fn select_facts(table: &TableName) -> String {
  format!("SELECT {} FROM {table} ORDER BY id", FACT_COLUMNS.join(", "))
}

/// `INSERT … ON CONFLICT (aggregation_year) DO UPDATE SET col = EXCLUDED.col`
/// for every non-key column.
pub fn upsert_aggregate(table: &TableName) -> String {
  let assignments: Vec<String> = AGGREGATE_COLUMNS
    .iter()
    .filter(|col| **col != AGGREGATE_KEY)
    .map(|col| format!("{col} = EXCLUDED.{col}"))
    .collect();

  format!(
    "INSERT INTO {table} ({}) VALUES ({})
     ON CONFLICT ({AGGREGATE_KEY}) DO UPDATE SET {}",
    AGGREGATE_COLUMNS.join(", "),
    placeholders(AGGREGATE_COLUMNS.len()),
    assignments.join(", ")
  )
}

pub fn select_aggregates(table: &TableName) -> String {
  format!(
    "SELECT {} FROM {table} ORDER BY {AGGREGATE_KEY}",
    AGGREGATE_COLUMNS.join(", ")
  )
}

/// Same grouping as the Trino and SQLite engines. `AVG` over `BIGINT` is
/// `NUMERIC` in PostgreSQL, hence the casts.
pub fn aggregate_by_year(fact_table: &TableName) -> String {
  format!(
    "SELECT
        CAST(EXTRACT(YEAR FROM to_timestamp(launch_date_unix) AT TIME ZONE 'UTC') AS INTEGER)
                                                          AS aggregation_year,
        COUNT(id)                                         AS total_launches,
        COUNT(CASE WHEN success THEN id END)              AS total_successful_launches,
        CAST(AVG(payload_mass) AS DOUBLE PRECISION)       AS average_payload_mass,
        CAST(AVG(launch_delay_hours) AS DOUBLE PRECISION) AS average_delay_hours
     FROM {fact_table}
     WHERE launch_date_unix IS NOT NULL
     GROUP BY 1
     ORDER BY 1"
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn name(n: &str) -> TableName { TableName::new(n).unwrap() }

  #[test]
  fn insert_uses_numbered_placeholders() {
    let sql = insert_fact(&name("spacex_launches"));
    assert!(sql.starts_with("INSERT INTO spacex_launches (id, name, launch_date_unix"));
    assert!(sql.ends_with("VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"));
  }

  #[test]
  fn upsert_overwrites_every_non_key_column() {
    let sql = upsert_aggregate(&name("agg_spacex_launches"));
    assert!(sql.contains("VALUES ($1, $2, $3, $4, $5)"));
    assert!(sql.contains("ON CONFLICT (aggregation_year) DO UPDATE SET"));
    for col in &AGGREGATE_COLUMNS[1..] {
      assert!(sql.contains(&format!("{col} = EXCLUDED.{col}")), "{col} missing: {sql}");
    }
    assert!(!sql.contains("aggregation_year = EXCLUDED"));
  }

  #[test]
  fn fact_table_matches_the_shared_constraints() {
    let sql = create_fact_table(&name("spacex_launches"));
    assert!(sql.contains("success                BOOLEAN NOT NULL"));
    assert!(sql.contains("CHECK (launch_date_unix BETWEEN -62135596800 AND 253402300799)"));
    assert!(sql.contains("CHECK (payload_mass >= 0)"));
  }

  #[test]
  fn aggregation_groups_by_utc_year_and_skips_undated_rows() {
    let sql = aggregate_by_year(&name("spacex_launches"));
    assert!(sql.contains("AT TIME ZONE 'UTC'"));
    assert!(sql.contains("FROM spacex_launches"));
    assert!(sql.contains("WHERE launch_date_unix IS NOT NULL"));
  }
}
