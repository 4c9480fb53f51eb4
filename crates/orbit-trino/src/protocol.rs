//! Wire types of Trino's client protocol and decoding of the aggregation
//! result set.

use orbit_core::aggregate::{AGGREGATE_COLUMNS, YearlyAggregate};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// One page of a running query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
  pub id:       String,
  pub next_uri: Option<String>,
  pub columns:  Option<Vec<Column>>,
  pub data:     Option<Vec<Vec<Value>>>,
  pub error:    Option<QueryError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Column {
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
  pub message:    String,
  #[serde(default)]
  pub error_name: Option<String>,
}

/// Map rows onto [`YearlyAggregate`] by column name, so the engine is free to
/// return the columns in any order.
pub fn decode_aggregates(columns: &[Column], rows: Vec<Vec<Value>>) -> Result<Vec<YearlyAggregate>> {
  let mut positions = [0usize; AGGREGATE_COLUMNS.len()];
  for (slot, wanted) in positions.iter_mut().zip(AGGREGATE_COLUMNS) {
    *slot = columns
      .iter()
      .position(|c| c.name == wanted)
      .ok_or_else(|| Error::Decode(format!("missing column {wanted}")))?;
  }
  let [year, total, successful, mass, delay] = positions;

  rows
    .into_iter()
    .map(|row| {
      let aggregation_year = integer(&row, columns, year)?;
      Ok(YearlyAggregate {
        aggregation_year:          i32::try_from(aggregation_year)
          .map_err(|_| Error::Decode(format!("year {aggregation_year} out of range")))?,
        total_launches:            integer(&row, columns, total)?,
        total_successful_launches: integer(&row, columns, successful)?,
        average_payload_mass:      float(&row, columns, mass)?,
        average_delay_hours:       float(&row, columns, delay)?,
      })
    })
    .collect()
}

fn cell<'r>(row: &'r [Value], columns: &[Column], index: usize) -> Result<&'r Value> {
  row.get(index).ok_or_else(|| {
    Error::Decode(format!("row {row:?} has no value for {}", columns[index].name))
  })
}

fn integer(row: &[Value], columns: &[Column], index: usize) -> Result<i64> {
  let value = cell(row, columns, index)?;
  value.as_i64().ok_or_else(|| mismatch(&columns[index], "an integer", value))
}

fn float(row: &[Value], columns: &[Column], index: usize) -> Result<f64> {
  let value = cell(row, columns, index)?;
  value.as_f64().ok_or_else(|| mismatch(&columns[index], "a number", value))
}

fn mismatch(column: &Column, expected: &str, value: &Value) -> Error {
  Error::Decode(format!(
    "expected {expected} in {} ({}), got {value}",
    column.name, column.kind
  ))
}
