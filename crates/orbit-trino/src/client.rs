//! Blocking HTTP client for a Trino coordinator.

use std::time::Duration;

use orbit_core::{TableName, aggregate::YearlyAggregate, store::AggregationEngine};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::{
  Error, Result,
  protocol::{Column, QueryResults, decode_aggregates},
};

const SOURCE_NAME: &str = "orbit";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings for the coordinator. Passed through to the protocol
/// headers untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct TrinoConfig {
  #[serde(default = "default_host")]
  pub host:    String,
  #[serde(default = "default_port")]
  pub port:    u16,
  #[serde(default = "default_user")]
  pub user:    String,
  #[serde(default = "default_catalog")]
  pub catalog: String,
  #[serde(default = "default_schema")]
  pub schema:  String,
  /// Talk HTTPS instead of plain HTTP.
  #[serde(default)]
  pub secure:  bool,
}

fn default_host() -> String { "localhost".to_string() }

fn default_port() -> u16 { 8080 }

fn default_user() -> String { "trino".to_string() }

fn default_catalog() -> String { "postgresql".to_string() }

fn default_schema() -> String { "public".to_string() }

impl Default for TrinoConfig {
  fn default() -> Self {
    Self {
      host:    default_host(),
      port:    default_port(),
      user:    default_user(),
      catalog: default_catalog(),
      schema:  default_schema(),
      secure:  false,
    }
  }
}

impl TrinoConfig {
  fn statement_url(&self) -> String {
    let scheme = if self.secure { "https" } else { "http" };
    format!("{scheme}://{}:{}/v1/statement", self.host, self.port)
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// A Trino session used as an [`AggregationEngine`].
pub struct TrinoClient {
  http:   Client,
  config: TrinoConfig,
}

impl TrinoClient {
  pub fn new(config: TrinoConfig) -> Result<Self> {
    let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { http, config })
  }

  /// Run `sql` to completion and return its columns and every data row.
  pub fn query(&self, sql: &str) -> Result<(Vec<Column>, Vec<Vec<Value>>)> {
    let first = self
      .http
      .post(self.config.statement_url())
      .header("X-Trino-User", &self.config.user)
      .header("X-Trino-Catalog", &self.config.catalog)
      .header("X-Trino-Schema", &self.config.schema)
      .header("X-Trino-Source", SOURCE_NAME)
      .body(sql.to_owned())
      .send()?;

    let mut page = read_page(first)?;
    tracing::debug!(query_id = %page.id, "trino query submitted");

    let mut columns: Option<Vec<Column>> = None;
    let mut rows = Vec::new();
    loop {
      if let Some(error) = page.error {
        return Err(Error::Query {
          name:    error.error_name.unwrap_or_else(|| "UNKNOWN".to_string()),
          message: error.message,
        });
      }
      if columns.is_none() {
        columns = page.columns;
      }
      rows.extend(page.data.unwrap_or_default());

      let Some(next) = page.next_uri else { break };
      let response = self
        .http
        .get(&next)
        .header("X-Trino-User", &self.config.user)
        .send()?;
      page = read_page(response)?;
    }

    let columns = columns.ok_or_else(|| Error::Decode("query returned no columns".to_string()))?;
    Ok((columns, rows))
  }
}

fn read_page(response: Response) -> Result<QueryResults> {
  let status = response.status();
  if !status.is_success() {
    return Err(Error::Status { status: status.as_u16(), uri: response.url().to_string() });
  }
  Ok(response.json()?)
}

/// Yearly metrics, computed on the engine. `launch_delay_hours` is the
/// persisted column, never recomputed from the timestamps.
fn aggregate_by_year(fact_table: &TableName) -> String {
  format!(
    "SELECT
        EXTRACT(YEAR FROM from_unixtime(launch_date_unix, 'UTC'))   AS aggregation_year,
        COUNT(id)                                                   AS total_launches,
        COUNT(CASE WHEN success = TRUE THEN id END)                 AS total_successful_launches,
        AVG(CAST(payload_mass AS DOUBLE))                           AS average_payload_mass,
        AVG(CAST(launch_delay_hours AS DOUBLE))                     AS average_delay_hours
     FROM {fact_table}
     WHERE launch_date_unix IS NOT NULL
     GROUP BY EXTRACT(YEAR FROM from_unixtime(launch_date_unix, 'UTC'))
     ORDER BY aggregation_year"
  )
}

impl AggregationEngine for TrinoClient {
  type Error = Error;

  fn aggregate(&self, fact_table: &TableName) -> Result<Vec<YearlyAggregate>> {
    let (columns, rows) = self.query(&aggregate_by_year(fact_table))?;
    decode_aggregates(&columns, rows)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    io::{BufRead as _, BufReader, Read as _, Write as _},
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
  };

  use serde_json::json;

  use super::*;

  /// A canned HTTP/1.1 reply.
  struct Reply {
    status: u16,
    body:   String,
  }

  fn ok(body: Value) -> Reply { Reply { status: 200, body: body.to_string() } }

  /// Serve `replies` in order, one connection each, returning every request
  /// (request line, headers and body, lowercased) once all are served.
  fn serve(replies: impl FnOnce(SocketAddr) -> Vec<Reply>) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let replies = replies(addr);

    let handle = thread::spawn(move || {
      let mut seen = Vec::new();
      for reply in replies {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);

        let mut request = String::new();
        let mut content_length = 0usize;
        loop {
          let mut line = String::new();
          reader.read_line(&mut line).unwrap();
          if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap();
          }
          request.push_str(&line);
          if line == "\r\n" {
            break;
          }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        request.push_str(&String::from_utf8(body).unwrap());
        seen.push(request.to_ascii_lowercase());

        let mut stream = reader.into_inner();
        write!(
          stream,
          "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
          reply.status,
          reply.body.len(),
          reply.body
        )
        .unwrap();
      }
      seen
    });

    (addr, handle)
  }

  fn client(addr: SocketAddr) -> TrinoClient {
    TrinoClient::new(TrinoConfig {
      host: addr.ip().to_string(),
      port: addr.port(),
      ..TrinoConfig::default()
    })
    .unwrap()
  }

  fn facts() -> TableName { TableName::new("spacex_launches").unwrap() }

  fn columns() -> Value {
    json!([
      { "name": "aggregation_year",          "type": "bigint" },
      { "name": "total_launches",            "type": "bigint" },
      { "name": "total_successful_launches", "type": "bigint" },
      { "name": "average_payload_mass",      "type": "double" },
      { "name": "average_delay_hours",       "type": "double" },
    ])
  }

  #[test]
  fn follows_next_uri_and_concatenates_pages() {
    let (addr, server) = serve(|addr| {
      let next = |n: u32| format!("http://{addr}/v1/statement/queued/q1/{n}");
      vec![
        ok(json!({ "id": "q1", "nextUri": next(1), "stats": { "state": "QUEUED" } })),
        ok(json!({
          "id": "q1", "nextUri": next(2), "columns": columns(),
          "data": [[2020, 1, 1, 15600.0, 1.0], [2021, 2, 1, 1500.0, 0.0]],
        })),
        ok(json!({
          "id": "q1", "columns": columns(),
          "data": [[2022, 3, 2, 6850.0, 1.6666666666666667], [2023, 2, 1, 1000.0, 4.5]],
          "stats": { "state": "FINISHED" },
        })),
      ]
    });

    let rows = client(addr).aggregate(&facts()).unwrap();
    let years: Vec<i32> = rows.iter().map(|r| r.aggregation_year).collect();
    assert_eq!(years, [2020, 2021, 2022, 2023]);
    assert_eq!(rows[2].total_launches, 3);
    assert_eq!(rows[2].total_successful_launches, 2);
    assert_eq!(rows[2].average_payload_mass, 6850.0);
    assert_eq!(rows[2].average_delay_hours, 1.6666666666666667);

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].starts_with("post /v1/statement "), "{}", requests[0]);
    assert!(requests[0].contains("x-trino-user: trino"));
    assert!(requests[0].contains("x-trino-catalog: postgresql"));
    assert!(requests[0].contains("x-trino-schema: public"));
    assert!(requests[0].contains("from spacex_launches"));
    assert!(requests[0].contains("where launch_date_unix is not null"));
    assert!(requests[1].starts_with("get /v1/statement/queued/q1/1 "));
    assert!(requests[2].starts_with("get /v1/statement/queued/q1/2 "));
  }

  #[test]
  fn empty_result_set_is_not_an_error() {
    let (addr, server) = serve(|_| {
      vec![ok(json!({ "id": "q2", "columns": columns(), "stats": { "state": "FINISHED" } }))]
    });

    assert!(client(addr).aggregate(&facts()).unwrap().is_empty());
    server.join().unwrap();
  }

  #[test]
  fn error_page_fails_with_the_server_message() {
    let (addr, server) = serve(|addr| {
      vec![
        ok(json!({ "id": "q3", "nextUri": format!("http://{addr}/v1/statement/executing/q3/1") })),
        ok(json!({
          "id": "q3",
          "error": {
            "message":   "line 6:11: Table 'postgresql.public.spacex_launches' does not exist",
            "errorName": "TABLE_NOT_FOUND",
          },
        })),
      ]
    });

    match client(addr).aggregate(&facts()) {
      Err(Error::Query { name, message }) => {
        assert_eq!(name, "TABLE_NOT_FOUND");
        assert!(message.contains("does not exist"));
      }
      other => panic!("expected query error, got {other:?}"),
    }
    server.join().unwrap();
  }

  #[test]
  fn non_success_status_is_reported() {
    let (addr, server) =
      serve(|_| vec![Reply { status: 503, body: "overloaded".to_string() }]);

    let err = client(addr).aggregate(&facts()).unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }), "{err}");
    server.join().unwrap();
  }

  #[test]
  fn unreachable_coordinator_is_an_http_error() {
    // Bind then drop to get a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    assert!(matches!(client(addr).aggregate(&facts()), Err(Error::Http(_))));
  }

  #[test]
  fn statement_url_honours_secure_flag() {
    let mut config = TrinoConfig::default();
    assert_eq!(config.statement_url(), "http://localhost:8080/v1/statement");
    config.secure = true;
    assert_eq!(config.statement_url(), "https://localhost:8080/v1/statement");
  }
}
