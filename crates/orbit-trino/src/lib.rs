//! Federated-query backend for the Orbit pipeline.
//!
//! Runs the yearly aggregation through a Trino coordinator using Trino's
//! HTTP client protocol: the statement is `POST`ed to `/v1/statement`, then
//! the `nextUri` chain is followed until the server stops returning one. The
//! query is grouped and filtered on the engine; only the per-year rows cross
//! the wire.

mod client;
mod protocol;

pub mod error;

pub use client::{TrinoClient, TrinoConfig};
pub use error::{Error, Result};
