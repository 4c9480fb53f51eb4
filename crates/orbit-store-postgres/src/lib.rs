//! PostgreSQL backend for the Orbit pipeline.
//!
//! [`PostgresStore`] implements the same three store capabilities as the
//! SQLite backend. It is the store to pair with the Trino engine: Trino reads
//! these tables back through its `postgresql` catalog, so the aggregates are
//! derived from the very rows the run appended.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{PostgresConfig, PostgresStore};
