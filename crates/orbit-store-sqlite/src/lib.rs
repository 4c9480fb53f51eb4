//! SQLite backend for the Orbit pipeline.
//!
//! [`SqliteStore`] implements all three store capabilities of `orbit-core`:
//! the append-only fact writer, the yearly aggregation query (grouping and
//! filtering run inside SQLite, never client-side) and the atomic aggregate
//! upsert.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteConfig, SqliteStore};
