//! Core types and trait definitions for the Orbit launch pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the data model, the record normalizer, the store capability traits and the
//! pipeline driver; backends live in their own crates.

pub mod aggregate;
pub mod error;
pub mod launch;
pub mod memory;
pub mod pipeline;
pub mod store;
pub mod table;

pub use error::{BoxError, Error, Result, ValidationError};
pub use table::TableName;
