//! sluice-db - Database abstraction layer for Sluice
//!
//! This crate provides the async [`Database`] trait the materializer and test
//! runner talk to, and its DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, RelationKind};
