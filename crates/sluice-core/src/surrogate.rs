//! Deterministic surrogate keys
//!
//! A surrogate key is the SHA-256 of the key columns' text forms joined by
//! [`SEPARATOR`], with NULL replaced by [`NULL_SENTINEL`]. [`surrogate_key_sql`]
//! emits the warehouse expression and [`surrogate_key`] computes the same digest
//! in Rust, so keys can be predicted without a database round trip.

use crate::checksum::compute_checksum;
use crate::sql_utils::sql_literal;

/// Text substituted for NULL key parts
pub const NULL_SENTINEL: &str = "_sluice_null_";

/// Separator between key parts
pub const SEPARATOR: &str = "-";

/// Hash a tuple of key parts; `None` stands for SQL NULL.
///
/// The same input always yields the same 64-character lower-case hex digest.
pub fn surrogate_key<S: AsRef<str>>(parts: &[Option<S>]) -> String {
    let joined = parts
        .iter()
        .map(|p| p.as_ref().map_or(NULL_SENTINEL, |s| s.as_ref()))
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    compute_checksum(&joined)
}

/// SQL expression computing [`surrogate_key`] over column expressions.
///
/// Expressions are spliced verbatim so callers may pass casts or functions,
/// e.g. `channel` or `cast(date AS DATE)`.
pub fn surrogate_key_sql<S: AsRef<str>>(columns: &[S]) -> String {
    let sentinel = sql_literal(NULL_SENTINEL);
    let parts = columns
        .iter()
        .map(|c| format!("coalesce(cast({} AS VARCHAR), {})", c.as_ref().trim(), sentinel))
        .collect::<Vec<_>>()
        .join(", ");
    format!("sha256(concat_ws({}, {}))", sql_literal(SEPARATOR), parts)
}

#[cfg(test)]
#[path = "surrogate_test.rs"]
mod tests;
