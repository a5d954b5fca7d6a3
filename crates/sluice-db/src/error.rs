//! Error types for sluice-db

use thiserror::Error;

/// Warehouse errors
#[derive(Error, Debug)]
pub enum DbError {
    /// D001: the database file or in-memory instance could not be opened
    #[error("[D001] Could not open database {target}: {message}")]
    Connection { target: String, message: String },

    /// D002: a statement was rejected by the engine
    #[error("[D002] Statement failed: {message}\n  SQL: {sql}")]
    Statement { sql: String, message: String },

    /// D003: a statement read a relation that does not exist
    #[error("[D003] Relation not found: {message}")]
    RelationNotFound { sql: String, message: String },

    /// D004: a thread panicked while holding the connection
    #[error("[D004] Database connection lock poisoned")]
    LockPoisoned,

    /// D005: a query returned something the caller cannot use
    #[error("[D005] Unexpected query result: {0}")]
    UnexpectedResult(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Wrap a DuckDB failure for the statement that caused it
    pub(crate) fn statement(err: duckdb::Error, sql: &str) -> Self {
        let message = err.to_string();
        if is_missing_relation(&message) {
            DbError::RelationNotFound {
                sql: sql.to_string(),
                message,
            }
        } else {
            DbError::Statement {
                sql: sql.to_string(),
                message,
            }
        }
    }
}

/// DuckDB reports catalog misses only through the message text
fn is_missing_relation(message: &str) -> bool {
    message.contains("Catalog Error")
        && (message.contains("Table with name")
            || message.contains("View with name")
            || message.contains("Table or view with name"))
}
