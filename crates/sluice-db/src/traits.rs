//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Kind of an existing relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Table => write!(f, "table"),
            RelationKind::View => write!(f, "view"),
        }
    }
}

/// Database abstraction trait for Sluice
///
/// Relation names are `schema.name` (or bare `name` for the default schema)
/// and are quoted by the implementation. Implementations must be Send + Sync
/// so one handle can be shared by every worker.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a single statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Create table from SELECT statement
    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Create view from SELECT statement
    async fn create_view_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Whether a relation is a table or a view, `None` if it does not exist
    async fn relation_kind(&self, name: &str) -> DbResult<Option<RelationKind>>;

    /// Number of rows a query returns
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Up to `limit` rows of a query, each rendered as one string
    async fn query_sample_rows(&self, sql: &str, limit: usize) -> DbResult<Vec<String>>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;
}
