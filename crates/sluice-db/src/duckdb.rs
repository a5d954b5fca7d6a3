//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, RelationKind};
use async_trait::async_trait;
use duckdb::Connection;
use sluice_core::sql_utils::{escape_sql_string, quote_ident, quote_qualified, split_qualified_name};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
///
/// A single connection guarded by a mutex; statements from concurrent workers
/// are serialized at the connection.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::Connection {
                target: ":memory:".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::Connection {
                target: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DbError::LockPoisoned)
    }

    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        log::debug!("duckdb execute: {}", sql);
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::statement(e, sql))
    }

    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::statement(e, sql))
    }

    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let wrapped = format!("SELECT COUNT(*) FROM ({}) AS _sluice_count", sql);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&wrapped, [], |row| row.get(0))
            .map_err(|e| DbError::statement(e, sql))?;
        usize::try_from(count).map_err(|e| DbError::UnexpectedResult(e.to_string()))
    }

    fn query_strings_sync(&self, sql: &str) -> DbResult<Vec<Option<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::statement(e, sql))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))
            .map_err(|e| DbError::statement(e, sql))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::statement(e, sql))
    }

    fn relation_kind_sync(&self, name: &str) -> DbResult<Option<RelationKind>> {
        let (schema, table) = split_qualified_name(name);
        let sql = format!(
            "SELECT table_type FROM information_schema.tables \
             WHERE table_schema = '{}' AND table_name = '{}'",
            escape_sql_string(schema),
            escape_sql_string(table)
        );
        let kinds = self.query_strings_sync(&sql)?;
        Ok(kinds.into_iter().flatten().next().map(|t| {
            if t.eq_ignore_ascii_case("VIEW") {
                RelationKind::View
            } else {
                RelationKind::Table
            }
        }))
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let verb = if replace {
            "CREATE OR REPLACE TABLE"
        } else {
            "CREATE TABLE"
        };
        self.execute_sync(&format!("{} {} AS {}", verb, quote_qualified(name), select))?;
        Ok(())
    }

    async fn create_view_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let verb = if replace {
            "CREATE OR REPLACE VIEW"
        } else {
            "CREATE VIEW"
        };
        self.execute_sync(&format!("{} {} AS {}", verb, quote_qualified(name), select))?;
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        Ok(self.relation_kind_sync(name)?.is_some())
    }

    async fn relation_kind(&self, name: &str) -> DbResult<Option<RelationKind>> {
        self.relation_kind_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn query_sample_rows(&self, sql: &str, limit: usize) -> DbResult<Vec<String>> {
        // A table alias in the select list is the whole row as a STRUCT
        let wrapped = format!(
            "SELECT CAST(_sluice_row AS VARCHAR) FROM ({}) AS _sluice_row LIMIT {}",
            sql, limit
        );
        Ok(self
            .query_strings_sync(&wrapped)?
            .into_iter()
            .map(|row| row.unwrap_or_else(|| "NULL".to_string()))
            .collect())
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        let keyword = match self.relation_kind_sync(name)? {
            Some(RelationKind::View) => "VIEW",
            Some(RelationKind::Table) => "TABLE",
            None => return Ok(()),
        };
        self.execute_sync(&format!(
            "DROP {} IF EXISTS {}",
            keyword,
            quote_qualified(name)
        ))?;
        Ok(())
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        self.execute_sync(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_ident(schema)
        ))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
