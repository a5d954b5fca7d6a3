//! Source definitions for external data tables
//!
//! Sources are relations that already exist in the warehouse (for example the
//! raw scrape loaded by an ingestion job). Models read them through
//! `source('group', 'table')`; they are never built.

use crate::error::{CoreError, CoreResult};
use crate::model::testing::{parse_test_definition, test_severity};
use crate::model::{TestDefinition, TestSeverity, TestType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A source group, one per `.yml` file with `kind: sources`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceGroup {
    /// Must be "sources" when read from a file
    #[serde(default)]
    pub kind: Option<SourceKind>,

    /// Logical name used as the first argument of `source()`
    pub name: String,

    /// Description of the source group
    #[serde(default)]
    pub description: Option<String>,

    /// Schema the tables live in
    pub schema: String,

    /// Tables in this source
    pub tables: Vec<SourceTable>,
}

/// Enforces kind: sources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sources,
}

/// A single table within a source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceTable {
    /// Logical name used in models
    pub name: String,

    /// Actual table name in the database (if different from name)
    #[serde(default)]
    pub identifier: Option<String>,

    /// Description of the table
    #[serde(default)]
    pub description: Option<String>,

    /// Column definitions
    #[serde(default)]
    pub columns: Vec<SourceColumn>,
}

/// Column definition within a source table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceColumn {
    /// Column name
    pub name: String,

    /// Declared data type, documentation only
    #[serde(rename = "type", default)]
    pub data_type: Option<String>,

    /// Column description
    #[serde(default)]
    pub description: Option<String>,

    /// Tests to run on this column
    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

/// An assertion bound to a source column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceTest {
    /// Source group name
    pub source: String,
    /// Logical table name
    pub table: String,
    /// Column under test
    pub column: String,
    /// What is asserted
    pub test_type: TestType,
    /// Whether a failure fails the command
    pub severity: TestSeverity,
}

impl SourceTest {
    /// Display name, e.g. `source_not_null_raw_telegram_messages_id`
    pub fn name(&self) -> String {
        format!(
            "source_{}_{}_{}_{}",
            self.test_type, self.source, self.table, self.column
        )
    }
}

impl SourceGroup {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            kind: Some(SourceKind::Sources),
            name: name.into(),
            description: None,
            schema: schema.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: SourceTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Load a source file from a path
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let source: SourceGroup =
            serde_yaml::from_str(&content).map_err(|e| CoreError::SourceParseError {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;

        if source.kind != Some(SourceKind::Sources) {
            return Err(CoreError::SourceParseError {
                path: path.display().to_string(),
                details: "expected `kind: sources`".to_string(),
            });
        }

        source.validate()?;
        Ok(source)
    }

    /// Check the group has tables and no table is declared twice
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::EmptyName {
                context: format!("source group in schema '{}'", self.schema),
            });
        }

        if self.tables.is_empty() {
            return Err(CoreError::SourceEmptyTables {
                name: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(CoreError::SourceDuplicateTable {
                    table: table.name.clone(),
                    source_name: self.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Look up a table by logical name
    pub fn table(&self, name: &str) -> Option<&SourceTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// `schema.identifier` for a table of this group
    pub fn qualified_name(&self, table: &SourceTable) -> String {
        format!("{}.{}", self.schema, table.physical_name())
    }

    /// Parse the column tests declared on every table
    pub fn column_tests(&self) -> CoreResult<Vec<SourceTest>> {
        let mut tests = Vec::new();
        for table in &self.tables {
            for column in &table.columns {
                for def in &column.tests {
                    let test_type =
                        parse_test_definition(def).ok_or_else(|| CoreError::InvalidConfig {
                            model: format!("source:{}", self.name),
                            key: format!("{}.columns.{}.tests", table.name, column.name),
                            value: def.declared_name(),
                            reason: "unknown test or missing parameters".to_string(),
                        })?;
                    tests.push(SourceTest {
                        source: self.name.clone(),
                        table: table.name.clone(),
                        column: column.name.clone(),
                        test_type,
                        severity: test_severity(def),
                    });
                }
            }
        }
        Ok(tests)
    }
}

impl SourceTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            description: None,
            columns: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Table name in the database
    pub fn physical_name(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.name)
    }
}

/// Minimal YAML probe to check the `kind` field without full deserialization
#[derive(Deserialize)]
struct SourceKindProbe {
    #[serde(default)]
    kind: Option<serde_yaml::Value>,
}

/// Discover and load all source files under the given directories
///
/// YAML files without `kind: sources` are ignored. Files are visited in sorted
/// path order.
pub fn discover_sources(source_paths: &[PathBuf]) -> CoreResult<Vec<SourceGroup>> {
    let mut files = Vec::new();
    for source_path in source_paths {
        if source_path.exists() {
            collect_yaml_files(source_path, &mut files)?;
        }
    }
    files.sort();

    let mut sources = Vec::new();
    for path in files {
        let content = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let is_source = serde_yaml::from_str::<SourceKindProbe>(&content)
            .ok()
            .and_then(|p| p.kind)
            .is_some_and(|k| k.as_str() == Some("sources"));
        if !is_source {
            log::debug!("Skipping non-source YAML {}", path.display());
            continue;
        }

        sources.push(SourceGroup::load(&path)?);
    }

    Ok(sources)
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "yml" || e == "yaml") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
