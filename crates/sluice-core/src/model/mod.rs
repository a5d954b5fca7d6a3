//! Model representation
//!
//! A [`ModelDefinition`] is what a caller (or the project loader) declares; a
//! [`Model`] is the validated, immutable form held by the
//! [`Registry`](crate::Registry).

pub mod testing;

pub use testing::{
    parse_test_definition, test_severity, SchemaTest, SingularTest, TestDefinition, TestParams,
    TestSeverity, TestType,
};

use crate::checksum::compute_checksum;
use crate::config::Materialization;
use crate::error::{CoreError, CoreResult};
use crate::model_name::ModelName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Config keys a model may set
pub const ALLOWED_CONFIG_KEYS: [&str; 4] = ["materialized", "schema", "kind", "tags"];

/// Schema used when neither the model nor the project names one
pub const DEFAULT_SCHEMA: &str = "main";

/// Layer a model belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Cleans and renames a single source
    Staging,
    /// Descriptive entity table
    Dimension,
    /// Event/measure table keyed by dimensions
    Fact,
    /// Anything else
    #[default]
    Generic,
}

impl ModelKind {
    /// Infer the kind from the conventional name prefix
    pub fn infer_from_name(name: &str) -> Self {
        if name.starts_with("stg_") {
            ModelKind::Staging
        } else if name.starts_with("dim_") {
            ModelKind::Dimension
        } else if name.starts_with("fct_") {
            ModelKind::Fact
        } else {
            ModelKind::Generic
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Staging => write!(f, "staging"),
            ModelKind::Dimension => write!(f, "dimension"),
            ModelKind::Fact => write!(f, "fact"),
            ModelKind::Generic => write!(f, "generic"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(ModelKind::Staging),
            "dimension" => Ok(ModelKind::Dimension),
            "fact" => Ok(ModelKind::Fact),
            "generic" => Ok(ModelKind::Generic),
            other => Err(format!(
                "unknown kind '{other}', expected staging, dimension, fact or generic"
            )),
        }
    }
}

/// A declared column with its description and attached tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Tests applied to this column
    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tests: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_test(mut self, test: TestDefinition) -> Self {
        self.tests.push(test);
        self
    }
}

/// An unvalidated model declaration
#[derive(Debug, Clone, Default)]
pub struct ModelDefinition {
    /// Declared model name
    pub name: String,

    /// Template body, references still as `ref()` / `source()` calls
    pub raw_sql: String,

    /// Raw config options (`materialized`, `schema`, `kind`, `tags`)
    pub config: BTreeMap<String, String>,

    /// Human-readable description
    pub description: Option<String>,

    /// Declared columns, in order
    pub columns: Vec<ColumnDef>,

    /// Model-level tests (expressions)
    pub tests: Vec<TestDefinition>,

    /// File the model was read from, if any
    pub path: Option<PathBuf>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, raw_sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_sql: raw_sql.into(),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_test(mut self, test: TestDefinition) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }
}

/// Project-wide defaults applied when a model does not configure a value
#[derive(Debug, Clone, Default)]
pub struct ModelDefaults {
    /// Default materialization
    pub materialization: Materialization,

    /// Default target schema
    pub schema: Option<String>,
}

/// A validated model, immutable for the duration of a run
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    /// Unique model name
    pub name: ModelName,

    /// Layer the model belongs to
    pub kind: ModelKind,

    /// How the model is persisted
    pub materialization: Materialization,

    /// Target schema
    pub schema: String,

    /// Template body
    pub raw_sql: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Declared columns, in order
    pub columns: Vec<ColumnDef>,

    /// Parsed assertions bound to this model
    pub tests: Vec<SchemaTest>,

    /// Free-form tags
    pub tags: Vec<String>,

    /// File the model was read from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Position in the declaration sequence
    pub declaration_index: usize,
}

impl Model {
    /// Validate a definition and apply project defaults
    pub fn from_definition(
        def: ModelDefinition,
        declaration_index: usize,
        defaults: &ModelDefaults,
    ) -> CoreResult<Self> {
        let name = ModelName::try_new(def.name.trim()).ok_or_else(|| CoreError::EmptyName {
            context: format!("model #{declaration_index}"),
        })?;

        let invalid = |key: &str, value: &str, reason: String| CoreError::InvalidConfig {
            model: name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };

        if let Some(key) = def
            .config
            .keys()
            .find(|k| !ALLOWED_CONFIG_KEYS.contains(&k.as_str()))
        {
            return Err(invalid(
                key,
                &def.config[key],
                format!("unknown key, allowed: {}", ALLOWED_CONFIG_KEYS.join(", ")),
            ));
        }

        let materialization = match def.config.get("materialized") {
            Some(value) => value
                .parse::<Materialization>()
                .map_err(|reason| invalid("materialized", value, reason))?,
            None => defaults.materialization,
        };

        let kind = match def.config.get("kind") {
            Some(value) => value
                .parse::<ModelKind>()
                .map_err(|reason| invalid("kind", value, reason))?,
            None => ModelKind::infer_from_name(&name),
        };

        let schema = match def.config.get("schema") {
            Some(value) if value.trim().is_empty() => {
                return Err(invalid("schema", value, "schema cannot be empty".to_string()))
            }
            Some(value) => value.trim().to_string(),
            None => defaults
                .schema
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        };

        let tags = def
            .config
            .get("tags")
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let tests = collect_schema_tests(&name, &def.columns, &def.tests)?;

        Ok(Self {
            name,
            kind,
            materialization,
            schema,
            raw_sql: def.raw_sql,
            description: def.description,
            columns: def.columns,
            tests,
            tags,
            path: def.path,
            declaration_index,
        })
    }

    /// Fully-qualified `schema.name` relation this model materializes into
    pub fn relation_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// SHA-256 of the raw template body
    pub fn sql_checksum(&self) -> String {
        compute_checksum(&self.raw_sql)
    }

    /// Look up a declared column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn collect_schema_tests(
    model: &ModelName,
    columns: &[ColumnDef],
    model_tests: &[TestDefinition],
) -> CoreResult<Vec<SchemaTest>> {
    let unknown_test = |def: &TestDefinition, column: Option<&str>| CoreError::InvalidConfig {
        model: model.to_string(),
        key: match column {
            Some(c) => format!("columns.{c}.tests"),
            None => "tests".to_string(),
        },
        value: def.declared_name(),
        reason: "unknown test or missing parameters".to_string(),
    };

    let mut tests = Vec::new();
    for column in columns {
        for def in &column.tests {
            let test_type =
                parse_test_definition(def).ok_or_else(|| unknown_test(def, Some(&column.name)))?;
            tests.push(SchemaTest {
                model: model.clone(),
                column: Some(column.name.clone()),
                test_type,
                severity: test_severity(def),
            });
        }
    }

    for def in model_tests {
        let test_type = match parse_test_definition(def) {
            Some(t @ TestType::Expression { .. }) => t,
            _ => return Err(unknown_test(def, None)),
        };
        tests.push(SchemaTest {
            model: model.clone(),
            column: None,
            test_type,
            severity: test_severity(def),
        });
    }

    Ok(tests)
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
