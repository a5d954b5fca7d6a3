//! Test types and parsing for model and column assertions

use crate::error::CoreError;
use crate::model_name::ModelName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Parse a test definition into a TestType
///
/// Returns `None` for unknown test names or missing required parameters; the
/// registry turns that into an `InvalidConfig` error naming the model.
pub fn parse_test_definition(test_def: &TestDefinition) -> Option<TestType> {
    match test_def {
        TestDefinition::Simple(name) => parse_simple_test(name),
        TestDefinition::Parameterized(map) => {
            let (test_name, params) = map.iter().next()?;
            parse_parameterized_test(test_name, params)
        }
    }
}

fn parse_simple_test(name: &str) -> Option<TestType> {
    match name {
        "unique" => Some(TestType::Unique),
        "not_null" => Some(TestType::NotNull),
        _ => None,
    }
}

fn parse_parameterized_test(test_name: &str, params: &TestParams) -> Option<TestType> {
    match test_name {
        "unique" => Some(TestType::Unique),
        "not_null" => Some(TestType::NotNull),
        "accepted_values" => parse_accepted_values(params),
        "relationship" | "relationships" => params.to.clone().map(|to| TestType::Relationship {
            to,
            field: params.field.clone(),
        }),
        "expression" | "expression_is_true" => params
            .expression
            .clone()
            .filter(|e| !e.trim().is_empty())
            .map(|expression| TestType::Expression { expression }),
        _ => None,
    }
}

fn parse_accepted_values(params: &TestParams) -> Option<TestType> {
    let values: Vec<String> = params
        .values
        .iter()
        .filter_map(|v| match v {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(TestType::AcceptedValues {
        values,
        quote: params.quote.unwrap_or(true),
    })
}

/// Severity declared on a test definition, `Error` when absent
pub fn test_severity(test_def: &TestDefinition) -> TestSeverity {
    match test_def {
        TestDefinition::Simple(_) => TestSeverity::Error,
        TestDefinition::Parameterized(map) => map
            .values()
            .next()
            .and_then(|p| p.severity)
            .unwrap_or_default(),
    }
}

/// A parsed assertion attached to a model, optionally to one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTest {
    /// Model the assertion is bound to
    pub model: ModelName,

    /// Column under test; `None` for model-level expressions
    pub column: Option<String>,

    /// What is asserted
    pub test_type: TestType,

    /// Whether a failure fails the command
    #[serde(default)]
    pub severity: TestSeverity,
}

impl SchemaTest {
    /// Stable display name, e.g. `not_null_stg_messages_message_id`
    pub fn name(&self) -> String {
        match &self.column {
            Some(column) => format!("{}_{}_{}", self.test_type, self.model, column),
            None => format!("{}_{}", self.test_type, self.model),
        }
    }
}

/// Singular test - standalone SQL test file that should return 0 rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingularTest {
    /// Test name (derived from filename without extension)
    pub name: String,

    /// Path to the SQL test file, if it came from disk
    pub path: Option<PathBuf>,

    /// Template returning violating rows
    pub sql: String,
}

impl SingularTest {
    /// Build a singular test from an in-memory template
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            sql: sql.into(),
        }
    }

    /// Load a singular test from a SQL file
    pub fn from_file(path: PathBuf) -> Result<Self, CoreError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::TestValidationError {
                name: path.display().to_string(),
                message: "Invalid file name".to_string(),
            })?
            .to_string();

        let sql = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;

        if sql.trim().is_empty() {
            return Err(CoreError::TestValidationError {
                name,
                message: "Test file is empty".to_string(),
            });
        }

        Ok(Self {
            name,
            path: Some(path),
            sql,
        })
    }
}

/// Kinds of assertions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Column values must be unique
    Unique,
    /// Column values must not be null
    NotNull,
    /// Column values must be in the allowed list
    AcceptedValues {
        /// List of allowed values
        values: Vec<String>,
        /// Whether to quote values in SQL
        #[serde(default)]
        quote: bool,
    },
    /// Column values must exist in the referenced model or source
    Relationship {
        /// `ref('model')`, `source('group', 'table')`, or a bare model name
        to: String,
        /// Column in the referenced relation (defaults to same column name)
        #[serde(default)]
        field: Option<String>,
    },
    /// Boolean SQL expression that must hold for every row
    Expression {
        /// Predicate evaluated against each row of the model
        expression: String,
    },
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Unique => write!(f, "unique"),
            TestType::NotNull => write!(f, "not_null"),
            TestType::AcceptedValues { .. } => write!(f, "accepted_values"),
            TestType::Relationship { .. } => write!(f, "relationship"),
            TestType::Expression { .. } => write!(f, "expression"),
        }
    }
}

/// Test severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestSeverity {
    /// Test failure causes the command to fail (default)
    #[default]
    Error,
    /// Test failure is reported but doesn't fail the command
    Warn,
}

impl std::fmt::Display for TestSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestSeverity::Error => write!(f, "error"),
            TestSeverity::Warn => write!(f, "warn"),
        }
    }
}

/// A test definition that can be either a simple string or a parameterized test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestDefinition {
    /// Simple test with no parameters (e.g., "unique", "not_null")
    Simple(String),
    /// Parameterized test (e.g., accepted_values with values list)
    Parameterized(HashMap<String, TestParams>),
}

impl TestDefinition {
    /// Name as written in the definition, for error messages
    pub fn declared_name(&self) -> String {
        match self {
            TestDefinition::Simple(name) => name.clone(),
            TestDefinition::Parameterized(map) => map.keys().next().cloned().unwrap_or_default(),
        }
    }
}

/// Parameters for parameterized tests
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestParams {
    /// Values for accepted_values test
    #[serde(default)]
    pub values: Vec<serde_yaml::Value>,
    /// Whether to quote accepted values in SQL; quoted unless set to `false`
    #[serde(default)]
    pub quote: Option<bool>,
    /// Referenced relation for relationship tests
    #[serde(default)]
    pub to: Option<String>,
    /// Referenced field for relationship tests (defaults to same column name)
    #[serde(default)]
    pub field: Option<String>,
    /// Predicate for expression tests
    #[serde(default)]
    pub expression: Option<String>,
    /// Severity override
    #[serde(default)]
    pub severity: Option<TestSeverity>,
}

#[cfg(test)]
#[path = "testing_test.rs"]
mod tests;
