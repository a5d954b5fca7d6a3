//! Test SQL generation
//!
//! Every generated query returns the rows that violate the assertion, so an
//! assertion passes exactly when the query is empty.

use serde::Serialize;
use sluice_core::model::{SchemaTest, SingularTest, TestSeverity, TestType};
use sluice_core::resolver::{extract_references, parse_reference, Reference};
use sluice_core::sql_utils::{escape_sql_string, quote_ident, quote_qualified};
use sluice_core::{ModelName, Registry, SourceTest};
use sluice_jinja::{render, Bindings, JinjaError};
use std::collections::HashMap;
use thiserror::Error;

/// Error type for test SQL generation
#[derive(Error, Debug)]
pub enum TestGenError {
    /// Relationship target that names nothing in the registry (T002)
    #[error("[T002] Test '{test}': relationship target '{target}' is not a declared model or source")]
    UnresolvedTarget { test: String, target: String },

    /// Source test on a table that is not declared (T003)
    #[error("[T003] Test '{test}': source '{source_name}.{table}' is not declared")]
    UnknownSource {
        test: String,
        source_name: String,
        table: String,
    },

    /// Singular test template failed to render (T004)
    #[error("[T004] Test '{test}' failed to render: {source}")]
    Render {
        test: String,
        #[source]
        source: JinjaError,
    },

    /// Schema test bound to a model the registry does not hold (T005)
    #[error("[T005] Test '{test}' is bound to unknown model '{model}'")]
    UnknownModel { test: String, model: String },
}

/// Result type alias for test generation
pub type TestGenResult<T> = Result<T, TestGenError>;

/// What an assertion checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    Unique,
    NotNull,
    AcceptedValues,
    Relationship,
    Expression,
    /// Standalone SQL file returning violating rows
    Singular,
}

impl From<&TestType> for AssertionKind {
    fn from(test_type: &TestType) -> Self {
        match test_type {
            TestType::Unique => AssertionKind::Unique,
            TestType::NotNull => AssertionKind::NotNull,
            TestType::AcceptedValues { .. } => AssertionKind::AcceptedValues,
            TestType::Relationship { .. } => AssertionKind::Relationship,
            TestType::Expression { .. } => AssertionKind::Expression,
        }
    }
}

impl std::fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssertionKind::Unique => "unique",
            AssertionKind::NotNull => "not_null",
            AssertionKind::AcceptedValues => "accepted_values",
            AssertionKind::Relationship => "relationship",
            AssertionKind::Expression => "expression",
            AssertionKind::Singular => "singular",
        };
        write!(f, "{}", s)
    }
}

/// Test SQL with the metadata the runner needs to decide whether to run it
#[derive(Debug, Clone)]
pub struct Assertion {
    /// Human-readable test name
    pub name: String,

    /// Model the assertion is bound to; `None` for source and singular tests
    pub model: Option<ModelName>,

    /// Column being tested
    pub column: Option<String>,

    /// What is checked
    pub kind: AssertionKind,

    /// Whether a failure fails the command
    pub severity: TestSeverity,

    /// Query returning violating rows
    pub sql: String,

    /// Models that must be materialized before the query can run
    pub requires: Vec<ModelName>,

    /// Model a relationship assertion points at
    pub reference_target: Option<ModelName>,
}

/// Generate SQL for a unique test
///
/// Returns one row per duplicated value.
pub fn generate_unique_test(table: &str, column: &str) -> String {
    let qt = quote_qualified(table);
    let qc = quote_ident(column);
    format!("SELECT {qc}, COUNT(*) AS cnt\nFROM {qt}\nWHERE {qc} IS NOT NULL\nGROUP BY {qc}\nHAVING COUNT(*) > 1")
}

/// Generate SQL for a not_null test
///
/// Returns rows where the column is NULL.
pub fn generate_not_null_test(table: &str, column: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} IS NULL",
        quote_qualified(table),
        quote_ident(column)
    )
}

/// Generate SQL for an accepted_values test
///
/// Returns rows whose value is outside the allowed list. NULLs are left to
/// `not_null`.
pub fn generate_accepted_values_test(
    table: &str,
    column: &str,
    values: &[String],
    quote: bool,
) -> String {
    let values_list = values
        .iter()
        .map(|v| {
            // Unquoted lists are meant for numbers; anything else is still quoted
            if !quote && v.parse::<f64>().is_ok() {
                v.clone()
            } else {
                format!("'{}'", escape_sql_string(v))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let qt = quote_qualified(table);
    let qc = quote_ident(column);

    format!("SELECT * FROM {qt} WHERE {qc} IS NOT NULL AND {qc} NOT IN ({values_list})")
}

/// Generate SQL for a relationship test (referential integrity)
///
/// Returns rows whose non-null value has no match in `ref_table.ref_column`.
pub fn generate_relationship_test(
    table: &str,
    column: &str,
    ref_table: &str,
    ref_column: &str,
) -> String {
    let qt = quote_qualified(table);
    let qc = quote_ident(column);
    let qrt = quote_qualified(ref_table);
    let qrc = quote_ident(ref_column);
    format!(
        "SELECT src.{qc}\n\
         FROM {qt} AS src\n\
         WHERE src.{qc} IS NOT NULL\n\
         \x20 AND NOT EXISTS (\n\
         \x20   SELECT 1 FROM {qrt} AS ref_tbl\n\
         \x20   WHERE ref_tbl.{qrc} = src.{qc}\n\
         \x20 )"
    )
}

/// Generate SQL for an expression test
///
/// Returns rows for which the predicate does not hold.
pub fn generate_expression_test(table: &str, expression: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE NOT ({})",
        quote_qualified(table),
        expression.trim()
    )
}

/// Relation and model (if any) a relationship test points at
fn resolve_target(
    test_name: &str,
    to: &str,
    registry: &Registry,
) -> TestGenResult<(String, Option<ModelName>)> {
    let unresolved = || TestGenError::UnresolvedTarget {
        test: test_name.to_string(),
        target: to.to_string(),
    };
    match parse_reference(to).ok_or_else(unresolved)? {
        Reference::Model { name } => {
            let model = registry.get(&name).ok_or_else(unresolved)?;
            Ok((model.relation_name(), Some(name)))
        }
        Reference::Source { group, table } => registry
            .source_relation(&group, &table)
            .map(|relation| (relation, None))
            .ok_or_else(unresolved),
    }
}

/// SQL for a `TestType` against a relation; returns the relationship target model too
fn generate_sql_for_test_type(
    test_name: &str,
    test_type: &TestType,
    table: &str,
    column: Option<&str>,
    registry: &Registry,
) -> TestGenResult<(String, Option<ModelName>)> {
    let column_or_empty = column.unwrap_or_default();
    let sql = match test_type {
        TestType::Unique => generate_unique_test(table, column_or_empty),
        TestType::NotNull => generate_not_null_test(table, column_or_empty),
        TestType::AcceptedValues { values, quote } => {
            generate_accepted_values_test(table, column_or_empty, values, *quote)
        }
        TestType::Expression { expression } => generate_expression_test(table, expression),
        TestType::Relationship { to, field } => {
            let (ref_table, target) = resolve_target(test_name, to, registry)?;
            let ref_column = field.as_deref().unwrap_or(column_or_empty);
            return Ok((
                generate_relationship_test(table, column_or_empty, &ref_table, ref_column),
                target,
            ));
        }
    };
    Ok((sql, None))
}

/// Assertion for a test declared on a model or one of its columns
pub fn generate_schema_assertion(
    test: &SchemaTest,
    registry: &Registry,
) -> TestGenResult<Assertion> {
    let name = test.name();
    let model = registry
        .get(&test.model)
        .ok_or_else(|| TestGenError::UnknownModel {
            test: name.clone(),
            model: test.model.to_string(),
        })?;

    let (sql, reference_target) = generate_sql_for_test_type(
        &name,
        &test.test_type,
        &model.relation_name(),
        test.column.as_deref(),
        registry,
    )?;

    let mut requires = vec![test.model.clone()];
    if let Some(target) = reference_target.as_ref().filter(|t| **t != test.model) {
        requires.push(target.clone());
    }

    Ok(Assertion {
        name,
        model: Some(test.model.clone()),
        column: test.column.clone(),
        kind: AssertionKind::from(&test.test_type),
        severity: test.severity,
        sql,
        requires,
        reference_target,
    })
}

/// Assertion for a test declared on a source column
pub fn generate_source_assertion(
    test: &SourceTest,
    registry: &Registry,
) -> TestGenResult<Assertion> {
    let name = test.name();
    let relation = registry
        .source_relation(&test.source, &test.table)
        .ok_or_else(|| TestGenError::UnknownSource {
            test: name.clone(),
            source_name: test.source.clone(),
            table: test.table.clone(),
        })?;

    let (sql, reference_target) = generate_sql_for_test_type(
        &name,
        &test.test_type,
        &relation,
        Some(&test.column),
        registry,
    )?;

    Ok(Assertion {
        name,
        model: None,
        column: Some(test.column.clone()),
        kind: AssertionKind::from(&test.test_type),
        severity: test.severity,
        sql,
        requires: reference_target.iter().cloned().collect(),
        reference_target,
    })
}

/// Assertion for a standalone SQL test file
///
/// The template is rendered against every model and source of the registry;
/// a trailing `;` is dropped so the query can be wrapped for counting.
pub fn generate_singular_assertion(
    test: &SingularTest,
    registry: &Registry,
    vars: &HashMap<String, serde_yaml::Value>,
) -> TestGenResult<Assertion> {
    let bindings = Bindings::from_registry(registry).with_vars(vars);
    let rendered = render(&test.sql, &bindings).map_err(|source| TestGenError::Render {
        test: test.name.clone(),
        source,
    })?;
    let sql = rendered.trim().trim_end_matches(';').trim_end().to_string();

    let requires = extract_references(&test.sql)
        .into_iter()
        .filter_map(|r| r.model_name().cloned())
        .collect();

    Ok(Assertion {
        name: test.name.clone(),
        model: None,
        column: None,
        kind: AssertionKind::Singular,
        severity: TestSeverity::Error,
        sql,
        requires,
        reference_target: None,
    })
}

/// Every assertion of a registry: model tests in declaration order, then
/// source tests, then singular tests.
pub fn generate_assertions(
    registry: &Registry,
    singular_tests: &[SingularTest],
    vars: &HashMap<String, serde_yaml::Value>,
) -> TestGenResult<Vec<Assertion>> {
    let mut assertions = Vec::new();
    for test in registry.schema_tests() {
        assertions.push(generate_schema_assertion(test, registry)?);
    }
    for test in registry.source_tests() {
        assertions.push(generate_source_assertion(test, registry)?);
    }
    for test in singular_tests {
        assertions.push(generate_singular_assertion(test, registry, vars)?);
    }
    log::debug!("Generated {} assertions", assertions.len());
    Ok(assertions)
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
