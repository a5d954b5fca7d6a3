//! Assertion execution

use crate::generator::{Assertion, AssertionKind};
use serde::Serialize;
use sluice_core::model::TestSeverity;
use sluice_core::ModelName;
use sluice_db::Database;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Number of violating rows fetched for display
const SAMPLE_LIMIT: usize = 5;

/// Why an assertion was not executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The bound model was skipped or failed
    ModelNotMaterialized,
    /// A relationship target was skipped or failed
    MissingReferenceTarget,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ModelNotMaterialized => write!(f, "model-not-materialized"),
            SkipReason::MissingReferenceTarget => write!(f, "missing-reference-target"),
        }
    }
}

/// Outcome of one assertion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssertionStatus {
    Passed,
    /// Query returned `failures` violating rows
    Failed { failures: usize },
    Skipped { reason: SkipReason },
    /// Query could not run
    Error { message: String },
}

/// Result of a single assertion
#[derive(Debug, Clone, Serialize)]
pub struct AssertionResult {
    /// Test name
    pub name: String,

    /// Model the assertion is bound to
    pub model: Option<ModelName>,

    /// Column tested
    pub column: Option<String>,

    pub kind: AssertionKind,

    pub severity: TestSeverity,

    #[serde(flatten)]
    pub status: AssertionStatus,

    /// Sample violating rows (up to 5, formatted)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_failures: Vec<String>,

    /// Execution time in seconds
    pub duration_secs: f64,
}

impl AssertionResult {
    fn new(assertion: &Assertion, status: AssertionStatus, duration: Duration) -> Self {
        Self {
            name: assertion.name.clone(),
            model: assertion.model.clone(),
            column: assertion.column.clone(),
            kind: assertion.kind,
            severity: assertion.severity,
            status,
            sample_failures: Vec::new(),
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == AssertionStatus::Passed
    }

    /// A failure or error that fails the command
    pub fn is_blocking(&self) -> bool {
        match self.status {
            AssertionStatus::Failed { .. } => self.severity == TestSeverity::Error,
            AssertionStatus::Error { .. } => true,
            AssertionStatus::Passed | AssertionStatus::Skipped { .. } => false,
        }
    }
}

/// Summary of an assertion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    /// Failures with severity `error`
    pub failed: usize,
    /// Failures with severity `warn`
    pub warned: usize,
    pub skipped: usize,
    pub errors: usize,
    pub duration_secs: f64,
}

impl TestSummary {
    /// Create a summary from assertion results
    pub fn from_results(results: &[AssertionResult], duration: Duration) -> Self {
        let mut summary = Self {
            total: results.len(),
            duration_secs: duration.as_secs_f64(),
            ..Self::default()
        };
        for result in results {
            match &result.status {
                AssertionStatus::Passed => summary.passed += 1,
                AssertionStatus::Failed { .. } if result.severity == TestSeverity::Warn => {
                    summary.warned += 1
                }
                AssertionStatus::Failed { .. } => summary.failed += 1,
                AssertionStatus::Skipped { .. } => summary.skipped += 1,
                AssertionStatus::Error { .. } => summary.errors += 1,
            }
        }
        summary
    }

    /// True when nothing failed the command
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Test runner for executing assertions
pub struct TestRunner<'a> {
    db: &'a dyn Database,
}

impl<'a> TestRunner<'a> {
    /// Create a new test runner
    pub fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    /// Decide whether an assertion can run given the materialized models
    pub fn skip_reason(
        assertion: &Assertion,
        materialized: &HashSet<ModelName>,
    ) -> Option<SkipReason> {
        if let Some(target) = &assertion.reference_target {
            if !materialized.contains(target) {
                return Some(SkipReason::MissingReferenceTarget);
            }
        }
        assertion
            .requires
            .iter()
            .any(|m| !materialized.contains(m))
            .then_some(SkipReason::ModelNotMaterialized)
    }

    /// Run a single assertion
    pub async fn run_assertion(
        &self,
        assertion: &Assertion,
        materialized: &HashSet<ModelName>,
    ) -> AssertionResult {
        if let Some(reason) = Self::skip_reason(assertion, materialized) {
            log::debug!("Skipping {}: {}", assertion.name, reason);
            return AssertionResult::new(
                assertion,
                AssertionStatus::Skipped { reason },
                Duration::ZERO,
            );
        }

        let start = Instant::now();
        match self.db.query_count(&assertion.sql).await {
            Ok(0) => AssertionResult::new(assertion, AssertionStatus::Passed, start.elapsed()),
            Ok(failures) => {
                let sample_failures = self
                    .db
                    .query_sample_rows(&assertion.sql, SAMPLE_LIMIT)
                    .await
                    .unwrap_or_else(|e| {
                        log::warn!("Could not sample failing rows for {}: {}", assertion.name, e);
                        Vec::new()
                    });
                let mut result = AssertionResult::new(
                    assertion,
                    AssertionStatus::Failed { failures },
                    start.elapsed(),
                );
                result.sample_failures = sample_failures;
                result
            }
            Err(e) => AssertionResult::new(
                assertion,
                AssertionStatus::Error {
                    message: e.to_string(),
                },
                start.elapsed(),
            ),
        }
    }

    /// Run assertions in order against the set of materialized models.
    ///
    /// Every assertion yields exactly one result; none is silently dropped.
    pub async fn run_assertions(
        &self,
        assertions: &[Assertion],
        materialized: &HashSet<ModelName>,
    ) -> Vec<AssertionResult> {
        let mut results = Vec::with_capacity(assertions.len());
        for assertion in assertions {
            results.push(self.run_assertion(assertion, materialized).await);
        }
        results
    }

    /// Run assertions and return summary
    pub async fn run_all(
        &self,
        assertions: &[Assertion],
        materialized: &HashSet<ModelName>,
    ) -> (Vec<AssertionResult>, TestSummary) {
        let start = Instant::now();
        let results = self.run_assertions(assertions, materialized).await;
        let summary = TestSummary::from_results(&results, start.elapsed());
        (results, summary)
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
