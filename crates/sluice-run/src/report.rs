//! Run report written to `target/run_results.json`
//!
//! The report is output only; nothing reads it back.

use crate::error::{RunError, RunResult};
use crate::scheduler::{ModelResult, ModelStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sluice_test::{AssertionResult, TestSummary};
use std::path::Path;
use std::time::Duration;

/// Model counts by terminal state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub total: usize,
    pub materialized: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ModelSummary {
    pub fn from_results(results: &[ModelResult]) -> Self {
        let count = |status: ModelStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            materialized: count(ModelStatus::Materialized),
            failed: count(ModelStatus::Failed),
            skipped: count(ModelStatus::Skipped),
        }
    }
}

/// Outcome of a run, test or build command
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub command: String,
    pub timestamp: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub model_summary: ModelSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_summary: Option<TestSummary>,
    pub models: Vec<ModelResult>,
    pub assertions: Vec<AssertionResult>,
}

impl RunReport {
    pub fn new(
        command: impl Into<String>,
        elapsed: Duration,
        models: Vec<ModelResult>,
        assertions: Vec<AssertionResult>,
        test_summary: Option<TestSummary>,
    ) -> Self {
        Self {
            command: command.into(),
            timestamp: Utc::now(),
            elapsed_secs: elapsed.as_secs_f64(),
            model_summary: ModelSummary::from_results(&models),
            test_summary,
            models,
            assertions,
        }
    }

    /// Any model failed to build (skips follow from failures)
    pub fn has_model_failures(&self) -> bool {
        self.model_summary.failed > 0
    }

    /// Any assertion failure or error that should fail the command
    pub fn has_assertion_failures(&self) -> bool {
        self.assertions.iter().any(AssertionResult::is_blocking)
    }

    /// Errors collected during the run, in result order
    pub fn errors(&self) -> Vec<String> {
        self.models
            .iter()
            .filter_map(|m| m.error.clone())
            .chain(self.assertions.iter().filter_map(|a| match &a.status {
                sluice_test::AssertionStatus::Error { message } => {
                    Some(format!("{}: {}", a.name, message))
                }
                _ => None,
            }))
            .collect()
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write(&self, path: &Path) -> RunResult<()> {
        let report_err = |message: String| RunError::Report {
            path: path.display().to_string(),
            message,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| report_err(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| report_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| report_err(e.to_string()))
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
