//! Text rendering of run and test results

use indicatif::{ProgressBar, ProgressStyle};
use sluice_core::ModelName;
use sluice_run::{ModelResult, ModelStatus, RunObserver};
use sluice_test::{AssertionResult, AssertionStatus, TestSummary};

/// Progress bar driven by scheduler events
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub(crate) fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_with_message("Complete");
    }
}

impl RunObserver for ProgressObserver {
    fn on_start(&self, model: &ModelName) {
        self.bar.set_message(format!("Running: {}", model));
    }

    fn on_finish(&self, result: &ModelResult) {
        self.bar.println(format_model_line(result));
        self.bar.inc(1);
    }
}

/// One line per model, as printed during a run
pub(crate) fn format_model_line(result: &ModelResult) -> String {
    match result.status {
        ModelStatus::Materialized => format!(
            "  ✓ {} ({}) [{}ms]",
            result.model,
            result.materialization,
            (result.duration_secs * 1000.0).round() as u64
        ),
        ModelStatus::Failed => format!(
            "  ✗ {} - {}",
            result.model,
            result.error.as_deref().unwrap_or("unknown error")
        ),
        ModelStatus::Skipped => match &result.skipped_because {
            Some(upstream) => format!("  - {} (skipped: upstream {} failed)", result.model, upstream),
            None => format!("  - {} (skipped)", result.model),
        },
    }
}

/// One line per assertion, plus sample rows for failures
pub(crate) fn format_assertion(result: &AssertionResult) -> Vec<String> {
    let millis = (result.duration_secs * 1000.0).round() as u64;
    let mut lines = Vec::new();
    match &result.status {
        AssertionStatus::Passed => lines.push(format!("  ✓ {} [{}ms]", result.name, millis)),
        AssertionStatus::Skipped { reason } => {
            lines.push(format!("  - {} (skipped: {})", result.name, reason))
        }
        AssertionStatus::Error { message } => {
            lines.push(format!("  ✗ {} - {} [{}ms]", result.name, message, millis))
        }
        AssertionStatus::Failed { failures } => {
            let marker = if result.is_blocking() { "✗" } else { "!" };
            lines.push(format!(
                "  {} {} ({} failures) [{}ms]",
                marker, result.name, failures, millis
            ));
            if !result.sample_failures.is_empty() {
                lines.push("    Sample failing rows:".to_string());
                for (i, row) in result.sample_failures.iter().enumerate() {
                    lines.push(format!("      {}. {}", i + 1, row));
                }
                if *failures > result.sample_failures.len() {
                    lines.push(format!(
                        "      ... and {} more",
                        failures - result.sample_failures.len()
                    ));
                }
            }
        }
    }
    lines
}

pub(crate) fn print_assertions(results: &[AssertionResult]) {
    for result in results {
        for line in format_assertion(result) {
            println!("{}", line);
        }
    }
}

pub(crate) fn format_model_summary(results: &[ModelResult]) -> String {
    let count = |status: ModelStatus| results.iter().filter(|r| r.status == status).count();
    format!(
        "Completed: {} materialized, {} failed, {} skipped",
        count(ModelStatus::Materialized),
        count(ModelStatus::Failed),
        count(ModelStatus::Skipped)
    )
}

pub(crate) fn format_test_summary(summary: &TestSummary) -> String {
    let mut line = format!(
        "Passed: {}, Failed: {}, Skipped: {}",
        summary.passed,
        summary.failed + summary.errors,
        summary.skipped
    );
    if summary.warned > 0 {
        line.push_str(&format!(", Warnings: {}", summary.warned));
    }
    line
}

#[cfg(test)]
#[path = "output_test.rs"]
mod tests;
