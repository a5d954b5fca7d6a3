//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;
use sluice_core::Project;
use sluice_db::{Database, DuckDbBackend};
use sluice_run::{Pipeline, RunReport};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExitCode(pub(crate) u8);

impl ExitCode {
    /// Project could not be loaded, resolved or ordered
    pub(crate) const CONFIG_ERROR: ExitCode = ExitCode(1);
    /// At least one blocking assertion failed or errored
    pub(crate) const ASSERTION_FAILURES: ExitCode = ExitCode(2);
    /// At least one model failed to materialize
    pub(crate) const MODEL_FAILURES: ExitCode = ExitCode(4);

    /// Exit code for a finished report, if it is a failure
    pub(crate) fn for_report(report: &RunReport) -> Option<ExitCode> {
        if report.has_model_failures() {
            Some(Self::MODEL_FAILURES)
        } else if report.has_assertion_failures() {
            Some(Self::ASSERTION_FAILURES)
        } else {
            None
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main prints nothing for it
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load a project from the directory specified in global CLI arguments.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let project =
        Project::load(Path::new(&global.project_dir)).context("Failed to load project")?;
    if global.verbose {
        eprintln!(
            "[verbose] Loaded project '{}' from {}",
            project.config.name,
            project.root.display()
        );
    }
    Ok(project)
}

/// Validate, resolve and order a loaded project
pub(crate) fn prepare_pipeline(project: &Project) -> Result<Pipeline> {
    Pipeline::from_project(project).context("Failed to prepare project")
}

/// Open the warehouse, preferring `--database` / `SLUICE_DATABASE`
pub(crate) fn create_database_connection(
    project: &Project,
    global: &GlobalArgs,
) -> Result<Arc<dyn Database>> {
    let db_path = global
        .database
        .clone()
        .unwrap_or_else(|| project.database_path());
    if global.verbose {
        eprintln!("[verbose] Using database: {}", db_path);
    }
    if db_path != ":memory:" {
        if let Some(parent) = Path::new(&db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let db: Arc<dyn Database> =
        Arc::new(DuckDbBackend::new(&db_path).context("Failed to connect to database")?);
    Ok(db)
}

/// Worker pool size from the flag or sluice.yml
pub(crate) fn resolve_threads(flag: Option<usize>, project: &Project) -> usize {
    flag.unwrap_or(project.config.threads).max(1)
}

/// Write results as pretty JSON, creating parent directories.
pub(crate) fn write_json_results<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create target directory")?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Persist a report and turn failures into the matching exit code
pub(crate) fn finish_report(project: &Project, report: &RunReport, global: &GlobalArgs) -> Result<()> {
    let path = project.run_results_path();
    report
        .write(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if global.verbose {
        eprintln!("[verbose] Wrote {}", path.display());
    }
    match ExitCode::for_report(report) {
        Some(code) => Err(code.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
