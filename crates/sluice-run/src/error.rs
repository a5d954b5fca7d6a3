//! Error types for sluice-run

use sluice_core::CoreError;
use sluice_db::DbError;
use sluice_jinja::JinjaError;
use sluice_test::TestGenError;
use thiserror::Error;

/// What went wrong while building one model
#[derive(Error, Debug)]
pub enum MaterializeCause {
    #[error("{0}")]
    Render(#[from] JinjaError),

    #[error("{0}")]
    Database(#[from] DbError),
}

/// Execution errors
#[derive(Error, Debug)]
pub enum RunError {
    /// Registry, resolution or graph error
    #[error(transparent)]
    Config(#[from] CoreError),

    /// Inline `config()` could not be read from a model template (R001)
    #[error("[R001] Model '{model}': {source}")]
    Template {
        model: String,
        #[source]
        source: JinjaError,
    },

    /// A model's create statement failed (R002)
    #[error("[R002] Materialization of '{model}' failed: {source}")]
    Materialization {
        model: String,
        #[source]
        source: MaterializeCause,
    },

    /// Assertions could not be generated (R003)
    #[error("[R003] {0}")]
    Assertions(#[from] TestGenError),

    /// Database error outside a single model build (R004)
    #[error("[R004] {0}")]
    Database(#[from] DbError),

    /// Report could not be written (R005)
    #[error("[R005] Failed to write {path}: {message}")]
    Report { path: String, message: String },

    /// Worker bookkeeping broke down (R006)
    #[error("[R006] Internal error: {0}")]
    Internal(String),
}

impl RunError {
    /// True for errors raised before anything was executed
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RunError::Config(_) | RunError::Template { .. } | RunError::Assertions(_)
        )
    }
}

/// Result type alias for RunError
pub type RunResult<T> = Result<T, RunError>;
