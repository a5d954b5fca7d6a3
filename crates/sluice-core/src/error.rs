//! Error types for sluice-core

use thiserror::Error;

/// Core error type for Sluice
///
/// Every variant here is a configuration-time error: it is raised while
/// loading, resolving, or ordering the graph, before anything is written to the
/// warehouse.
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// E003: Invalid project configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E005: Model not found
    #[error("[E005] Model not found: {name}")]
    ModelNotFound { name: String },

    /// E006: Invalid model configuration
    #[error("[E006] Invalid config for model '{model}': {key} = '{value}' ({reason})")]
    InvalidConfig {
        model: String,
        key: String,
        value: String,
        reason: String,
    },

    /// E007: Cycle in the model graph
    #[error("[E007] Cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// E008: Two definitions share a name
    #[error("[E008] Duplicate model name: {name}")]
    DuplicateModelName { name: String },

    /// E009: Invalid selector
    #[error("[E009] Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// E010: A model or test references something that is not declared
    #[error("[E010] Unresolved reference in '{model}': {reference} is not declared")]
    UnresolvedReference { model: String, reference: String },

    /// E011: A name that must be non-empty was empty
    #[error("[E011] Empty name: {context}")]
    EmptyName { context: String },

    /// SRC001: Failed to parse a source file
    #[error("[SRC001] Failed to parse source file {path}: {details}")]
    SourceParseError { path: String, details: String },

    /// SRC002: Duplicate source group
    #[error("[SRC002] Duplicate source name '{name}'")]
    SourceDuplicateName { name: String },

    /// SRC003: Duplicate table in a source group
    #[error("[SRC003] Duplicate table '{table}' in source '{source_name}'")]
    SourceDuplicateTable { table: String, source_name: String },

    /// SRC004: Source group without tables
    #[error("[SRC004] Source '{name}' has no tables defined")]
    SourceEmptyTables { name: String },

    /// T001: Singular test file could not be used
    #[error("[T001] Invalid test '{name}': {message}")]
    TestValidationError { name: String, message: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: Schema/YAML parse error
    #[error("[E015] Schema parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Short machine-readable kind used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::DuplicateModelName { .. } => "DuplicateModelName",
            CoreError::InvalidConfig { .. }
            | CoreError::ConfigInvalid { .. }
            | CoreError::SourceDuplicateName { .. }
            | CoreError::SourceDuplicateTable { .. }
            | CoreError::SourceEmptyTables { .. } => "InvalidConfig",
            CoreError::UnresolvedReference { .. } => "UnresolvedReference",
            CoreError::CyclicDependency { .. } => "CyclicDependency",
            _ => "ProjectError",
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
