//! Project discovery and loading
//!
//! A project directory is the file-based way of producing the
//! [`ModelDefinition`]s and [`SourceGroup`]s the registry consumes.

mod loading;

use crate::config::Config;
use crate::model::{ModelDefaults, ModelDefinition, SingularTest};
use crate::source::SourceGroup;
use std::path::PathBuf;

/// A loaded project: configuration plus every declaration found on disk
#[derive(Debug)]
pub struct Project {
    /// Project root directory
    pub root: PathBuf,

    /// Project configuration
    pub config: Config,

    /// Model declarations, in sorted path order
    pub definitions: Vec<ModelDefinition>,

    /// Source groups, in sorted path order
    pub sources: Vec<SourceGroup>,

    /// Singular tests (standalone SQL test files)
    pub singular_tests: Vec<SingularTest>,
}

impl Project {
    /// Defaults every model inherits from sluice.yml
    pub fn model_defaults(&self) -> ModelDefaults {
        ModelDefaults {
            materialization: self.config.materialization,
            schema: self.config.schema.clone(),
        }
    }

    /// Get the target directory path
    pub fn target_dir(&self) -> PathBuf {
        self.config.target_path_absolute(&self.root)
    }

    /// Directory compiled SQL is written to
    pub fn compiled_dir(&self) -> PathBuf {
        self.target_dir().join("compiled").join(&self.config.name)
    }

    /// Get the manifest path
    pub fn manifest_path(&self) -> PathBuf {
        self.target_dir().join("manifest.json")
    }

    /// Path of the run report
    pub fn run_results_path(&self) -> PathBuf {
        self.target_dir().join("run_results.json")
    }

    /// Database path with relative paths resolved against the project root
    pub fn database_path(&self) -> String {
        self.config.database_path_absolute(&self.root)
    }
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
