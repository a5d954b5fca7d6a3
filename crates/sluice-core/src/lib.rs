//! sluice-core - Core library for Sluice
//!
//! This crate holds the build graph: model and source definitions, the
//! [`Registry`] they are loaded into, syntactic reference resolution, DAG
//! construction with deterministic topological ordering, and the project
//! loader used by the CLI.

pub mod checksum;
pub mod config;
pub mod dag;
pub mod error;
pub mod model;
pub mod model_name;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod sql_utils;
pub mod surrogate;

pub use checksum::compute_checksum;
pub use config::{Config, DbType, Materialization};
pub use dag::ModelDag;
pub use error::{CoreError, CoreResult};
pub use model::{
    ColumnDef, Model, ModelDefaults, ModelDefinition, ModelKind, SchemaTest, SingularTest,
    TestDefinition, TestParams, TestSeverity, TestType,
};
pub use model_name::ModelName;
pub use project::Project;
pub use registry::Registry;
pub use resolver::{
    extract_references, parse_reference, resolve, resolve_all, resolve_template, Edge,
    Reference, ResolvedGraph,
};
pub use source::{SourceColumn, SourceGroup, SourceTable, SourceTest};
pub use surrogate::{surrogate_key, surrogate_key_sql};
