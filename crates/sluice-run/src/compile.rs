//! Compiled SQL and the compile manifest

use chrono::{DateTime, Utc};
use serde::Serialize;
use sluice_core::resolver::{Edge, Reference};
use sluice_core::{compute_checksum, Materialization, ModelKind, ModelName};

/// A model rendered against its configured relations
#[derive(Debug, Clone, Serialize)]
pub struct CompiledModel {
    pub name: ModelName,
    pub kind: ModelKind,
    pub materialized: Materialization,
    /// Relation the model builds into
    pub relation: String,
    /// Upstream models, in declaration order
    pub depends_on: Vec<ModelName>,
    /// `group.table` of every source read
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// SHA-256 of the template body
    pub raw_checksum: String,
    /// SHA-256 of the rendered SQL
    pub sql_checksum: String,
    /// Rendered SQL
    #[serde(skip)]
    pub sql: String,
}

impl CompiledModel {
    /// Relative path of the compiled file under the compiled directory
    pub fn file_name(&self) -> String {
        format!("{}.sql", self.name)
    }

    pub(crate) fn checksum_of(sql: &str) -> String {
        compute_checksum(sql)
    }
}

/// Everything `sluice compile` records about a project
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub project_name: String,
    pub compiled_at: DateTime<Utc>,
    pub execution_order: Vec<ModelName>,
    pub edges: Vec<Edge>,
    pub models: Vec<CompiledModel>,
}

impl Manifest {
    /// Distinct sources read anywhere in the project
    pub fn source_references(&self) -> Vec<&Reference> {
        let mut found: Vec<&Reference> = Vec::new();
        for edge in &self.edges {
            if matches!(edge.to, Reference::Source { .. }) && !found.contains(&&edge.to) {
                found.push(&edge.to);
            }
        }
        found
    }
}
