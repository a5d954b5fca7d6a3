//! Explicit reference bindings
//!
//! A [`Bindings`] value is the whole answer to "what does `ref('x')` mean here".
//! The materializer builds one per model from the relation handles of its
//! upstream models, so a template can only reach relations that were actually
//! produced in this run.

use crate::functions::yaml_to_json;
use sluice_core::resolver::Reference;
use sluice_core::Registry;
use std::collections::HashMap;

/// Relation names that `ref()` and `source()` render to, plus template variables
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    models: HashMap<String, String>,
    sources: HashMap<(String, String), String>,
    vars: HashMap<String, serde_json::Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every declared source table of a registry
    pub fn sources_only(registry: &Registry) -> Self {
        let mut bindings = Self::new();
        for group in registry.sources() {
            for table in &group.tables {
                bindings.bind_source(&group.name, &table.name, group.qualified_name(table));
            }
        }
        bindings
    }

    /// Bind every model and source of a registry to its configured relation.
    ///
    /// Used where nothing is executed (compile) or where models are assumed
    /// to already exist (assertions).
    pub fn from_registry(registry: &Registry) -> Self {
        let mut bindings = Self::sources_only(registry);
        for model in registry.models() {
            bindings.bind_model(model.name.as_str(), model.relation_name());
        }
        bindings
    }

    /// Attach template variables
    pub fn with_vars(mut self, vars: &HashMap<String, serde_yaml::Value>) -> Self {
        self.vars = vars
            .iter()
            .map(|(k, v)| (k.clone(), yaml_to_json(v)))
            .collect();
        self
    }

    /// Bind `ref(name)` to a relation
    pub fn bind_model(&mut self, name: impl Into<String>, relation: impl Into<String>) {
        self.models.insert(name.into(), relation.into());
    }

    /// Bind `source(group, table)` to a relation
    pub fn bind_source(
        &mut self,
        group: impl Into<String>,
        table: impl Into<String>,
        relation: impl Into<String>,
    ) {
        self.sources
            .insert((group.into(), table.into()), relation.into());
    }

    pub fn model_relation(&self, name: &str) -> Option<&str> {
        self.models.get(name).map(String::as_str)
    }

    pub fn source_relation(&self, group: &str, table: &str) -> Option<&str> {
        self.sources
            .get(&(group.to_string(), table.to_string()))
            .map(String::as_str)
    }

    /// Relation a reference is bound to, if any
    pub fn relation_for(&self, reference: &Reference) -> Option<&str> {
        match reference {
            Reference::Model { name } => self.model_relation(name),
            Reference::Source { group, table } => self.source_relation(group, table),
        }
    }

    pub fn vars(&self) -> &HashMap<String, serde_json::Value> {
        &self.vars
    }
}

#[cfg(test)]
#[path = "bindings_test.rs"]
mod tests;
