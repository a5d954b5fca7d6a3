//! Model registry
//!
//! The registry is the single, explicit value describing everything that can be
//! built in a run. It is constructed once from definitions and passed by
//! reference to every later stage.

use crate::error::{CoreError, CoreResult};
use crate::model::{Model, ModelDefaults, ModelDefinition, SchemaTest};
use crate::model_name::ModelName;
use crate::source::{SourceGroup, SourceTest};
use std::collections::HashMap;

/// Validated models and sources, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: Vec<Model>,
    index: HashMap<ModelName, usize>,
    sources: Vec<SourceGroup>,
    source_index: HashMap<String, usize>,
    source_tests: Vec<SourceTest>,
}

impl Registry {
    /// Build a registry with default materialization (`view`) and schema (`main`)
    pub fn load(definitions: Vec<ModelDefinition>, sources: Vec<SourceGroup>) -> CoreResult<Self> {
        Self::load_with_defaults(definitions, sources, &ModelDefaults::default())
    }

    /// Build a registry, applying project defaults to models that leave them unset
    ///
    /// Fails on the first duplicate model name or invalid config, in
    /// declaration order.
    pub fn load_with_defaults(
        definitions: Vec<ModelDefinition>,
        sources: Vec<SourceGroup>,
        defaults: &ModelDefaults,
    ) -> CoreResult<Self> {
        let mut models = Vec::with_capacity(definitions.len());
        let mut index = HashMap::with_capacity(definitions.len());

        for (position, def) in definitions.into_iter().enumerate() {
            let model = Model::from_definition(def, position, defaults)?;
            if index.contains_key(&model.name) {
                return Err(CoreError::DuplicateModelName {
                    name: model.name.to_string(),
                });
            }
            index.insert(model.name.clone(), position);
            models.push(model);
        }

        let mut source_index = HashMap::with_capacity(sources.len());
        let mut source_tests = Vec::new();
        for (position, group) in sources.iter().enumerate() {
            group.validate()?;
            if source_index.insert(group.name.clone(), position).is_some() {
                return Err(CoreError::SourceDuplicateName {
                    name: group.name.clone(),
                });
            }
            source_tests.extend(group.column_tests()?);
        }

        log::debug!(
            "Registry loaded: {} models, {} source groups",
            models.len(),
            sources.len()
        );

        Ok(Self {
            models,
            index,
            sources,
            source_index,
            source_tests,
        })
    }

    /// Models in declaration order
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Look up a model by name
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.index.get(name).map(|&i| &self.models[i])
    }

    /// Declaration index of a model
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Model names in declaration order
    pub fn model_names(&self) -> Vec<&ModelName> {
        self.models.iter().map(|m| &m.name).collect()
    }

    /// Source groups in declaration order
    pub fn sources(&self) -> &[SourceGroup] {
        &self.sources
    }

    /// Look up a source group by name
    pub fn source(&self, group: &str) -> Option<&SourceGroup> {
        self.source_index.get(group).map(|&i| &self.sources[i])
    }

    /// Qualified relation name for `source(group, table)`, if declared
    pub fn source_relation(&self, group: &str, table: &str) -> Option<String> {
        let group = self.source(group)?;
        group.table(table).map(|t| group.qualified_name(t))
    }

    /// Every model-bound assertion, in declaration order
    pub fn schema_tests(&self) -> impl Iterator<Item = &SchemaTest> {
        self.models.iter().flat_map(|m| m.tests.iter())
    }

    /// Assertions declared on source columns
    pub fn source_tests(&self) -> &[SourceTest] {
        &self.source_tests
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
