//! Model materialization
//!
//! A model is rendered against the relation handles of its upstream models
//! and then created as a view or table. Views and tables are both replaced
//! on every run.

use crate::error::{MaterializeCause, RunError, RunResult};
use serde::Serialize;
use sluice_core::{Materialization, Model, ModelName, Registry};
use sluice_db::{Database, RelationKind};
use sluice_jinja::{render, Bindings};
use std::collections::HashMap;
use std::sync::Arc;

/// A relation produced (or assumed to exist) for a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationHandle {
    pub model: ModelName,
    /// Fully-qualified `schema.name`
    pub relation: String,
    pub materialization: Materialization,
}

impl RelationHandle {
    /// Handle for a model's configured relation without building it
    pub fn assumed(model: &Model) -> Self {
        Self {
            model: model.name.clone(),
            relation: model.relation_name(),
            materialization: model.materialization,
        }
    }
}

/// Renders models and issues their create statements
pub struct Materializer {
    db: Arc<dyn Database>,
    base: Bindings,
}

impl Materializer {
    /// Sources of `registry` and project `vars` are bound for every model;
    /// model references are bound per call from upstream handles.
    pub fn new(
        db: Arc<dyn Database>,
        registry: &Registry,
        vars: &HashMap<String, serde_yaml::Value>,
    ) -> Self {
        Self {
            db,
            base: Bindings::sources_only(registry).with_vars(vars),
        }
    }

    /// Bindings visible to a model with the given upstream relations
    pub fn bindings_for(&self, upstream: &[RelationHandle]) -> Bindings {
        let mut bindings = self.base.clone();
        for handle in upstream {
            bindings.bind_model(handle.model.as_str(), handle.relation.as_str());
        }
        bindings
    }

    /// Render a model's final SQL
    pub fn compile(&self, model: &Model, upstream: &[RelationHandle]) -> RunResult<String> {
        render(&model.raw_sql, &self.bindings_for(upstream)).map_err(|e| {
            RunError::Materialization {
                model: model.name.to_string(),
                source: MaterializeCause::Render(e),
            }
        })
    }

    /// Build a model and return the handle of the relation it produced
    pub async fn materialize(
        &self,
        model: &Model,
        upstream: &[RelationHandle],
    ) -> RunResult<RelationHandle> {
        let sql = self.compile(model, upstream)?;
        let relation = model.relation_name();
        self.create(model, &relation, &sql)
            .await
            .map_err(|e| RunError::Materialization {
                model: model.name.to_string(),
                source: MaterializeCause::Database(e),
            })?;

        log::debug!("Materialized {} as {}", relation, model.materialization);
        Ok(RelationHandle {
            model: model.name.clone(),
            relation,
            materialization: model.materialization,
        })
    }

    async fn create(&self, model: &Model, relation: &str, sql: &str) -> sluice_db::DbResult<()> {
        self.db.create_schema_if_not_exists(&model.schema).await?;

        let wanted = match model.materialization {
            Materialization::View => RelationKind::View,
            Materialization::Table => RelationKind::Table,
        };
        // CREATE OR REPLACE cannot change a view into a table or back
        if let Some(existing) = self.db.relation_kind(relation).await? {
            if existing != wanted {
                self.db.drop_if_exists(relation).await?;
            }
        }

        match model.materialization {
            Materialization::View => self.db.create_view_as(relation, sql, true).await,
            Materialization::Table => self.db.create_table_as(relation, sql, true).await,
        }
    }
}

#[cfg(test)]
#[path = "materialize_test.rs"]
mod tests;
