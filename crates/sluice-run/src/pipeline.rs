//! The end-to-end build pipeline
//!
//! `prepare` → `run` → `test`. Every configuration-time error surfaces from
//! [`Pipeline::prepare`], so a pipeline value that exists is known to be
//! buildable.

use crate::compile::{CompiledModel, Manifest};
use crate::error::{RunError, RunResult};
use crate::materialize::Materializer;
use crate::project::definitions_with_inline_config;
use crate::report::RunReport;
use crate::scheduler::{ModelResult, ModelStatus, RunObserver, Scheduler};
use chrono::Utc;
use sluice_core::resolver::{resolve_all, resolve_template, Reference, ResolvedGraph};
use sluice_core::{
    ModelDag, ModelDefaults, ModelDefinition, ModelName, Project, Registry, SingularTest,
    SourceGroup,
};
use sluice_db::Database;
use sluice_jinja::{render, Bindings};
use sluice_test::{generate_assertions, Assertion, AssertionResult, TestRunner, TestSummary};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Options for `run` and `build`
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker pool size (minimum 1)
    pub threads: usize,
    /// Model selectors (`name`, `+name`, `name+`); empty runs everything
    pub select: Vec<String>,
}

impl RunOptions {
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            select: Vec::new(),
        }
    }

    pub fn with_select(mut self, select: Vec<String>) -> Self {
        self.select = select;
        self
    }
}

/// A validated, ordered project ready to execute
#[derive(Debug)]
pub struct Pipeline {
    project_name: String,
    registry: Registry,
    resolved: ResolvedGraph,
    dag: ModelDag,
    singular_tests: Vec<SingularTest>,
    vars: HashMap<String, serde_yaml::Value>,
}

impl Pipeline {
    /// Validate definitions, resolve references and order the graph.
    ///
    /// Fails with the first `DuplicateModelName`, `InvalidConfig`,
    /// `UnresolvedReference` or `CyclicDependency`; nothing is executed.
    pub fn prepare(
        definitions: Vec<ModelDefinition>,
        sources: Vec<SourceGroup>,
        singular_tests: Vec<SingularTest>,
        defaults: &ModelDefaults,
        vars: HashMap<String, serde_yaml::Value>,
    ) -> RunResult<Self> {
        let registry = Registry::load_with_defaults(definitions, sources, defaults)?;
        let resolved = resolve_all(&registry)?;
        for test in &singular_tests {
            resolve_template(&test.name, &test.sql, &registry)?;
        }
        let dag = ModelDag::build(&registry, &resolved)?;

        Ok(Self {
            project_name: "sluice".to_string(),
            registry,
            resolved,
            dag,
            singular_tests,
            vars,
        })
    }

    /// Prepare a loaded project directory
    pub fn from_project(project: &Project) -> RunResult<Self> {
        let definitions = definitions_with_inline_config(project)?;
        let mut pipeline = Self::prepare(
            definitions,
            project.sources.clone(),
            project.singular_tests.clone(),
            &project.model_defaults(),
            project.config.vars.clone(),
        )?;
        pipeline.project_name = project.config.name.clone();
        Ok(pipeline)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dag(&self) -> &ModelDag {
        &self.dag
    }

    pub fn resolved(&self) -> &ResolvedGraph {
        &self.resolved
    }

    /// Selected models in execution order; no selectors selects everything
    pub fn select<S: AsRef<str>>(&self, selectors: &[S]) -> RunResult<Vec<ModelName>> {
        if selectors.is_empty() {
            return Ok(self.dag.topological_order().to_vec());
        }
        Ok(self.dag.select_many(selectors)?)
    }

    /// Render every model against its configured relations
    pub fn compile(&self) -> RunResult<Manifest> {
        let bindings = Bindings::from_registry(&self.registry).with_vars(&self.vars);
        let mut models = Vec::with_capacity(self.registry.len());

        for name in self.dag.topological_order() {
            let model = self
                .registry
                .get(name)
                .ok_or_else(|| RunError::Internal(format!("model '{}' not in registry", name)))?;
            let sql = render(&model.raw_sql, &bindings).map_err(|source| RunError::Template {
                model: name.to_string(),
                source,
            })?;
            let sources = self
                .resolved
                .edges_from(name)
                .filter_map(|e| match &e.to {
                    Reference::Source { group, table } => Some(format!("{}.{}", group, table)),
                    Reference::Model { .. } => None,
                })
                .collect();

            models.push(CompiledModel {
                name: name.clone(),
                kind: model.kind,
                materialized: model.materialization,
                relation: model.relation_name(),
                depends_on: self.dag.dependencies(name),
                sources,
                tags: model.tags.clone(),
                raw_checksum: model.sql_checksum(),
                sql_checksum: CompiledModel::checksum_of(&sql),
                sql,
            });
        }

        Ok(Manifest {
            project_name: self.project_name.clone(),
            compiled_at: Utc::now(),
            execution_order: self.dag.topological_order().to_vec(),
            edges: self.resolved.edges.clone(),
            models,
        })
    }

    /// Assertions for a selection, or all of them.
    ///
    /// With a selection, model assertions follow their model; singular tests
    /// are kept when they read a selected model; source tests are dropped.
    pub fn assertions(&self, selection: Option<&[ModelName]>) -> RunResult<Vec<Assertion>> {
        let all = generate_assertions(&self.registry, &self.singular_tests, &self.vars)?;
        let Some(selection) = selection else {
            return Ok(all);
        };
        let selected: HashSet<&ModelName> = selection.iter().collect();
        Ok(all
            .into_iter()
            .filter(|a| match &a.model {
                Some(model) => selected.contains(model),
                None => a.requires.iter().any(|m| selected.contains(m)),
            })
            .collect())
    }

    /// Materialize the selected models on a bounded worker pool
    pub async fn run(
        &self,
        db: Arc<dyn Database>,
        options: &RunOptions,
        observer: Arc<dyn RunObserver>,
    ) -> RunResult<Vec<ModelResult>> {
        let selection = self.select(&options.select)?;
        let materializer = Arc::new(Materializer::new(db, &self.registry, &self.vars));
        Scheduler::new(options.threads)
            .run(&self.registry, &self.dag, &selection, materializer, observer)
            .await
    }

    /// Models whose relation currently exists in the database
    pub async fn existing_models(&self, db: &dyn Database) -> RunResult<HashSet<ModelName>> {
        let mut existing = HashSet::new();
        for model in self.registry.models() {
            if db.relation_exists(&model.relation_name()).await? {
                existing.insert(model.name.clone());
            }
        }
        Ok(existing)
    }

    /// Run assertions against the given set of materialized models
    pub async fn test(
        &self,
        db: &dyn Database,
        materialized: &HashSet<ModelName>,
        selection: Option<&[ModelName]>,
    ) -> RunResult<(Vec<AssertionResult>, TestSummary)> {
        let assertions = self.assertions(selection)?;
        Ok(TestRunner::new(db).run_all(&assertions, materialized).await)
    }

    /// Run, then test what was built
    ///
    /// Models outside the selection count as materialized when their
    /// relation already exists.
    pub async fn build(
        &self,
        db: Arc<dyn Database>,
        options: &RunOptions,
        observer: Arc<dyn RunObserver>,
    ) -> RunResult<RunReport> {
        let start = Instant::now();
        let selection = self.select(&options.select)?;
        let models = self.run(Arc::clone(&db), options, observer).await?;

        let mut materialized: HashSet<ModelName> = models
            .iter()
            .filter(|r| r.status == ModelStatus::Materialized)
            .map(|r| r.model.clone())
            .collect();
        if !options.select.is_empty() {
            let selected: HashSet<&ModelName> = selection.iter().collect();
            for name in self.existing_models(db.as_ref()).await? {
                if !selected.contains(&name) {
                    materialized.insert(name);
                }
            }
        }

        let scope = (!options.select.is_empty()).then_some(selection.as_slice());
        let (assertions, summary) = self.test(db.as_ref(), &materialized, scope).await?;
        Ok(RunReport::new(
            "build",
            start.elapsed(),
            models,
            assertions,
            Some(summary),
        ))
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
