//! Dependency-aware worker pool
//!
//! A model is dispatched the moment every upstream model in the run has been
//! materialized, including upstream models reached through ones outside the
//! run. A failure is terminal for that model and marks all of its
//! descendants as skipped; independent branches keep running. At most
//! `threads` models are being built at any time.

use crate::error::{RunError, RunResult};
use crate::materialize::{Materializer, RelationHandle};
use serde::Serialize;
use sluice_core::{Materialization, ModelDag, ModelName, Registry};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Terminal state of a model in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Materialized,
    /// An upstream model failed or was skipped
    Skipped,
    /// The model's own build failed
    Failed,
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelStatus::Materialized => write!(f, "materialized"),
            ModelStatus::Skipped => write!(f, "skipped"),
            ModelStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Run result for a single model
#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub model: ModelName,
    pub status: ModelStatus,
    pub materialization: Materialization,
    /// Relation produced, when materialized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failed model that caused the skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_because: Option<ModelName>,
}

/// Hooks for progress reporting
pub trait RunObserver: Send + Sync {
    fn on_start(&self, _model: &ModelName) {}
    fn on_finish(&self, _result: &ModelResult) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Completion bookkeeping shared between the dispatcher and workers
#[derive(Default)]
struct Bookkeeping {
    /// Transitive upstream models in the run that have not finished
    remaining: HashMap<ModelName, usize>,
    results: HashMap<ModelName, ModelResult>,
    handles: HashMap<ModelName, RelationHandle>,
}

/// Bounded worker pool over a [`ModelDag`]
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    threads: usize,
}

impl Scheduler {
    /// `threads` below 1 is raised to 1
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Materialize `selection` (a subset of `dag`, any order) and return one
    /// result per selected model, in topological order.
    ///
    /// Upstream models outside the selection are assumed to exist already.
    pub async fn run(
        &self,
        registry: &Registry,
        dag: &ModelDag,
        selection: &[ModelName],
        materializer: Arc<Materializer>,
        observer: Arc<dyn RunObserver>,
    ) -> RunResult<Vec<ModelResult>> {
        let selected: HashSet<&ModelName> = selection.iter().collect();
        let order: Vec<ModelName> = dag
            .topological_order()
            .iter()
            .filter(|m| selected.contains(m))
            .cloned()
            .collect();
        let position: HashMap<&ModelName, usize> =
            order.iter().enumerate().map(|(i, m)| (m, i)).collect();

        let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
        let mut book = Bookkeeping::default();
        for (i, name) in order.iter().enumerate() {
            let pending = dag
                .ancestors(name)
                .iter()
                .filter(|a| selected.contains(a))
                .count();
            if pending == 0 {
                ready.push(Reverse(i));
            }
            book.remaining.insert(name.clone(), pending);
        }
        let book = Arc::new(Mutex::new(book));
        let semaphore = Arc::new(Semaphore::new(self.threads));
        let mut workers: JoinSet<ModelName> = JoinSet::new();
        let mut dispatched: HashSet<ModelName> = HashSet::new();

        log::debug!(
            "Scheduling {} models on {} threads",
            order.len(),
            self.threads
        );

        loop {
            while let Some(Reverse(i)) = ready.pop() {
                let name = order[i].clone();
                if !dispatched.insert(name.clone()) {
                    continue;
                }
                let model = registry
                    .get(&name)
                    .ok_or_else(|| RunError::Internal(format!("model '{}' not in registry", name)))?
                    .clone();

                let upstream: Vec<RelationHandle> = {
                    let guard = book.lock().unwrap_or_else(|p| p.into_inner());
                    dag.dependencies(&name)
                        .iter()
                        .filter_map(|dep| {
                            if selected.contains(dep) {
                                guard.handles.get(dep).cloned()
                            } else {
                                registry.get(dep).map(RelationHandle::assumed)
                            }
                        })
                        .collect()
                };

                let semaphore = Arc::clone(&semaphore);
                let materializer = Arc::clone(&materializer);
                let observer = Arc::clone(&observer);
                let book = Arc::clone(&book);
                workers.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    observer.on_start(&model.name);
                    let start = Instant::now();
                    let outcome = materializer.materialize(&model, &upstream).await;
                    let duration_secs = start.elapsed().as_secs_f64();

                    let result = match outcome {
                        Ok(handle) => {
                            let result = ModelResult {
                                model: model.name.clone(),
                                status: ModelStatus::Materialized,
                                materialization: model.materialization,
                                relation: Some(handle.relation.clone()),
                                duration_secs,
                                error: None,
                                skipped_because: None,
                            };
                            book.lock()
                                .unwrap_or_else(|p| p.into_inner())
                                .handles
                                .insert(model.name.clone(), handle);
                            result
                        }
                        Err(e) => {
                            log::warn!("{}", e);
                            ModelResult {
                                model: model.name.clone(),
                                status: ModelStatus::Failed,
                                materialization: model.materialization,
                                relation: None,
                                duration_secs,
                                error: Some(e.to_string()),
                                skipped_because: None,
                            }
                        }
                    };
                    observer.on_finish(&result);
                    book.lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .results
                        .insert(model.name.clone(), result);
                    model.name
                });
            }

            let finished = match workers.join_next().await {
                None => break,
                Some(Ok(name)) => name,
                Some(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Some(Err(e)) => return Err(RunError::Internal(format!("worker cancelled: {e}"))),
            };

            let mut guard = book.lock().unwrap_or_else(|p| p.into_inner());
            let succeeded = guard
                .results
                .get(&finished)
                .is_some_and(|r| r.status == ModelStatus::Materialized);

            for descendant in dag.descendants(&finished) {
                if !selected.contains(&descendant)
                    || dispatched.contains(&descendant)
                    || guard.results.contains_key(&descendant)
                {
                    continue;
                }
                if succeeded {
                    if let Some(pending) = guard.remaining.get_mut(&descendant) {
                        *pending = pending.saturating_sub(1);
                        if *pending == 0 {
                            ready.push(Reverse(position[&descendant]));
                        }
                    }
                } else {
                    let Some(model) = registry.get(&descendant) else {
                        continue;
                    };
                    log::debug!("Skipping {} (upstream {} did not build)", descendant, finished);
                    let result = ModelResult {
                        model: descendant.clone(),
                        status: ModelStatus::Skipped,
                        materialization: model.materialization,
                        relation: None,
                        duration_secs: 0.0,
                        error: None,
                        skipped_because: Some(finished.clone()),
                    };
                    observer.on_finish(&result);
                    guard.results.insert(descendant, result);
                }
            }
        }

        let mut guard = book.lock().unwrap_or_else(|p| p.into_inner());
        order
            .iter()
            .map(|name| {
                guard.results.remove(name).ok_or_else(|| {
                    RunError::Internal(format!("model '{}' never reached a terminal state", name))
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
