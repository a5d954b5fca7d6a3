//! DAG building and topological sorting
//!
//! Nodes are models, indexed by declaration position. Edges run from a
//! dependency to its dependent, so a topological order lists dependencies
//! first. Among nodes that are ready at the same time, the one declared first
//! wins, which makes the order a pure function of the declarations.

use crate::error::{CoreError, CoreResult};
use crate::model_name::ModelName;
use crate::registry::Registry;
use crate::resolver::ResolvedGraph;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A directed acyclic graph of model dependencies
#[derive(Debug, Clone)]
pub struct ModelDag {
    graph: DiGraph<ModelName, ()>,
    node_map: HashMap<ModelName, NodeIndex>,
    order: Vec<ModelName>,
}

impl ModelDag {
    /// Build the DAG for a registry from its resolved edges
    pub fn build(registry: &Registry, resolved: &ResolvedGraph) -> CoreResult<Self> {
        let declarations: Vec<(String, Vec<String>)> = registry
            .models()
            .iter()
            .map(|model| {
                let deps = resolved
                    .edges_from(&model.name)
                    .filter_map(|e| e.to.model_name())
                    .map(|name| name.to_string())
                    .collect();
                (model.name.to_string(), deps)
            })
            .collect();
        Self::from_declarations(&declarations)
    }

    /// Build from `(model, dependencies)` pairs in declaration order.
    ///
    /// Dependencies that are not declared models (sources, external tables) are
    /// ignored for ordering.
    pub fn from_declarations(models: &[(String, Vec<String>)]) -> CoreResult<Self> {
        let mut names = Vec::with_capacity(models.len());
        for (name, _) in models {
            names.push(ModelName::try_new(name.as_str()).ok_or_else(|| CoreError::EmptyName {
                context: "model name in DAG".into(),
            })?);
        }
        let mut dag = Self::with_nodes(names)?;
        for (model, deps) in models {
            for dep in deps {
                if dag.contains(dep) {
                    dag.add_dependency(model, dep);
                }
            }
        }
        dag.finish()
    }

    fn with_nodes(names: impl IntoIterator<Item = ModelName>) -> CoreResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();
        for name in names {
            if node_map.contains_key(&name) {
                return Err(CoreError::DuplicateModelName {
                    name: name.to_string(),
                });
            }
            let idx = graph.add_node(name.clone());
            node_map.insert(name, idx);
        }
        Ok(Self {
            graph,
            node_map,
            order: Vec::new(),
        })
    }

    /// Edge from dependency to dependent; parallel edges collapse
    fn add_dependency(&mut self, model: &str, depends_on: &str) {
        if let (Some(&from), Some(&to)) = (self.node_map.get(depends_on), self.node_map.get(model))
        {
            self.graph.update_edge(from, to, ());
        }
    }

    fn finish(mut self) -> CoreResult<Self> {
        self.order = self.kahn()?;
        Ok(self)
    }

    /// Kahn's algorithm with a min-heap on declaration index
    fn kahn(&self) -> CoreResult<Vec<ModelName>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.edges_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(i)) = ready.pop() {
            let node = NodeIndex::new(i);
            order.push(self.graph[node].clone());
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let t = edge.target().index();
                in_degree[t] -= 1;
                if in_degree[t] == 0 {
                    ready.push(Reverse(t));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            let remaining: HashSet<usize> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, &d)| d > 0)
                .map(|(i, _)| i)
                .collect();
            return Err(CoreError::CyclicDependency {
                cycle: self.extract_cycle(&remaining),
            });
        }

        Ok(order)
    }

    /// Recover one full cycle from the nodes Kahn could not schedule.
    ///
    /// Every unscheduled node has an unscheduled dependency, so walking
    /// dependencies from any of them must revisit a node. The returned names
    /// follow reference direction (`a` refs `b` gives `[a, b, a]`), start at the
    /// earliest-declared member, and repeat it at the end.
    fn extract_cycle(&self, remaining: &HashSet<usize>) -> Vec<String> {
        let Some(&start) = remaining.iter().min() else {
            return Vec::new();
        };

        let mut path: Vec<usize> = vec![start];
        let mut seen_at: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        let mut current = start;
        let cycle_start = loop {
            let next = self
                .graph
                .edges_directed(NodeIndex::new(current), Direction::Incoming)
                .map(|e| e.source().index())
                .filter(|i| remaining.contains(i))
                .min();
            let Some(next) = next else {
                // Unreachable for a node left over by Kahn's algorithm
                return path.iter().map(|&i| self.graph[NodeIndex::new(i)].to_string()).collect();
            };
            if let Some(&pos) = seen_at.get(&next) {
                break pos;
            }
            seen_at.insert(next, path.len());
            path.push(next);
            current = next;
        };

        let mut cycle: Vec<usize> = path[cycle_start..].to_vec();
        if let Some(min_pos) = cycle
            .iter()
            .enumerate()
            .min_by_key(|&(_, &i)| i)
            .map(|(p, _)| p)
        {
            cycle.rotate_left(min_pos);
        }
        if let Some(&first) = cycle.first() {
            cycle.push(first);
        }
        cycle
            .into_iter()
            .map(|i| self.graph[NodeIndex::new(i)].to_string())
            .collect()
    }

    /// Models in execution order (dependencies first)
    pub fn topological_order(&self) -> &[ModelName] {
        &self.order
    }

    /// Check if a model exists in the DAG
    pub fn contains(&self, model: &str) -> bool {
        self.node_map.contains_key(model)
    }

    fn neighbors_sorted(&self, model: &str, direction: Direction) -> Vec<ModelName> {
        let Some(&idx) = self.node_map.get(model) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| match direction {
                Direction::Incoming => e.source(),
                Direction::Outgoing => e.target(),
            })
            .collect();
        found.sort();
        found.into_iter().map(|n| self.graph[n].clone()).collect()
    }

    /// Direct dependencies of a model, in declaration order
    pub fn dependencies(&self, model: &str) -> Vec<ModelName> {
        self.neighbors_sorted(model, Direction::Incoming)
    }

    /// Direct dependents of a model, in declaration order
    pub fn dependents(&self, model: &str) -> Vec<ModelName> {
        self.neighbors_sorted(model, Direction::Outgoing)
    }

    fn reachable(&self, model: &str, direction: Direction) -> HashSet<ModelName> {
        let mut visited = HashSet::new();
        let Some(&start) = self.node_map.get(model) else {
            return visited;
        };
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for edge in self.graph.edges_directed(node, direction) {
                let neighbor = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                if visited.insert(self.graph[neighbor].clone()) {
                    stack.push(neighbor);
                }
            }
        }
        visited
    }

    fn in_order(&self, set: &HashSet<ModelName>) -> Vec<ModelName> {
        self.order
            .iter()
            .filter(|m| set.contains(*m))
            .cloned()
            .collect()
    }

    /// All transitive dependencies, in execution order
    pub fn ancestors(&self, model: &str) -> Vec<ModelName> {
        self.in_order(&self.reachable(model, Direction::Incoming))
    }

    /// All transitive dependents, in execution order
    pub fn descendants(&self, model: &str) -> Vec<ModelName> {
        self.in_order(&self.reachable(model, Direction::Outgoing))
    }

    /// Select models: `name`, `+name` (with ancestors), `name+` (with descendants)
    pub fn select(&self, selector: &str) -> CoreResult<Vec<ModelName>> {
        self.select_many(&[selector])
    }

    /// Union of several selectors, in execution order
    pub fn select_many<S: AsRef<str>>(&self, selectors: &[S]) -> CoreResult<Vec<ModelName>> {
        let mut selected = HashSet::new();
        for selector in selectors {
            let selector = selector.as_ref().trim();
            let with_ancestors = selector.starts_with('+');
            let with_descendants = selector.ends_with('+');
            let name = selector.trim_start_matches('+').trim_end_matches('+');
            if name.is_empty() {
                return Err(CoreError::InvalidSelector {
                    selector: selector.to_string(),
                    reason: "selector names no model".to_string(),
                });
            }
            let Some(&idx) = self.node_map.get(name) else {
                return Err(CoreError::ModelNotFound {
                    name: name.to_string(),
                });
            };
            selected.insert(self.graph[idx].clone());
            if with_ancestors {
                selected.extend(self.reachable(name, Direction::Incoming));
            }
            if with_descendants {
                selected.extend(self.reachable(name, Direction::Outgoing));
            }
        }
        Ok(self.in_order(&selected))
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
