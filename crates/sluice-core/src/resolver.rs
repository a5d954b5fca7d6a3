//! Syntactic reference resolution
//!
//! References are found by scanning template text for `ref('name')` and
//! `source('group', 'table')` calls inside `{{ }}` expressions and `{% %}`
//! statements. Nothing is rendered or executed here.

use crate::error::{CoreError, CoreResult};
use crate::model::{Model, TestType};
use crate::model_name::ModelName;
use crate::registry::Registry;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Target of a reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reference {
    /// Another model; implies an ordering edge
    Model { name: ModelName },
    /// A pre-existing source relation; must exist but is never ordered
    Source { group: String, table: String },
}

impl Reference {
    /// Referenced model name, if this is a model reference
    pub fn model_name(&self) -> Option<&ModelName> {
        match self {
            Reference::Model { name } => Some(name),
            Reference::Source { .. } => None,
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Model { name } => write!(f, "ref('{name}')"),
            Reference::Source { group, table } => write!(f, "source('{group}', '{table}')"),
        }
    }
}

/// A directed edge from a model to something it reads
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub from: ModelName,
    pub to: Reference,
}

/// Every edge of a registry, grouped by declaring model in declaration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedGraph {
    pub edges: Vec<Edge>,
}

impl ResolvedGraph {
    /// Model-to-model edges as `(from, to)` pairs
    pub fn model_edges(&self) -> impl Iterator<Item = (&ModelName, &ModelName)> {
        self.edges
            .iter()
            .filter_map(|e| e.to.model_name().map(|to| (&e.from, to)))
    }

    /// Edges from a given model
    pub fn edges_from<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.from == model)
    }
}

fn template_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}|\{%-?(.*?)-?%\}").expect("valid regex"))
}

fn ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bref\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid regex")
    })
}

fn source_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bsource\s*\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)"#)
            .expect("valid regex")
    })
}

/// Extract references from template text, in order of first appearance.
///
/// Duplicates are dropped.
pub fn extract_references(template: &str) -> Vec<Reference> {
    let mut found: Vec<(usize, Reference)> = Vec::new();

    for block in template_block_regex().captures_iter(template) {
        let Some(body) = block.get(1).or_else(|| block.get(2)) else {
            continue;
        };
        let offset = body.start();
        for cap in ref_regex().captures_iter(body.as_str()) {
            if let Some(name) = ModelName::try_new(cap[1].trim()) {
                found.push((offset + cap.get(0).map_or(0, |m| m.start()), Reference::Model { name }));
            }
        }
        for cap in source_regex().captures_iter(body.as_str()) {
            found.push((
                offset + cap.get(0).map_or(0, |m| m.start()),
                Reference::Source {
                    group: cap[1].trim().to_string(),
                    table: cap[2].trim().to_string(),
                },
            ));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    let mut refs: Vec<Reference> = Vec::with_capacity(found.len());
    for (_, reference) in found {
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
    refs
}

/// Parse a relationship target: `ref('m')`, `source('g', 't')` or a bare model name
pub fn parse_reference(target: &str) -> Option<Reference> {
    let target = target.trim();
    if let Some(cap) = source_regex().captures(target) {
        return Some(Reference::Source {
            group: cap[1].trim().to_string(),
            table: cap[2].trim().to_string(),
        });
    }
    if let Some(cap) = ref_regex().captures(target) {
        return ModelName::try_new(cap[1].trim()).map(|name| Reference::Model { name });
    }
    let bare = target.trim_matches(|c| c == '\'' || c == '"');
    if bare.is_empty() || bare.contains(|c: char| c.is_whitespace() || c == '(') {
        return None;
    }
    ModelName::try_new(bare).map(|name| Reference::Model { name })
}

fn is_declared(reference: &Reference, registry: &Registry) -> bool {
    match reference {
        Reference::Model { name } => registry.contains(name),
        Reference::Source { group, table } => registry.source_relation(group, table).is_some(),
    }
}

/// Check every reference in a template against the registry.
///
/// `owner` names the model or test the template belongs to in error messages.
pub fn resolve_template(owner: &str, template: &str, registry: &Registry) -> CoreResult<Vec<Reference>> {
    let refs = extract_references(template);
    if let Some(missing) = refs.iter().find(|r| !is_declared(r, registry)) {
        return Err(CoreError::UnresolvedReference {
            model: owner.to_string(),
            reference: missing.to_string(),
        });
    }
    Ok(refs)
}

/// Resolve one model's references into edges
pub fn resolve(model: &Model, registry: &Registry) -> CoreResult<Vec<Edge>> {
    Ok(resolve_template(&model.name, &model.raw_sql, registry)?
        .into_iter()
        .map(|to| Edge {
            from: model.name.clone(),
            to,
        })
        .collect())
}

/// Resolve every model in declaration order, stopping at the first unresolved reference.
///
/// Relationship test targets are checked too, after all model bodies.
pub fn resolve_all(registry: &Registry) -> CoreResult<ResolvedGraph> {
    let mut edges = Vec::new();
    for model in registry.models() {
        edges.extend(resolve(model, registry)?);
    }

    let relationship_targets = registry
        .schema_tests()
        .map(|t| (t.model.to_string(), &t.test_type))
        .chain(
            registry
                .source_tests()
                .iter()
                .map(|t| (format!("source:{}", t.source), &t.test_type)),
        );
    for (owner, test_type) in relationship_targets {
        if let TestType::Relationship { to, .. } = test_type {
            let declared = parse_reference(to).is_some_and(|r| is_declared(&r, registry));
            if !declared {
                return Err(CoreError::UnresolvedReference {
                    model: owner,
                    reference: to.clone(),
                });
            }
        }
    }

    log::debug!("Resolved {} reference edges", edges.len());
    Ok(ResolvedGraph { edges })
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
