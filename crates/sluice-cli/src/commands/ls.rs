//! List command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use sluice_core::resolver::Reference;
use sluice_core::{Materialization, ModelKind, ModelName};
use sluice_run::Pipeline;
use std::collections::HashSet;

use crate::cli::{GlobalArgs, LsArgs, LsOutput};
use crate::commands::common::{load_project, prepare_pipeline, print_json};

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let pipeline = prepare_pipeline(&project)?;
    let selection = pipeline.select(&args.select).context("Invalid selector")?;

    let mut entries = model_entries(&pipeline, &selection);
    if args.select.is_empty() {
        entries.extend(source_entries(&pipeline));
    }

    match args.output {
        LsOutput::Table => print_table(&entries),
        LsOutput::Json => print_json(&entries)?,
        LsOutput::Tree => print_tree(&entries),
    }

    Ok(())
}

/// A listed model or source table
#[derive(Debug, Serialize)]
pub(crate) struct ResourceInfo {
    name: String,
    #[serde(rename = "type")]
    resource_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ModelKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    materialized: Option<Materialization>,
    relation: String,
    depends_on: Vec<String>,
    sources: Vec<String>,
}

/// Selected models, in execution order
pub(crate) fn model_entries(
    pipeline: &Pipeline,
    selection: &[ModelName],
) -> Vec<ResourceInfo> {
    selection
        .iter()
        .filter_map(|name| pipeline.registry().get(name))
        .map(|model| ResourceInfo {
            name: model.name.to_string(),
            resource_type: "model",
            kind: Some(model.kind),
            materialized: Some(model.materialization),
            relation: model.relation_name(),
            depends_on: pipeline
                .dag()
                .dependencies(&model.name)
                .into_iter()
                .map(|d| d.to_string())
                .collect(),
            sources: pipeline
                .resolved()
                .edges_from(&model.name)
                .filter_map(|e| match &e.to {
                    Reference::Source { group, table } => Some(format!("{}.{}", group, table)),
                    Reference::Model { .. } => None,
                })
                .collect(),
        })
        .collect()
}

fn source_entries(pipeline: &Pipeline) -> Vec<ResourceInfo> {
    let registry = pipeline.registry();
    registry
        .sources()
        .iter()
        .flat_map(|group| {
            group.tables.iter().map(move |table| ResourceInfo {
                name: format!("{}.{}", group.name, table.name),
                resource_type: "source",
                kind: None,
                materialized: None,
                relation: registry
                    .source_relation(&group.name, &table.name)
                    .unwrap_or_default(),
                depends_on: Vec::new(),
                sources: Vec::new(),
            })
        })
        .collect()
}

/// Print resources in table format
fn print_table(entries: &[ResourceInfo]) {
    let name_width = entries.iter().map(|e| e.name.len()).max().unwrap_or(4).max(4);
    let type_width = 6;
    let mat_width = 12;
    let relation_width = entries
        .iter()
        .map(|e| e.relation.len())
        .max()
        .unwrap_or(8)
        .max(8);

    println!(
        "{:<name_width$}  {:<type_width$}  {:<mat_width$}  {:<relation_width$}  DEPENDS_ON",
        "NAME", "TYPE", "MATERIALIZED", "RELATION",
    );
    println!(
        "{:-<name_width$}  {:-<type_width$}  {:-<mat_width$}  {:-<relation_width$}  {}",
        "",
        "",
        "",
        "",
        "-".repeat(40),
    );

    for entry in entries {
        let mut deps = entry.depends_on.clone();
        deps.extend(entry.sources.iter().map(|s| format!("{} (source)", s)));
        let deps_str = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(", ")
        };
        let mat_str = entry
            .materialized
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<name_width$}  {:<type_width$}  {:<mat_width$}  {:<relation_width$}  {}",
            entry.name, entry.resource_type, mat_str, entry.relation, deps_str,
        );
    }

    let model_count = entries.iter().filter(|e| e.resource_type == "model").count();
    let source_count = entries.len() - model_count;
    println!();
    if source_count > 0 {
        println!("{} models, {} sources", model_count, source_count);
    } else {
        println!("{} models found", model_count);
    }
}

/// Print models as a tree rooted at models with no listed upstream
fn print_tree(entries: &[ResourceInfo]) {
    let models: Vec<&ResourceInfo> = entries
        .iter()
        .filter(|e| e.resource_type == "model")
        .collect();
    let names: HashSet<&str> = models.iter().map(|m| m.name.as_str()).collect();
    let roots: Vec<&&ResourceInfo> = models
        .iter()
        .filter(|m| m.depends_on.iter().all(|d| !names.contains(d.as_str())))
        .collect();

    println!("Dependency Tree:");
    println!();
    for (i, root) in roots.iter().enumerate() {
        print_tree_node(&root.name, &models, "", i == roots.len() - 1);
    }
}

fn print_tree_node(name: &str, models: &[&ResourceInfo], prefix: &str, is_last: bool) {
    let connector = if is_last { "└── " } else { "├── " };
    println!("{}{}{}", prefix, connector, name);

    let dependents: Vec<&&ResourceInfo> = models
        .iter()
        .filter(|m| m.depends_on.iter().any(|d| d == name))
        .collect();
    let new_prefix = format!("{}{}   ", prefix, if is_last { " " } else { "│" });
    for (i, dependent) in dependents.iter().enumerate() {
        print_tree_node(
            &dependent.name,
            models,
            &new_prefix,
            i == dependents.len() - 1,
        );
    }
}

#[cfg(test)]
#[path = "ls_test.rs"]
mod tests;
