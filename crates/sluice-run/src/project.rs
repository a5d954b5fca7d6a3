//! Project-directory glue: inline config extraction

use crate::error::{RunError, RunResult};
use sluice_core::{ModelDefinition, Project};
use sluice_jinja::JinjaEnvironment;

/// Project model definitions with inline `{{ config(...) }}` merged over the
/// sibling YAML config.
pub fn definitions_with_inline_config(project: &Project) -> RunResult<Vec<ModelDefinition>> {
    let jinja = JinjaEnvironment::new(&project.config.vars);
    project
        .definitions
        .iter()
        .map(|def| {
            let inline = jinja
                .extract_config(&def.raw_sql)
                .map_err(|source| RunError::Template {
                    model: def.name.clone(),
                    source,
                })?;
            let mut merged = def.clone();
            for (key, value) in inline {
                if let Some(previous) = merged.config.get(&key).filter(|p| **p != value) {
                    log::debug!(
                        "{}: inline config {}={} overrides '{}'",
                        def.name,
                        key,
                        value,
                        previous
                    );
                }
                merged.config.insert(key, value);
            }
            Ok(merged)
        })
        .collect()
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
