//! Project discovery and model loading

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::model::{ColumnDef, ModelDefinition, SingularTest, TestDefinition};
use crate::source::discover_sources;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::Project;

/// Sibling `<model>.yml` describing a model
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelSchemaFile {
    #[serde(default)]
    version: Option<u32>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    kind: Option<String>,

    #[serde(default)]
    config: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    columns: Vec<ColumnDef>,

    #[serde(default)]
    tests: Vec<TestDefinition>,
}

impl Project {
    /// Load a project from a directory
    pub fn load(path: &Path) -> CoreResult<Self> {
        let root = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        if !root.is_dir() {
            return Err(CoreError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }

        let config = Config::load_from_dir(&root)?;
        let definitions = discover_models(&config.model_paths_absolute(&root))?;
        let sources = discover_sources(&config.source_paths_absolute(&root))?;
        let singular_tests = discover_singular_tests(&config.test_paths_absolute(&root))?;

        log::debug!(
            "Loaded project '{}': {} models, {} sources, {} singular tests",
            config.name,
            definitions.len(),
            sources.len(),
            singular_tests.len()
        );

        Ok(Self {
            root,
            config,
            definitions,
            sources,
            singular_tests,
        })
    }
}

/// Every file with one of `extensions` under `dirs`, sorted by path
fn collect_files(dirs: &[PathBuf], extensions: &[&str]) -> CoreResult<Vec<PathBuf>> {
    fn walk(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) -> CoreResult<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|e| CoreError::IoWithPath {
                    path: dir.display().to_string(),
                    source: e,
                })?
                .path();
            if path.is_dir() {
                walk(&path, extensions, out)?;
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.contains(&e))
            {
                out.push(path);
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        walk(dir, extensions, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn read_file(path: &Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

fn discover_models(model_paths: &[PathBuf]) -> CoreResult<Vec<ModelDefinition>> {
    collect_files(model_paths, &["sql"])?
        .into_iter()
        .map(|path| load_model(&path))
        .collect()
}

fn load_model(sql_path: &Path) -> CoreResult<ModelDefinition> {
    let name = sql_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::EmptyName {
            context: format!("model file {}", sql_path.display()),
        })?;

    let mut def = ModelDefinition::new(name, read_file(sql_path)?).with_path(sql_path.to_path_buf());

    let Some(yaml_path) = find_yaml_path(sql_path) else {
        return Ok(def);
    };
    let schema: ModelSchemaFile =
        serde_yaml::from_str(&read_file(&yaml_path)?).map_err(|e| CoreError::ConfigParseError {
            path: yaml_path.display().to_string(),
            message: e.to_string(),
        })?;

    if let Some(version) = schema.version.filter(|v| *v != 1) {
        log::warn!(
            "{}: schema version {} is not recognized, reading as version 1",
            yaml_path.display(),
            version
        );
    }

    def.description = schema.description;
    def.columns = schema.columns;
    def.tests = schema.tests;
    for (key, value) in schema.config {
        def.config.insert(key, yaml_value_to_config(&value));
    }
    if let Some(kind) = schema.kind {
        def.config.insert("kind".to_string(), kind);
    }
    Ok(def)
}

/// Sibling `.yml` / `.yaml` with the same stem as a model file
fn find_yaml_path(sql_path: &Path) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| sql_path.with_extension(ext))
        .find(|p| p.is_file())
}

/// Flatten a YAML config value to the string form the registry validates
pub(crate) fn yaml_value_to_config(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(yaml_value_to_config)
            .collect::<Vec<_>>()
            .join(","),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn discover_singular_tests(test_paths: &[PathBuf]) -> CoreResult<Vec<SingularTest>> {
    collect_files(test_paths, &["sql"])?
        .into_iter()
        .map(SingularTest::from_file)
        .collect()
}
