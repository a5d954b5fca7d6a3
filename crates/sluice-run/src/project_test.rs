use super::*;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_inline_config_overrides_yaml() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sluice.yml", "name: p\n");
    write(
        dir.path(),
        "models/dim_channel.sql",
        "{{ config(materialized='table', tags=['daily']) }}\nSELECT 1 AS channel",
    );
    write(
        dir.path(),
        "models/dim_channel.yml",
        "config:\n  materialized: view\n  schema: marts\n",
    );

    let project = Project::load(dir.path()).unwrap();
    let defs = definitions_with_inline_config(&project).unwrap();
    let config = &defs[0].config;
    assert_eq!(config.get("materialized").map(String::as_str), Some("table"));
    assert_eq!(config.get("schema").map(String::as_str), Some("marts"));
    assert_eq!(config.get("tags").map(String::as_str), Some("daily"));
}

#[test]
fn test_template_error_names_model() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sluice.yml", "name: p\n");
    write(dir.path(), "models/broken.sql", "SELECT {{ var('undefined_var') }}");

    let project = Project::load(dir.path()).unwrap();
    let err = definitions_with_inline_config(&project).unwrap_err();
    match err {
        RunError::Template { model, .. } => assert_eq!(model, "broken"),
        other => panic!("expected Template, got {other:?}"),
    }
}
