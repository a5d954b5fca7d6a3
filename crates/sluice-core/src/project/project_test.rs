use super::*;
use crate::error::CoreError;
use crate::model::TestDefinition;
use crate::registry::Registry;
use crate::Materialization;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn telegram_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "sluice.yml",
        "name: telegram\nmaterialization: view\nschema: analytics\ndatabase:\n  path: dev.duckdb\n",
    );
    write(
        root,
        "sources/raw.yml",
        "kind: sources\nname: raw\nschema: raw\ntables:\n  - name: telegram_messages\n",
    );
    write(
        root,
        "models/staging/stg_messages.sql",
        "SELECT * FROM {{ source('raw', 'telegram_messages') }}",
    );
    write(
        root,
        "models/staging/stg_messages.yml",
        r#"
description: "One row per scraped message"
columns:
  - name: message_id
    tests:
      - unique
      - not_null
"#,
    );
    write(
        root,
        "models/marts/dim_channel.sql",
        "SELECT DISTINCT channel FROM {{ ref('stg_messages') }}",
    );
    write(
        root,
        "models/marts/dim_channel.yml",
        "kind: dimension\nconfig:\n  materialized: table\n  tags: [daily, telegram]\n",
    );
    write(
        root,
        "tests/assert_positive_views.sql",
        "SELECT * FROM {{ ref('stg_messages') }} WHERE views < 0",
    );
    dir
}

#[test]
fn test_load_project() {
    let dir = telegram_project();
    let project = Project::load(dir.path()).unwrap();

    assert_eq!(project.config.name, "telegram");
    let names: Vec<&str> = project.definitions.iter().map(|d| d.name.as_str()).collect();
    // sorted by path: models/marts/... before models/staging/...
    assert_eq!(names, vec!["dim_channel", "stg_messages"]);
    assert_eq!(project.sources.len(), 1);
    assert_eq!(project.singular_tests.len(), 1);
    assert_eq!(project.singular_tests[0].name, "assert_positive_views");

    let stg = &project.definitions[1];
    assert_eq!(stg.description.as_deref(), Some("One row per scraped message"));
    assert_eq!(stg.columns[0].tests.len(), 2);
    assert_eq!(stg.columns[0].tests[0], TestDefinition::Simple("unique".into()));

    let dim = &project.definitions[0];
    assert_eq!(dim.config.get("materialized").map(String::as_str), Some("table"));
    assert_eq!(dim.config.get("kind").map(String::as_str), Some("dimension"));
    assert_eq!(dim.config.get("tags").map(String::as_str), Some("daily,telegram"));
}

#[test]
fn test_project_feeds_registry() {
    let dir = telegram_project();
    let project = Project::load(dir.path()).unwrap();
    let registry = Registry::load_with_defaults(
        project.definitions.clone(),
        project.sources.clone(),
        &project.model_defaults(),
    )
    .unwrap();

    let stg = registry.get("stg_messages").unwrap();
    assert_eq!(stg.relation_name(), "analytics.stg_messages");
    assert_eq!(stg.materialization, Materialization::View);
    assert_eq!(registry.get("dim_channel").unwrap().tags, vec!["daily", "telegram"]);
}

#[test]
fn test_paths() {
    let dir = telegram_project();
    let project = Project::load(dir.path()).unwrap();
    assert_eq!(project.manifest_path(), dir.path().join("target/manifest.json"));
    assert_eq!(
        project.run_results_path(),
        dir.path().join("target/run_results.json")
    );
    assert_eq!(
        project.compiled_dir(),
        dir.path().join("target/compiled/telegram")
    );
    assert_eq!(
        project.database_path(),
        dir.path().join("dev.duckdb").display().to_string()
    );
}

#[test]
fn test_missing_project_dir() {
    let err = Project::load(Path::new("/nonexistent/sluice/project")).unwrap_err();
    assert!(matches!(err, CoreError::ProjectNotFound { .. }));
}

#[test]
fn test_bad_model_yaml() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sluice.yml", "name: p\n");
    write(dir.path(), "models/a.sql", "SELECT 1");
    write(dir.path(), "models/a.yml", "materialised: table\n");
    let err = Project::load(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}

#[test]
fn test_missing_dirs_are_empty() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sluice.yml", "name: p\n");
    let project = Project::load(dir.path()).unwrap();
    assert!(project.definitions.is_empty());
    assert!(project.sources.is_empty());
    assert!(project.singular_tests.is_empty());
}

#[test]
fn test_yaml_value_to_config() {
    use super::loading::yaml_value_to_config;
    assert_eq!(yaml_value_to_config(&serde_yaml::Value::Bool(true)), "true");
    let seq: serde_yaml::Value = serde_yaml::from_str("[a, b]").unwrap();
    assert_eq!(yaml_value_to_config(&seq), "a,b");
}
