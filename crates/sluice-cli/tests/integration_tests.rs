//! Integration tests for Sluice against the Telegram fixture project

use sluice_core::{Materialization, ModelKind, Project};
use sluice_db::{Database, DuckDbBackend};
use sluice_run::{ModelStatus, NoopObserver, Pipeline, RunOptions};
use sluice_test::AssertionStatus;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

const RAW_DDL: &str = "CREATE SCHEMA IF NOT EXISTS raw;
CREATE TABLE raw.telegram_messages (
    id BIGINT,
    date TIMESTAMPTZ,
    message TEXT,
    views INTEGER,
    has_media BOOLEAN,
    channel VARCHAR,
    image_path VARCHAR,
    scraped_at TIMESTAMPTZ
);";

const RAW_ROWS: &str = "INSERT INTO raw.telegram_messages VALUES
    (1, '2024-01-03 09:15:00+00', 'Vitamin C serum back in stock', 120, true, 'lobelia4cosmetics', 'images/lobelia4cosmetics/1.jpg', '2024-02-01 00:00:00+00'),
    (2, '2024-01-04 11:00:00+00', 'New shipment of paracetamol', 340, false, 'tikvahpharma', NULL, '2024-02-01 00:00:00+00'),
    (3, '2024-01-04 15:30:00+00', 'Price list attached', NULL, true, 'tikvahpharma', 'images/tikvahpharma/3.jpg', '2024-02-01 00:00:00+00'),
    (4, '2024-01-10 08:45:00+00', 'Open on Sunday', 55, false, 'CheMed123', NULL, '2024-02-01 00:00:00+00'),
    (5, '2024-01-21 19:05:00+00', NULL, 12, true, 'lobelia4cosmetics', 'images/lobelia4cosmetics/5.jpg', '2024-02-01 00:00:00+00');";

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/telegram_project")
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let path = entry.unwrap().path();
        let dest = to.join(path.file_name().unwrap());
        if path.is_dir() {
            copy_dir(&path, &dest);
        } else {
            std::fs::copy(&path, &dest).unwrap();
        }
    }
}

/// Copy of the fixture project with a seeded warehouse at its configured path
async fn seeded_project(extra_sql: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&fixture_dir(), dir.path());
    std::fs::create_dir_all(dir.path().join("target")).unwrap();

    let db = DuckDbBackend::from_path(&dir.path().join("target/warehouse.duckdb")).unwrap();
    db.execute_batch(RAW_DDL).await.unwrap();
    db.execute_batch(RAW_ROWS).await.unwrap();
    if !extra_sql.is_empty() {
        db.execute_batch(extra_sql).await.unwrap();
    }
    dir
}

async fn seeded_memory_db(extra_sql: &str) -> Arc<dyn Database> {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(RAW_DDL).await.unwrap();
    db.execute_batch(RAW_ROWS).await.unwrap();
    if !extra_sql.is_empty() {
        db.execute_batch(extra_sql).await.unwrap();
    }
    Arc::new(db)
}

fn sluice(project: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sluice"))
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("SLUICE_DATABASE")
        .output()
        .unwrap()
}

#[test]
fn test_load_fixture_project() {
    let project = Project::load(&fixture_dir()).unwrap();

    assert_eq!(project.config.name, "telegram_analytics");
    assert_eq!(project.definitions.len(), 4);
    assert_eq!(project.sources.len(), 1);
    assert_eq!(project.sources[0].tables[0].name, "telegram_messages");
    assert_eq!(project.singular_tests.len(), 1);
    assert_eq!(
        project.singular_tests[0].name,
        "assert_channel_post_counts_match"
    );
}

#[test]
fn test_inline_config_and_execution_order() {
    let project = Project::load(&fixture_dir()).unwrap();
    let pipeline = Pipeline::from_project(&project).unwrap();
    let registry = pipeline.registry();

    let stg = registry.get("stg_telegram_messages").unwrap();
    assert_eq!(stg.materialization, Materialization::View);
    assert_eq!(stg.kind, ModelKind::Staging);
    assert_eq!(stg.relation_name(), "analytics.stg_telegram_messages");

    let dim = registry.get("dim_channels").unwrap();
    assert_eq!(dim.materialization, Materialization::Table);
    assert_eq!(dim.tags, vec!["marts", "channels"]);

    let order: Vec<&str> = pipeline
        .dag()
        .topological_order()
        .iter()
        .map(|m| m.as_str())
        .collect();
    assert_eq!(
        order,
        vec![
            "dim_dates",
            "stg_telegram_messages",
            "dim_channels",
            "fct_messages"
        ]
    );
}

#[test]
fn test_compile_manifest() {
    let project = Project::load(&fixture_dir()).unwrap();
    let manifest = Pipeline::from_project(&project).unwrap().compile().unwrap();

    assert_eq!(manifest.project_name, "telegram_analytics");
    assert_eq!(manifest.models.len(), 4);

    let model = |name: &str| manifest.models.iter().find(|m| m.name == name).unwrap();
    let fct = model("fct_messages");
    assert!(fct.sql.contains("\"analytics\".\"stg_telegram_messages\""));
    assert!(fct.sql.contains("\"analytics\".\"dim_channels\""));
    assert!(!fct.sql.contains("{{"));
    assert_eq!(fct.depends_on.len(), 2);

    let dates = model("dim_dates");
    assert!(dates.sql.contains("DATE '2024-01-31'"));
    assert_eq!(dates.sql_checksum.len(), 64);
}

#[tokio::test]
async fn test_full_build_passes() {
    let project = Project::load(&fixture_dir()).unwrap();
    let pipeline = Pipeline::from_project(&project).unwrap();
    let db = seeded_memory_db("").await;

    let report = pipeline
        .build(Arc::clone(&db), &RunOptions::new(2), Arc::new(NoopObserver))
        .await
        .unwrap();

    assert!(report
        .models
        .iter()
        .all(|m| m.status == ModelStatus::Materialized));
    let failing: Vec<&str> = report
        .assertions
        .iter()
        .filter(|a| !a.passed())
        .map(|a| a.name.as_str())
        .collect();
    assert!(failing.is_empty(), "unexpected failures: {failing:?}");
    assert_eq!(
        db.query_count("SELECT * FROM analytics.fct_messages")
            .await
            .unwrap(),
        5
    );
    assert_eq!(
        db.query_count("SELECT * FROM analytics.dim_dates")
            .await
            .unwrap(),
        31
    );
    assert_eq!(
        db.query_count("SELECT * FROM analytics.dim_channels")
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_null_channel_fails_not_null() {
    let project = Project::load(&fixture_dir()).unwrap();
    let pipeline = Pipeline::from_project(&project).unwrap();
    let db = seeded_memory_db(
        "INSERT INTO raw.telegram_messages VALUES (6, '2024-01-22 10:00:00+00', 'orphan', 1, false, NULL, NULL, NULL);",
    )
    .await;

    let report = pipeline
        .build(db, &RunOptions::new(2), Arc::new(NoopObserver))
        .await
        .unwrap();

    assert!(!report.has_model_failures());
    let status = |name: &str| {
        report
            .assertions
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.status.clone())
            .unwrap()
    };
    assert_eq!(
        status("not_null_stg_telegram_messages_channel_name"),
        AssertionStatus::Failed { failures: 1 }
    );
    assert_eq!(
        status("source_not_null_raw_telegram_messages_channel"),
        AssertionStatus::Failed { failures: 1 }
    );
    assert!(report.has_assertion_failures());
}

#[tokio::test]
async fn test_cli_build_writes_run_results() {
    let dir = seeded_project("").await;

    let output = sluice(dir.path(), &["build", "--threads", "2"]);
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("target/run_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(results["command"], "build");
    assert_eq!(results["model_summary"]["materialized"], 4);
    assert_eq!(results["test_summary"]["failed"], 0);
}

#[tokio::test]
async fn test_cli_assertion_failure_exits_two() {
    let dir = seeded_project(
        "INSERT INTO raw.telegram_messages VALUES (6, '2024-01-22 10:00:00+00', 'orphan', 1, false, NULL, NULL, NULL);",
    )
    .await;

    let output = sluice(dir.path(), &["build"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_model_failure_exits_four() {
    // No raw relation: staging fails and everything downstream is skipped
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&fixture_dir(), dir.path());

    let output = sluice(dir.path(), &["run", "--output", "json"]);
    assert_eq!(output.status.code(), Some(4));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let statuses: Vec<(&str, &str)> = report["models"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| (m["model"].as_str().unwrap(), m["status"].as_str().unwrap()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("dim_dates", "materialized"),
            ("stg_telegram_messages", "failed"),
            ("dim_channels", "skipped"),
            ("fct_messages", "skipped"),
        ]
    );
}

#[test]
fn test_cli_missing_project_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = sluice(&dir.path().join("nope"), &["ls"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load project"));
}

#[test]
fn test_cli_ls_json() {
    let output = sluice(&fixture_dir(), &["ls", "--output", "json", "--select", "+fct_messages"]);
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["stg_telegram_messages", "dim_channels", "fct_messages"]
    );
}

#[test]
fn test_cli_compile_writes_manifest() {
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&fixture_dir(), dir.path());

    let output = sluice(dir.path(), &["compile"]);
    assert!(output.status.success());
    assert!(dir.path().join("target/manifest.json").is_file());
    assert!(dir
        .path()
        .join("target/compiled/telegram_analytics/fct_messages.sql")
        .is_file());
}
