use super::*;
use sluice_core::{Materialization, ModelName};
use sluice_run::{ModelResult, ModelStatus};
use std::time::Duration;

fn model_result(name: &str, status: ModelStatus) -> ModelResult {
    ModelResult {
        model: ModelName::new(name),
        status,
        materialization: Materialization::View,
        relation: None,
        duration_secs: 0.0,
        error: (status == ModelStatus::Failed).then(|| "boom".to_string()),
        skipped_because: None,
    }
}

#[test]
fn test_clean_report_has_no_exit_code() {
    let report = RunReport::new(
        "run",
        Duration::from_millis(5),
        vec![model_result("stg_messages", ModelStatus::Materialized)],
        Vec::new(),
        None,
    );
    assert_eq!(ExitCode::for_report(&report), None);
}

#[test]
fn test_model_failure_exits_four() {
    let report = RunReport::new(
        "run",
        Duration::from_millis(5),
        vec![
            model_result("dim_channel", ModelStatus::Failed),
            model_result("fct_message", ModelStatus::Skipped),
        ],
        Vec::new(),
        None,
    );
    assert_eq!(ExitCode::for_report(&report), Some(ExitCode::MODEL_FAILURES));
    assert_eq!(ExitCode::MODEL_FAILURES.0, 4);
}

#[test]
fn test_exit_code_display_is_silent() {
    assert_eq!(ExitCode(2).to_string(), "");
}

#[test]
fn test_write_json_results_creates_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target").join("run_results.json");
    write_json_results(&path, &vec!["a", "b"]).unwrap();

    let written: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, vec!["a", "b"]);
}
