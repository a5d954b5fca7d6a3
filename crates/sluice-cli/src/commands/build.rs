//! Build command implementation
//!
//! Materializes the selection, then runs the assertions whose models were
//! built. Assertions on models that did not build are skipped, not failed.

use anyhow::{Context, Result};
use sluice_run::{NoopObserver, RunObserver, RunOptions};
use std::sync::Arc;

use crate::cli::{BuildArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{
    create_database_connection, finish_report, load_project, prepare_pipeline, print_json,
    resolve_threads,
};
use crate::commands::output::{
    format_model_summary, format_test_summary, print_assertions, ProgressObserver,
};

/// Execute the build command: run -> test.
pub async fn execute(args: &BuildArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let pipeline = prepare_pipeline(&project)?;
    let options = RunOptions::new(resolve_threads(args.threads, &project))
        .with_select(args.select.clone());
    let selection = pipeline.select(&options.select).context("Invalid selector")?;
    let db = create_database_connection(&project, global)?;
    let text = args.output == OutputFormat::Text;

    let progress = text.then(|| {
        println!("Starting build...\n");
        println!("=== Models ===\n");
        Arc::new(ProgressObserver::new(selection.len()))
    });
    let observer: Arc<dyn RunObserver> = match &progress {
        Some(p) => Arc::clone(p) as Arc<dyn RunObserver>,
        None => Arc::new(NoopObserver),
    };

    let report = pipeline
        .build(db, &options, observer)
        .await
        .context("Build aborted")?;
    if let Some(p) = &progress {
        p.finish();
    }

    if text {
        println!();
        println!("{}", format_model_summary(&report.models));
        println!("\n=== Tests ===\n");
        print_assertions(&report.assertions);
        println!();
        if let Some(summary) = &report.test_summary {
            println!("{}", format_test_summary(summary));
        }
        println!("Total time: {:.2}s", report.elapsed_secs);
    } else {
        print_json(&report)?;
    }

    finish_report(&project, &report, global)
}
