//! Test command implementation

use anyhow::{Context, Result};
use sluice_run::RunReport;
use std::time::Instant;

use crate::cli::{GlobalArgs, OutputFormat, TestArgs};
use crate::commands::common::{
    create_database_connection, finish_report, load_project, prepare_pipeline, print_json,
};
use crate::commands::output::{format_test_summary, print_assertions};

/// Execute the test command
///
/// A model counts as materialized when its relation exists in the database.
pub async fn execute(args: &TestArgs, global: &GlobalArgs) -> Result<()> {
    let start = Instant::now();
    let project = load_project(global)?;
    let pipeline = prepare_pipeline(&project)?;
    let selection = if args.select.is_empty() {
        None
    } else {
        Some(pipeline.select(&args.select).context("Invalid selector")?)
    };
    let db = create_database_connection(&project, global)?;

    let existing = pipeline
        .existing_models(db.as_ref())
        .await
        .context("Failed to inspect database")?;
    if global.verbose {
        eprintln!(
            "[verbose] {} of {} models exist in the database",
            existing.len(),
            pipeline.registry().len()
        );
    }

    let (results, summary) = pipeline
        .test(db.as_ref(), &existing, selection.as_deref())
        .await
        .context("Failed to generate assertions")?;

    if results.is_empty() && args.output == OutputFormat::Text {
        println!("No tests to run.");
        return Ok(());
    }

    let report = RunReport::new("test", start.elapsed(), Vec::new(), results, Some(summary));
    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("Running {} tests...\n", report.assertions.len());
            print_assertions(&report.assertions);
            println!();
            if let Some(summary) = &report.test_summary {
                println!("{}", format_test_summary(summary));
            }
        }
    }

    finish_report(&project, &report, global)
}
