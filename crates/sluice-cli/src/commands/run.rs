//! Run command implementation

use anyhow::{Context, Result};
use sluice_run::{NoopObserver, RunObserver, RunOptions, RunReport};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::{GlobalArgs, OutputFormat, RunArgs};
use crate::commands::common::{
    create_database_connection, finish_report, load_project, prepare_pipeline, print_json,
    resolve_threads,
};
use crate::commands::output::{format_model_summary, ProgressObserver};

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let start = Instant::now();
    let project = load_project(global)?;
    let pipeline = prepare_pipeline(&project)?;
    let options = RunOptions::new(resolve_threads(args.threads, &project))
        .with_select(args.select.clone());
    let selection = pipeline.select(&options.select).context("Invalid selector")?;
    let db = create_database_connection(&project, global)?;

    let progress = (args.output == OutputFormat::Text).then(|| {
        println!(
            "Running {} models with {} threads...\n",
            selection.len(),
            options.threads
        );
        Arc::new(ProgressObserver::new(selection.len()))
    });
    let observer: Arc<dyn RunObserver> = match &progress {
        Some(p) => Arc::clone(p) as Arc<dyn RunObserver>,
        None => Arc::new(NoopObserver),
    };

    let models = pipeline
        .run(db, &options, observer)
        .await
        .context("Run aborted")?;
    if let Some(p) = &progress {
        p.finish();
    }

    let report = RunReport::new("run", start.elapsed(), models, Vec::new(), None);
    match args.output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!();
            println!("{}", format_model_summary(&report.models));
            println!("Total time: {:.2}s", report.elapsed_secs);
        }
    }

    finish_report(&project, &report, global)
}
