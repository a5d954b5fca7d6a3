//! Compile command implementation

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::{CompileArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{load_project, prepare_pipeline, print_json, write_json_results};

/// Execute the compile command
pub async fn execute(args: &CompileArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let pipeline = prepare_pipeline(&project)?;
    let manifest = pipeline.compile().context("Failed to compile project")?;

    let output_dir = args
        .output_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| project.compiled_dir());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for model in &manifest.models {
        let path = output_dir.join(model.file_name());
        std::fs::write(&path, &model.sql)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if global.verbose {
            eprintln!("[verbose] Compiled {} -> {}", model.name, path.display());
        }
    }

    let manifest_path = project.manifest_path();
    write_json_results(&manifest_path, &manifest)?;

    match args.output {
        OutputFormat::Json => print_json(&manifest)?,
        OutputFormat::Text => {
            for model in &manifest.models {
                println!("  ✓ {} ({})", model.name, model.materialized);
            }
            println!();
            println!(
                "Compiled {} models reading {} sources to {}",
                manifest.models.len(),
                manifest.source_references().len(),
                output_dir.display()
            );
            println!("Manifest written to {}", manifest_path.display());
        }
    }

    Ok(())
}
