//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Sluice - build dependency-ordered SQL models into DuckDB
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override the database path from sluice.yml
    #[arg(short, long, global = true, env = "SLUICE_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render every model and write the compile manifest
    Compile(CompileArgs),

    /// Materialize models in dependency order
    Run(RunArgs),

    /// Run assertions against the relations in the database
    Test(TestArgs),

    /// Run, then test what was built
    Build(BuildArgs),

    /// List models in execution order
    Ls(LsArgs),
}

/// Output format for command results
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Override output directory for compiled SQL
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Model selectors (name, +name, name+), comma-separated
    #[arg(short, long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Number of models built concurrently (default from sluice.yml)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the test command
#[derive(Args, Debug, Clone)]
pub struct TestArgs {
    /// Only test the selected models, comma-separated
    #[arg(short, long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Model selectors (name, +name, name+), comma-separated
    #[arg(short, long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Number of models built concurrently (default from sluice.yml)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: LsOutput,

    /// Selector to filter models
    #[arg(short, long, value_delimiter = ',')]
    pub select: Vec<String>,
}

/// List output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
    /// Dependency tree
    Tree,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
