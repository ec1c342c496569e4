//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::parse_target_override;
use crate::error::KickError;

/// Incremental build-time benchmark across build systems
#[derive(Parser, Debug)]
#[command(name = "buildkick")]
#[command(about = "Times incremental builds by appending throwaway code to source files")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Warm up every build system, then time incremental builds
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Summarize a saved measurement table
    #[command(visible_alias = "s")]
    Summarize(SummarizeArgs),

    /// List the source files a run would mutate
    Files(FilesArgs),
}

// ============================================
// Run Subcommand
// ============================================

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Benchmark configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Number of timed incremental builds per build system
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Override a build system's target, e.g. `Bazel=/work/ws//app:app`
    #[arg(long = "target", value_name = "NAME=TARGET", value_parser = parse_target)]
    pub targets: Vec<(String, String)>,

    /// Write the measurement table here
    #[arg(long, value_name = "PATH", default_value = "incremental_build_times.csv")]
    pub output_csv: PathBuf,

    /// Also write a JSON run report
    #[arg(long, value_name = "PATH")]
    pub output_json: Option<PathBuf>,

    /// Additional path substrings to exclude from mutation
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Per-build timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,
}

fn parse_target(spec: &str) -> Result<(String, String), KickError> {
    parse_target_override(spec)
}

// ============================================
// Summarize Subcommand
// ============================================

/// Arguments for the summarize command
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Measurement table produced by `run`
    #[arg(value_name = "CSV")]
    pub table: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

// ============================================
// Files Subcommand
// ============================================

/// Arguments for the files command
#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Benchmark configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Additional path substrings to exclude from mutation
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// JSON for machine parsing
    Json,
}
