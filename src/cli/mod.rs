//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Aggregating test runner for the auxi suites
#[derive(Parser, Debug)]
#[command(name = "auxi-suites")]
#[command(version)]
#[command(about = "Run every registered auxi test suite and report a consolidated summary")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run all registered suites (default)
    Run(RunArgs),

    /// List registered suites
    List(ListArgs),

    /// Resolve every registered suite without running it
    Check,

    /// View stored run results
    Results(ResultsArgs),

    /// Show or create configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Only run these suite aliases (repeatable)
    #[arg(short, long = "suite")]
    pub suites: Vec<String>,

    /// Skip a suite (`alias`) or a case (`alias::case`) (repeatable)
    #[arg(long)]
    pub skip: Vec<String>,

    /// Run cases in parallel
    #[arg(short, long)]
    pub parallel: bool,

    /// Number of concurrent cases (when parallel)
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Number of rounds
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// Per-case timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Also write the report of the last round to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Store the run in the results directory
    #[arg(long)]
    pub save: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Also discover and list the cases of every suite
    #[arg(long)]
    pub cases: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Number of runs to show
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Export the latest run (format from extension: .json or .csv)
    #[arg(short, long)]
    pub export: Option<PathBuf>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Write an example configuration file to this path
    #[arg(long)]
    pub init: Option<PathBuf>,

    /// Show environment variable overrides
    #[arg(long)]
    pub env: bool,
}
