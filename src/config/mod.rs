//! Configuration module
//!
//! Handles loading and managing configuration.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::{ConfigFile, SuiteConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Label printed before every run
    pub label: String,

    /// Python interpreter used by the built-in auxi suites
    pub python: String,

    /// Directory the auxi suites run from (the auxi checkout)
    pub source_dir: Option<PathBuf>,

    /// List individual test methods instead of running each class as one case
    pub discover_cases: bool,

    /// Per-case timeout in seconds; unbounded when unset
    pub timeout_secs: Option<u64>,

    /// Run cases concurrently
    pub parallel: bool,

    /// Maximum concurrent cases
    pub max_concurrent: usize,

    /// Number of rounds
    pub rounds: u32,

    /// Output format
    pub format: String,

    /// Skip patterns (`alias` or `alias::case`)
    pub skip: Vec<String>,

    /// Persist every run to the results directory
    pub store_results: bool,

    /// Results directory override
    pub results_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            label: env!("CARGO_CRATE_NAME").to_string(),
            python: "python3".to_string(),
            source_dir: None,
            discover_cases: true,
            timeout_secs: None,
            parallel: false,
            max_concurrent: 4,
            rounds: 1,
            format: "table".to_string(),
            skip: Vec::new(),
            store_results: false,
            results_dir: None,
        }
    }
}
