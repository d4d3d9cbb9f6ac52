//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;
use tracing::warn;

use super::AppConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "AUXI_SUITES";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from AUXI_SUITES_CONFIG
    pub config_file: Option<String>,
    /// Output format from AUXI_SUITES_FORMAT
    pub format: Option<String>,
    /// Parallel from AUXI_SUITES_PARALLEL
    pub parallel: Option<bool>,
    /// Rounds from AUXI_SUITES_ROUNDS
    pub rounds: Option<u32>,
    /// Timeout from AUXI_SUITES_TIMEOUT
    pub timeout: Option<u64>,
    /// Interpreter from AUXI_SUITES_PYTHON
    pub python: Option<String>,
    /// auxi checkout from AUXI_SUITES_SOURCE_DIR
    pub source_dir: Option<String>,
    /// Log filter from AUXI_SUITES_LOG
    pub log: Option<String>,
    /// Variables that were set but could not be parsed, as (name, value)
    pub ignored: Vec<(String, String)>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary lookup (keys are fully prefixed)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |name: &str| format!("{ENV_PREFIX}_{name}");
        let get = |name: &str| lookup(&key(name));
        let mut ignored = Vec::new();

        let parallel = parse_var(key("PARALLEL"), get("PARALLEL"), parse_bool, &mut ignored);
        let rounds = parse_var(
            key("ROUNDS"),
            get("ROUNDS"),
            |v| v.parse::<u32>().ok(),
            &mut ignored,
        );
        let timeout = parse_var(
            key("TIMEOUT"),
            get("TIMEOUT"),
            |v| v.parse::<u64>().ok(),
            &mut ignored,
        );

        Self {
            config_file: get("CONFIG"),
            format: get("FORMAT"),
            parallel,
            rounds,
            timeout,
            python: get("PYTHON"),
            source_dir: get("SOURCE_DIR"),
            log: get("LOG"),
            ignored,
        }
    }

    /// Warn about every variable that was set but ignored; call once logging is up
    pub fn warn_ignored(&self) {
        for (name, value) in &self.ignored {
            warn!("Ignoring {}={:?}: not a valid value", name, value);
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.format.is_some()
            || self.parallel.is_some()
            || self.rounds.is_some()
            || self.timeout.is_some()
            || self.python.is_some()
            || self.source_dir.is_some()
            || self.log.is_some()
    }

    /// Override application settings with whatever is set
    pub fn apply(&self, app: &mut AppConfig) {
        if let Some(format) = &self.format {
            app.format = format.clone();
        }
        if let Some(parallel) = self.parallel {
            app.parallel = parallel;
        }
        if let Some(rounds) = self.rounds {
            app.rounds = rounds;
        }
        if let Some(timeout) = self.timeout {
            app.timeout_secs = Some(timeout);
        }
        if let Some(python) = &self.python {
            app.python = python.clone();
        }
        if let Some(dir) = &self.source_dir {
            app.source_dir = Some(PathBuf::from(dir));
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {ENV_PREFIX}_CONFIG:     {:?}", self.config_file);
        println!("  {ENV_PREFIX}_FORMAT:     {:?}", self.format);
        println!("  {ENV_PREFIX}_PARALLEL:   {:?}", self.parallel);
        println!("  {ENV_PREFIX}_ROUNDS:     {:?}", self.rounds);
        println!("  {ENV_PREFIX}_TIMEOUT:    {:?}", self.timeout);
        println!("  {ENV_PREFIX}_PYTHON:     {:?}", self.python);
        println!("  {ENV_PREFIX}_SOURCE_DIR: {:?}", self.source_dir);
        println!("  {ENV_PREFIX}_LOG:        {:?}", self.log);
    }
}

/// Parse a set variable, remembering it when the value is unusable
fn parse_var<T>(
    name: String,
    value: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
    ignored: &mut Vec<(String, String)>,
) -> Option<T> {
    let value = value?;
    let parsed = parse(value.trim());
    if parsed.is_none() {
        ignored.push((name, value));
    }
    parsed
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}
