//! Suite providers
//!
//! A provider is anything that can list its test cases and run them one at a
//! time. The aggregator only ever talks to providers through [`SuiteProvider`].

mod command;
mod inline;

pub use command::{locate_program, CommandProvider};
pub use inline::InlineSuite;

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Program not found: {0}")]
    ProgramNotFound(String),

    #[error("Working directory does not exist: {0}")]
    MissingWorkdir(PathBuf),

    #[error("Discovery is configured but no per-case arguments were given")]
    MissingCaseArgs,

    #[error("Suite has no test cases")]
    NoCases,

    #[error("Load check failed with status {status}: {output}")]
    CheckFailed { status: String, output: String },

    #[error("Discovery failed with status {status}: {output}")]
    DiscoveryFailed { status: String, output: String },

    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
}

/// Outcome of running a single case
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Failed(String),
    Errored(String),
}

/// A bundle of test cases the engines can discover and execute
#[async_trait]
pub trait SuiteProvider: Send + Sync + fmt::Debug {
    /// Short human-readable description (command line, target, ...)
    fn describe(&self) -> String;

    /// Check that the provider can be used at all. Called once while the
    /// registry is built; an error here aborts startup.
    fn resolve(&self) -> Result<(), ProviderError>;

    /// List the case names this provider exposes, in execution order
    async fn discover(&self) -> Result<Vec<String>, ProviderError>;

    /// Run one previously discovered case
    async fn run_case(&self, case: &str) -> CaseOutcome;
}
