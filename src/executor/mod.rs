//! Test execution engines
//!
//! Provides sequential and parallel execution of every case reachable from a
//! [`Registry`], plus multi-round batches.

mod batch;
mod parallel;
mod runner;

pub use batch::{AggregateResult, BatchRunner, CaseStats};
pub use parallel::ParallelExecutor;
pub use runner::TestRunner;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::models::{CaseId, RunSummary, TestResult, DISCOVERY_CASE, WHOLE_SUITE_CASE};
use crate::providers::{CaseOutcome, SuiteProvider};
use crate::registry::{Registry, SuiteRef};
use crate::utils::Timer;

/// Discovers, runs and reports every case behind a registry
#[async_trait]
pub trait Engine: Send + Sync {
    /// Execute one full round over the registry
    async fn execute(&self, registry: &Registry, round: u32) -> Result<RunSummary>;
}

/// Settings shared by all engines
#[derive(Clone, Debug)]
pub struct ExecutionOptions {
    /// Label used in summaries
    pub label: String,

    /// Skip patterns (`alias` or `alias::case`)
    pub skip: Vec<String>,
}

impl ExecutionOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            skip: Vec::new(),
        }
    }

    pub fn with_skip(mut self, skip: Vec<String>) -> Self {
        self.skip = skip;
        self
    }

    fn skips_suite(&self, alias: &str) -> bool {
        self.skip.iter().any(|p| p == alias)
    }

    fn skips_case(&self, case: &CaseId) -> bool {
        self.skip.iter().any(|p| case.matches(p))
    }
}

/// Cases of one suite, or the single result explaining why there are none
enum Discovery {
    Cases(Vec<CaseId>),
    Settled(TestResult),
}

async fn discover_suite(suite: &SuiteRef, options: &ExecutionOptions) -> Discovery {
    let alias = suite.alias();

    if options.skips_suite(alias) {
        return Discovery::Settled(TestResult::skip(
            CaseId::new(alias, WHOLE_SUITE_CASE),
            "Skipped by configuration",
        ));
    }

    let timer = Timer::start(format!("discover {alias}"));
    match suite.provider().discover().await {
        Ok(cases) => {
            info!("Discovered {} case(s) in {}", cases.len(), alias);
            Discovery::Cases(cases.into_iter().map(|c| CaseId::new(alias, c)).collect())
        }
        Err(e) => {
            error!("Discovery failed for {}: {}", alias, e);
            Discovery::Settled(TestResult::error(
                CaseId::new(alias, DISCOVERY_CASE),
                timer.elapsed_ms(),
                e.to_string(),
            ))
        }
    }
}

async fn run_case(
    provider: &Arc<dyn SuiteProvider>,
    case: CaseId,
    options: &ExecutionOptions,
) -> TestResult {
    if options.skips_case(&case) {
        return TestResult::skip(case, "Skipped by configuration");
    }

    info!("Running {}", case);
    let timer = Timer::start(case.to_string());
    let outcome = provider.run_case(&case.case).await;
    let duration_ms = timer.finish();

    let result = match outcome {
        CaseOutcome::Passed => TestResult::pass(case, duration_ms),
        CaseOutcome::Failed(message) => TestResult::fail(case, duration_ms, message),
        CaseOutcome::Errored(message) => TestResult::error(case, duration_ms, message),
    };
    info!("  {}", result.status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_patterns() {
        let options = ExecutionOptions::new("auxi_suites").with_skip(vec![
            "psd_test_material".to_string(),
            "stoich_test_all::test_slow".to_string(),
        ]);

        assert!(options.skips_suite("psd_test_material"));
        assert!(!options.skips_suite("stoich_test_all"));
        assert!(options.skips_case(&CaseId::new("stoich_test_all", "test_slow")));
        assert!(!options.skips_case(&CaseId::new("stoich_test_all", "test_fast")));
    }
}
