//! Sequential test runner
//!
//! Runs suites in registry order and cases in discovery order.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{discover_suite, run_case, Discovery, Engine, ExecutionOptions};
use crate::models::{RunSummary, TestResult};
use crate::registry::{Registry, SuiteRef};
use crate::utils::Timer;

/// Sequential engine
pub struct TestRunner {
    options: ExecutionOptions,
}

impl TestRunner {
    /// Create a new test runner
    pub fn new(options: ExecutionOptions) -> Self {
        Self { options }
    }

    /// Run every case of one suite
    pub async fn run_suite(&self, suite: &SuiteRef) -> Vec<TestResult> {
        let cases = match discover_suite(suite, &self.options).await {
            Discovery::Cases(cases) => cases,
            Discovery::Settled(result) => return vec![result],
        };

        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            results.push(run_case(suite.provider(), case, &self.options).await);
        }
        results
    }
}

#[async_trait]
impl Engine for TestRunner {
    async fn execute(&self, registry: &Registry, round: u32) -> Result<RunSummary> {
        info!(
            "Starting round {} over {} suite(s)",
            round,
            registry.len()
        );

        let timer = Timer::start(format!("round {round}"));
        let mut results = Vec::new();

        for suite in registry {
            results.extend(self.run_suite(suite).await);
        }

        let summary = RunSummary::new(round, &self.options.label, results);

        info!(
            "Round completed in {}ms - Pass: {}/{} ({:.1}%)",
            timer.elapsed_ms(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TestStatus, DISCOVERY_CASE, WHOLE_SUITE_CASE};
    use crate::providers::InlineSuite;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn registry() -> Registry {
        Registry::builder()
            .register(
                "object_test_all",
                InlineSuite::new()
                    .case("test_create", || Ok(()))
                    .case("test_validate", || Err("name is empty".to_string())),
            )
            .register(
                "generalledger_test_all",
                InlineSuite::new().case("test_post", || Ok(())),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_runs_in_registry_order() {
        let runner = TestRunner::new(ExecutionOptions::new("auxi_suites"));
        let summary = runner.execute(&registry(), 1).await.unwrap();

        let ids: Vec<String> = summary.results.iter().map(|r| r.case.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "object_test_all::test_create",
                "object_test_all::test_validate",
                "generalledger_test_all::test_post",
            ]
        );
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.suites, 2);
    }

    #[tokio::test]
    async fn test_skip_suite_and_case() {
        let runner = TestRunner::new(ExecutionOptions::new("auxi_suites").with_skip(vec![
            "generalledger_test_all".to_string(),
            "object_test_all::test_validate".to_string(),
        ]));
        let summary = runner.execute(&registry(), 1).await.unwrap();

        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.passed, 1);
        assert!(summary.is_all_passed());
        assert_eq!(summary.results[2].case.case, WHOLE_SUITE_CASE);
    }

    #[tokio::test]
    async fn test_skipped_suite_is_never_touched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = Registry::builder()
            .register(
                "thermo_test_all",
                InlineSuite::new().case("test_cp", move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .build()
            .unwrap();

        let runner = TestRunner::new(
            ExecutionOptions::new("auxi_suites").with_skip(vec!["thermo_test_all".to_string()]),
        );
        runner.execute(&registry, 1).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_discovery_error_is_reported() {
        use crate::providers::CommandProvider;

        let registry = Registry::builder()
            .register(
                "stoich_test_all",
                CommandProvider::new("sh")
                    .discover_with(["-c", "echo 'ModuleNotFoundError: auxi' >&2; exit 1"])
                    .case_args(["-c", "true"]),
            )
            .register(
                "object_test_all",
                InlineSuite::new().case("test_create", || Ok(())),
            )
            .build()
            .unwrap();

        let runner = TestRunner::new(ExecutionOptions::new("auxi_suites"));
        let summary = runner.execute(&registry, 1).await.unwrap();

        assert_eq!(summary.results[0].status, TestStatus::Error);
        assert_eq!(summary.results[0].case.case, DISCOVERY_CASE);
        assert_eq!(summary.results[1].status, TestStatus::Pass);
        assert_eq!(summary.exit_code(), 1);
    }
}
