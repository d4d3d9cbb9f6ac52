//! Parallel test execution
//!
//! Runs discoveries and cases concurrently under one semaphore bound.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{discover_suite, run_case, Discovery, Engine, ExecutionOptions};
use crate::models::{CaseId, RunSummary, TestResult, DISCOVERY_CASE};
use crate::registry::Registry;
use crate::utils::Timer;

/// Parallel test executor
pub struct ParallelExecutor {
    max_concurrent: usize,
    options: ExecutionOptions,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize, options: ExecutionOptions) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            options,
        }
    }
}

/// One slot of the final report: either already known or still running
enum Slot {
    Done(TestResult),
    Running(CaseId, JoinHandle<TestResult>),
}

#[async_trait]
impl Engine for ParallelExecutor {
    async fn execute(&self, registry: &Registry, round: u32) -> Result<RunSummary> {
        info!(
            "Running round {} in parallel (max {} concurrent) over {} suite(s)",
            round,
            self.max_concurrent,
            registry.len()
        );

        let timer = Timer::start(format!("parallel round {round}"));

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        // join_all preserves input order, so discovery stays in registry order
        let discoveries = join_all(registry.iter().map(|suite| {
            let semaphore = &semaphore;
            async move {
                match semaphore.acquire().await {
                    Ok(_permit) => discover_suite(suite, &self.options).await,
                    Err(e) => Discovery::Settled(TestResult::error(
                        CaseId::new(suite.alias(), DISCOVERY_CASE),
                        0,
                        e.to_string(),
                    )),
                }
            }
        }))
        .await;

        let mut slots = Vec::new();

        for (suite, discovery) in registry.iter().zip(discoveries) {
            let cases = match discovery {
                Discovery::Cases(cases) => cases,
                Discovery::Settled(result) => {
                    slots.push(Slot::Done(result));
                    continue;
                }
            };

            for case in cases {
                let semaphore = Arc::clone(&semaphore);
                let provider = Arc::clone(suite.provider());
                let options = self.options.clone();
                let id = case.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return TestResult::error(case, 0, e.to_string()),
                    };
                    debug!("Starting parallel execution of {}", case);
                    run_case(&provider, case, &options).await
                });

                slots.push(Slot::Running(id, handle));
            }
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            results.push(match slot {
                Slot::Done(result) => result,
                Slot::Running(id, handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => TestResult::error(id, 0, format!("Case task failed: {e}")),
                },
            });
        }

        let summary = RunSummary::new(round, &self.options.label, results);

        info!(
            "Parallel execution completed in {}ms - Pass: {}/{} ({:.1}%)",
            timer.elapsed_ms(),
            summary.passed,
            summary.total,
            summary.pass_rate()
        );

        Ok(summary)
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4, ExecutionOptions::new(env!("CARGO_CRATE_NAME")))
    }
}
