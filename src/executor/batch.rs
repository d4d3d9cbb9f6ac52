//! Multi-round execution
//!
//! Repeats full rounds over the registry and aggregates the outcomes, which
//! exposes cases whose result changes between otherwise identical runs.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use super::Engine;
use crate::models::{CaseId, RunSummary, TestStatus};
use crate::registry::Registry;

/// Batch test runner for multiple rounds
pub struct BatchRunner {
    rounds: u32,
}

impl BatchRunner {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Run every round with the given engine
    pub async fn run_rounds(
        &self,
        engine: &dyn Engine,
        registry: &Registry,
    ) -> Result<Vec<RunSummary>> {
        let mut summaries = Vec::with_capacity(self.rounds as usize);

        for round in 1..=self.rounds {
            info!("=== Round {}/{} ===", round, self.rounds);

            let summary = engine.execute(registry, round).await?;

            info!(
                "Round {} completed: {}/{} passed ({:.1}%)",
                round,
                summary.passed,
                summary.total,
                summary.pass_rate()
            );

            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Aggregate results across multiple rounds
    pub fn aggregate_results(summaries: &[RunSummary]) -> AggregateResult {
        let mut case_stats: BTreeMap<CaseId, CaseStats> = BTreeMap::new();

        for summary in summaries {
            for result in &summary.results {
                let stats = case_stats.entry(result.case.clone()).or_default();

                match result.status {
                    TestStatus::Pass => stats.passes += 1,
                    TestStatus::Fail => stats.failures += 1,
                    TestStatus::Skip => stats.skips += 1,
                    TestStatus::Error => stats.errors += 1,
                }
                stats.total_duration_ms += result.duration_ms;
            }
        }

        let overall_pass_rate = if summaries.is_empty() {
            0.0
        } else {
            summaries.iter().map(|s| s.pass_rate()).sum::<f64>() / summaries.len() as f64
        };

        let aggregate = AggregateResult {
            total_rounds: summaries.len() as u32,
            case_stats,
            overall_pass_rate,
        };

        for case in aggregate.inconsistent_cases() {
            warn!("Inconsistent outcome across rounds: {}", case);
        }

        aggregate
    }
}

/// Statistics for a single case across rounds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseStats {
    pub passes: u32,
    pub failures: u32,
    pub skips: u32,
    pub errors: u32,
    pub total_duration_ms: u64,
}

impl CaseStats {
    fn executed(&self) -> u32 {
        self.passes + self.failures + self.errors
    }

    pub fn pass_rate(&self) -> f64 {
        let executed = self.executed();
        if executed > 0 {
            (self.passes as f64 / executed as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn avg_duration_ms(&self) -> u64 {
        let executed = self.executed();
        if executed > 0 {
            self.total_duration_ms / executed as u64
        } else {
            0
        }
    }

    /// More than one kind of executed outcome was observed
    pub fn is_inconsistent(&self) -> bool {
        [self.passes, self.failures, self.errors]
            .iter()
            .filter(|n| **n > 0)
            .count()
            > 1
    }
}

/// Aggregate results across multiple rounds
#[derive(Clone, Debug)]
pub struct AggregateResult {
    pub total_rounds: u32,
    pub case_stats: BTreeMap<CaseId, CaseStats>,
    pub overall_pass_rate: f64,
}

impl AggregateResult {
    /// Cases whose outcome changed between rounds
    pub fn inconsistent_cases(&self) -> BTreeSet<&CaseId> {
        self.case_stats
            .iter()
            .filter(|(_, stats)| stats.is_inconsistent())
            .map(|(case, _)| case)
            .collect()
    }

    /// Executed cases sorted by pass rate (lowest first)
    pub fn flaky_tests(&self) -> Vec<(&CaseId, f64)> {
        let mut cases: Vec<_> = self
            .case_stats
            .iter()
            .filter(|(_, stats)| stats.executed() > 0)
            .map(|(case, stats)| (case, stats.pass_rate()))
            .collect();
        cases.sort_by(|a, b| a.1.total_cmp(&b.1));
        cases
    }

    /// True when no round failed or errored
    pub fn is_all_passed(&self) -> bool {
        self.case_stats
            .values()
            .all(|stats| stats.failures == 0 && stats.errors == 0)
    }
}
