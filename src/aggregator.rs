//! Test aggregator
//!
//! Owns the resolved [`Registry`] and hands it to an [`Engine`]. Every run
//! writes exactly one identifying label line before the engine's report.

use anyhow::{Context, Result};
use std::io::Write;

use crate::executor::{AggregateResult, BatchRunner, Engine};
use crate::models::RunSummary;
use crate::output::ResultFormatter;
use crate::registry::Registry;

/// Outcome of [`Aggregator::run_rounds`]
#[derive(Clone, Debug)]
pub struct RoundsReport {
    pub summaries: Vec<RunSummary>,
    pub aggregate: AggregateResult,
}

impl RoundsReport {
    /// Process exit status: non-zero if any round had a failure or error
    pub fn exit_code(&self) -> u8 {
        self.summaries
            .iter()
            .map(RunSummary::exit_code)
            .max()
            .unwrap_or(0)
    }
}

pub struct Aggregator {
    label: String,
    registry: Registry,
    formatter: ResultFormatter,
}

impl Aggregator {
    pub fn new(label: impl Into<String>, registry: Registry) -> Self {
        Self {
            label: label.into(),
            registry,
            formatter: ResultFormatter::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: ResultFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run every registered suite once.
    ///
    /// Writes the label line, delegates to `engine`, then writes its report.
    /// Engine errors are returned untouched.
    pub async fn run_all<W: Write>(&self, engine: &dyn Engine, out: &mut W) -> Result<RunSummary> {
        self.write_label(out)?;

        let summary = engine.execute(&self.registry, 1).await?;

        writeln!(out, "{}", self.formatter.format_summary(&summary))
            .context("Failed to write report")?;
        Ok(summary)
    }

    /// Run every registered suite `rounds` times and report the aggregate
    pub async fn run_rounds<W: Write>(
        &self,
        engine: &dyn Engine,
        rounds: u32,
        out: &mut W,
    ) -> Result<RoundsReport> {
        self.write_label(out)?;

        let summaries = BatchRunner::new(rounds)
            .run_rounds(engine, &self.registry)
            .await?;

        for summary in &summaries {
            writeln!(out, "{}", self.formatter.format_summary(summary))
                .context("Failed to write report")?;
        }

        let aggregate = BatchRunner::aggregate_results(&summaries);
        writeln!(out, "{}", self.formatter.format_aggregate(&aggregate))
            .context("Failed to write report")?;

        Ok(RoundsReport {
            summaries,
            aggregate,
        })
    }

    fn write_label<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.label).context("Failed to write run label")?;
        out.flush().context("Failed to flush output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutionOptions, ParallelExecutor, TestRunner};
    use crate::output::OutputFormat;
    use crate::providers::InlineSuite;
    use async_trait::async_trait;

    fn aggregator(failing: bool) -> Aggregator {
        let registry = Registry::builder()
            .register(
                "object_test_all",
                InlineSuite::new().case("test_construct", || Ok(())),
            )
            .register(
                "namedobject_test_all",
                InlineSuite::new().case("test_name", move || {
                    if failing {
                        Err("name mismatch".to_string())
                    } else {
                        Ok(())
                    }
                }),
            )
            .build()
            .unwrap();

        Aggregator::new("auxi_suites", registry)
            .with_formatter(ResultFormatter::new(OutputFormat::Table).no_color())
    }

    fn engine() -> TestRunner {
        TestRunner::new(ExecutionOptions::new("auxi_suites"))
    }

    #[tokio::test]
    async fn test_run_all_writes_label_then_report() {
        let mut out = Vec::new();
        let summary = aggregator(false).run_all(&engine(), &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("auxi_suites"));
        assert_eq!(text.lines().filter(|l| *l == "auxi_suites").count(), 1);
        assert!(text.contains("object_test_all::test_construct"));
        assert!(text.trim_end().ends_with("OK"));

        assert_eq!(summary.total, 2);
        assert_eq!(summary.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_run_all_failure_exit_code() {
        let mut out = Vec::new();
        let summary = aggregator(true)
            .run_all(&ParallelExecutor::new(2, ExecutionOptions::new("auxi_suites")), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_ne!(summary.exit_code(), 0);
        assert!(String::from_utf8(out).unwrap().contains("name mismatch"));
    }

    struct BrokenEngine;

    #[async_trait]
    impl Engine for BrokenEngine {
        async fn execute(&self, _registry: &Registry, _round: u32) -> Result<RunSummary> {
            anyhow::bail!("engine could not load suites")
        }
    }

    #[tokio::test]
    async fn test_engine_error_propagates_after_label() {
        let mut out = Vec::new();
        let err = aggregator(false)
            .run_all(&BrokenEngine, &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "engine could not load suites");
        assert_eq!(String::from_utf8(out).unwrap(), "auxi_suites\n");
    }

    #[tokio::test]
    async fn test_run_rounds_consistent() {
        let mut out = Vec::new();
        let report = aggregator(false)
            .run_rounds(&engine(), 3, &mut out)
            .await
            .unwrap();

        assert_eq!(report.summaries.len(), 3);
        assert_eq!(report.exit_code(), 0);
        assert!(report.aggregate.inconsistent_cases().is_empty());

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some("auxi_suites"));
        assert!(text.contains("Aggregate Results (3 rounds)"));
    }
}
