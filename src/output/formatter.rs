//! Output formatters for test results
//!
//! Provides Table, JSON, CSV and one-line summary output formats.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::executor::AggregateResult;
use crate::models::{RunSummary, TestResult, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn status_label(&self, status: TestStatus) -> String {
        let plain = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return plain;
        }
        let color = match status {
            TestStatus::Pass => "32",
            TestStatus::Skip => "33",
            TestStatus::Fail | TestStatus::Error => "31",
        };
        format!("\x1b[{color}m{plain}\x1b[0m")
    }

    fn format_result_table(&self, result: &TestResult) -> String {
        format!(
            "{:60} {} [{:>6}ms]",
            result.case.to_string(),
            self.status_label(result.status),
            result.duration_ms
        )
    }

    /// Format a full round: per-case lines, diagnostics for failures, counts
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => to_json(summary, false),
            OutputFormat::JsonPretty => to_json(summary, true),
            OutputFormat::Csv => format_summary_csv(summary),
            OutputFormat::Summary => format!(
                "{} - Round {}: {}/{} passed, {} failed, {} errors, {} skipped ({:.1}%) in {}ms",
                summary.label,
                summary.round,
                summary.passed,
                summary.total,
                summary.failed,
                summary.errors,
                summary.skipped,
                summary.pass_rate(),
                summary.total_duration_ms
            ),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        let rule = "═".repeat(78);

        output.push_str(&format!("\n{rule}\n"));
        output.push_str(&format!(" Round {} - {}\n", summary.round, summary.label));
        output.push_str(&format!("{rule}\n"));

        for result in &summary.results {
            output.push_str(&format!(" {}\n", self.format_result_table(result)));
        }

        let failures: Vec<_> = summary.failures().collect();
        for failure in &failures {
            output.push_str(&format!("\n{}\n", "─".repeat(78)));
            output.push_str(&format!("{}: {}\n", failure.status, failure.case));
            output.push_str(&format!("{}\n", "─".repeat(78)));
            if let Some(message) = &failure.message {
                output.push_str(message);
                output.push('\n');
            }
        }

        output.push_str(&format!("{rule}\n"));
        output.push_str(&format!(
            " Ran {} tests in {} suites in {}ms\n",
            summary.total, summary.suites, summary.total_duration_ms
        ));

        let verdict = if summary.is_all_passed() {
            "OK".to_string()
        } else {
            format!(
                "FAILED (failures={}, errors={})",
                summary.failed, summary.errors
            )
        };
        let verdict = match (self.colorize, summary.is_all_passed()) {
            (true, true) => format!("\x1b[32m{verdict}\x1b[0m"),
            (true, false) => format!("\x1b[31m{verdict}\x1b[0m"),
            (false, _) => verdict,
        };

        if summary.skipped > 0 {
            output.push_str(&format!(" {verdict} (skipped={})\n", summary.skipped));
        } else {
            output.push_str(&format!(" {verdict}\n"));
        }

        output
    }

    /// Format aggregate results across rounds
    pub fn format_aggregate(&self, aggregate: &AggregateResult) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                #[derive(Serialize)]
                struct AggregateJson {
                    total_rounds: u32,
                    overall_pass_rate: f64,
                    inconsistent: Vec<String>,
                    case_pass_rates: Vec<(String, f64)>,
                }

                let json = AggregateJson {
                    total_rounds: aggregate.total_rounds,
                    overall_pass_rate: aggregate.overall_pass_rate,
                    inconsistent: aggregate
                        .inconsistent_cases()
                        .into_iter()
                        .map(|c| c.to_string())
                        .collect(),
                    case_pass_rates: aggregate
                        .case_stats
                        .iter()
                        .map(|(case, stats)| (case.to_string(), stats.pass_rate()))
                        .collect(),
                };
                to_json(&json, self.format == OutputFormat::JsonPretty)
            }
            _ => self.format_aggregate_table(aggregate),
        }
    }

    fn format_aggregate_table(&self, aggregate: &AggregateResult) -> String {
        let mut output = String::new();
        let rule = "═".repeat(78);

        output.push_str(&format!("\n{rule}\n"));
        output.push_str(&format!(
            " Aggregate Results ({} rounds)\n",
            aggregate.total_rounds
        ));
        output.push_str(&format!("{rule}\n"));
        output.push_str(&format!(
            " Overall Pass Rate: {:.1}%\n",
            aggregate.overall_pass_rate
        ));

        let inconsistent = aggregate.inconsistent_cases();
        if inconsistent.is_empty() {
            output.push_str(" Outcomes were consistent across all rounds\n");
        } else {
            output.push_str("\n Inconsistent cases:\n");
            for case in inconsistent {
                let rate = aggregate.case_stats[case].pass_rate();
                output.push_str(&format!("   - {case} ({rate:.1}%)\n"));
            }
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.unwrap_or_default()
}

/// One CSV line per case result, shared by `--output` and `results --export`
#[derive(Debug, Serialize)]
pub struct CsvRecord<'a> {
    pub round: u32,
    pub suite: &'a str,
    pub case: &'a str,
    pub status: String,
    pub duration_ms: u64,
    pub message: &'a str,
}

impl<'a> CsvRecord<'a> {
    pub fn new(round: u32, result: &'a TestResult) -> Self {
        Self {
            round,
            suite: &result.case.suite,
            case: &result.case.case,
            status: result.status.to_string(),
            duration_ms: result.duration_ms,
            message: result.message.as_deref().unwrap_or(""),
        }
    }
}

/// Write every result of the given rounds, header first
pub fn write_csv<'a, W, I>(writer: W, summaries: I) -> csv::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a RunSummary>,
{
    let mut csv = csv::Writer::from_writer(writer);
    for summary in summaries {
        for result in &summary.results {
            csv.serialize(CsvRecord::new(summary.round, result))?;
        }
    }
    csv.flush()?;
    Ok(())
}

fn format_summary_csv(summary: &RunSummary) -> String {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, [summary])
        .map(|()| String::from_utf8_lossy(&buffer).into_owned())
        .unwrap_or_default()
}

/// Write a round summary to a file
pub fn write_results_to_file(
    path: impl AsRef<Path>,
    summary: &RunSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
