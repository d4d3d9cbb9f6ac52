//! Test result models for aggregated suite runs
//!
//! Defines case identifiers, results, and status types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Case name used when a suite exposes no discovery and runs as one unit
pub const WHOLE_SUITE_CASE: &str = "all";

/// Case name reported when discovery itself fails
pub const DISCOVERY_CASE: &str = "<discovery>";

/// Identifies a single test case within a registered suite
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId {
    pub suite: String,
    pub case: String,
}

impl CaseId {
    pub fn new(suite: impl Into<String>, case: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            case: case.into(),
        }
    }

    /// Whether a skip pattern (`alias` or `alias::case`) selects this case
    pub fn matches(&self, pattern: &str) -> bool {
        match pattern.split_once("::") {
            Some((suite, case)) => suite == self.suite && case == self.case,
            None => pattern == self.suite,
        }
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.suite, self.case)
    }
}

/// Test execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Pass => "✓",
            TestStatus::Fail => "✗",
            TestStatus::Skip => "○",
            TestStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }

    /// Whether this status makes the overall run fail
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Fail | TestStatus::Error)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "OK"),
            TestStatus::Fail => write!(f, "FAIL"),
            TestStatus::Skip => write!(f, "SKIP"),
            TestStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of a single case execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestResult {
    pub case: CaseId,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
}

impl TestResult {
    pub fn pass(case: CaseId, duration_ms: u64) -> Self {
        Self {
            case,
            status: TestStatus::Pass,
            duration_ms,
            message: None,
        }
    }

    pub fn fail(case: CaseId, duration_ms: u64, message: impl Into<String>) -> Self {
        Self {
            case,
            status: TestStatus::Fail,
            duration_ms,
            message: Some(message.into()),
        }
    }

    pub fn skip(case: CaseId, reason: impl Into<String>) -> Self {
        Self {
            case,
            status: TestStatus::Skip,
            duration_ms: 0,
            message: Some(reason.into()),
        }
    }

    pub fn error(case: CaseId, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            case,
            status: TestStatus::Error,
            duration_ms,
            message: Some(error.into()),
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ... {} [{}ms]",
            self.status.symbol(),
            self.case,
            self.status,
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of one pass over the registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub round: u32,
    pub label: String,
    pub suites: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total_duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl RunSummary {
    pub fn new(round: u32, label: impl Into<String>, results: Vec<TestResult>) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();

        let total = results.len();
        let passed = count(TestStatus::Pass);
        let failed = count(TestStatus::Fail);
        let skipped = count(TestStatus::Skip);
        let errors = count(TestStatus::Error);
        let total_duration_ms = results.iter().map(|r| r.duration_ms).sum();

        let mut aliases: Vec<&str> = results.iter().map(|r| r.case.suite.as_str()).collect();
        aliases.dedup();
        let suites = aliases.len();

        Self {
            round,
            label: label.into(),
            suites,
            total,
            passed,
            failed,
            skipped,
            errors,
            total_duration_ms,
            results,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        let executed = self.total - self.skipped;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }

    /// True when nothing failed or errored; skipped cases do not count against a run
    pub fn is_all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> u8 {
        if self.is_all_passed() {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.status.is_failure())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Round {} - {}", self.round, self.label)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Ran {} tests in {} suites | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            self.total, self.suites, self.passed, self.failed, self.skipped, self.errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}
