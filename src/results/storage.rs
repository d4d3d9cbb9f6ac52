//! Run history on disk
//!
//! Every stored run is one pretty-printed JSON file under
//! `<base_dir>/<label>/<run id>.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::executor::AggregateResult;
use crate::models::RunSummary;
use crate::output::write_csv;

/// One invocation of the aggregator, possibly spanning several rounds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    pub id: String,
    pub label: String,
    /// Aliases selected for the run, in registry order
    pub suites: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub summaries: Vec<RunSummary>,
    /// Only present for multi-round runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<RoundsDigest>,
    pub host: HostInfo,
}

/// Cross-round figures kept with a multi-round run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundsDigest {
    pub rounds: u32,
    pub overall_pass_rate: f64,
    pub worst_pass_rate: f64,
    pub total_duration_ms: u64,
    /// Cases whose outcome changed between rounds, as `alias::case`
    pub inconsistent: Vec<String>,
}

/// Machine the run happened on
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
    pub runner_version: String,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            runner_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl StoredRun {
    pub fn new(label: impl Into<String>, suites: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_run_id(now),
            label: label.into(),
            suites,
            started_at: now,
            completed_at: now,
            summaries: Vec::new(),
            digest: None,
            host: HostInfo::current(),
        }
    }

    pub fn add_round(&mut self, summary: RunSummary) {
        self.summaries.push(summary);
        self.completed_at = Utc::now();
    }

    /// Attach the cross-round statistics computed by the batch runner
    pub fn set_aggregate(&mut self, aggregate: &AggregateResult) {
        if self.summaries.is_empty() {
            return;
        }

        let worst_pass_rate = self
            .summaries
            .iter()
            .map(RunSummary::pass_rate)
            .fold(100.0, f64::min);

        self.digest = Some(RoundsDigest {
            rounds: aggregate.total_rounds,
            overall_pass_rate: aggregate.overall_pass_rate,
            worst_pass_rate,
            total_duration_ms: self.summaries.iter().map(|s| s.total_duration_ms).sum(),
            inconsistent: aggregate
                .inconsistent_cases()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        });
    }

    /// A run passes only if each of its rounds did
    pub fn passed(&self) -> bool {
        !self.summaries.is_empty() && self.summaries.iter().all(RunSummary::is_all_passed)
    }

    pub fn pass_rate(&self) -> f64 {
        if let Some(digest) = &self.digest {
            return digest.overall_pass_rate;
        }
        match self.summaries.len() {
            0 => 0.0,
            n => self.summaries.iter().map(RunSummary::pass_rate).sum::<f64>() / n as f64,
        }
    }
}

/// `20261017T093012-3fa2`: sortable timestamp plus a random suffix
fn generate_run_id(now: DateTime<Utc>) -> String {
    format!("{}-{:04x}", now.format("%Y%m%dT%H%M%S"), rand::random::<u16>())
}

/// Directory name for a label: lowercase, with anything but ASCII
/// alphanumerics, `-` and `_` replaced so the path stays under the base dir
fn label_dir_name(label: &str) -> String {
    let name: String = label
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect();
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}

/// Listing entry for `auxi-suites results`
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub rounds: usize,
    pub passed: bool,
    pub pass_rate: f64,
}

impl From<&StoredRun> for RunInfo {
    fn from(run: &StoredRun) -> Self {
        Self {
            id: run.id.clone(),
            started_at: run.started_at,
            rounds: run.summaries.len(),
            passed: run.passed(),
            pass_rate: run.pass_rate(),
        }
    }
}

/// File-backed run history
#[derive(Clone, Debug)]
pub struct ResultsStorage {
    base_dir: PathBuf,
}

impl ResultsStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `<data dir>/auxi-suites/results`, falling back to the working directory
    pub fn default_dir() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(data_dir.join("auxi-suites").join("results"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn label_dir(&self, label: &str) -> PathBuf {
        self.base_dir.join(label_dir_name(label))
    }

    fn run_path(&self, label: &str, run_id: &str) -> PathBuf {
        self.label_dir(label).join(run_id).with_extension("json")
    }

    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        let dir = self.label_dir(&run.label);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = self.run_path(&run.label, &run.id);
        let json = serde_json::to_string_pretty(run).context("Failed to serialize run")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Stored run {} in {}", run.id, path.display());
        Ok(path)
    }

    pub fn load(&self, label: &str, run_id: &str) -> Result<StoredRun> {
        self.load_from_path(&self.run_path(label, run_id))
    }

    pub fn load_from_path(&self, path: &Path) -> Result<StoredRun> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Every readable run for a label, newest first; unreadable files are skipped
    pub fn load_all(&self, label: &str) -> Result<Vec<StoredRun>> {
        let dir = self.label_dir(label);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_from_path(&path) {
                Ok(run) => runs.push(run),
                Err(e) => debug!("Skipping {}: {:#}", path.display(), e),
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        Ok(runs)
    }

    pub fn list_runs(&self, label: &str) -> Result<Vec<RunInfo>> {
        Ok(self.load_all(label)?.iter().map(RunInfo::from).collect())
    }

    pub fn latest(&self, label: &str) -> Result<Option<StoredRun>> {
        Ok(self.load_all(label)?.into_iter().next())
    }

    /// Remove a stored run; returns whether a file was deleted
    pub fn delete(&self, label: &str, run_id: &str) -> Result<bool> {
        let path = self.run_path(label, run_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        info!("Deleted run {}", run_id);
        Ok(true)
    }

    /// Write a run as JSON, or as one CSV row per case result
    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let json = serde_json::to_string_pretty(run)?;
                fs::write(path, json)?;
            }
            ExportFormat::Csv => {
                let file = fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_csv(file, &run.summaries)?;
            }
        }

        info!("Exported run {} to {}", run.id, path.display());
        Ok(())
    }
}

/// Export file format, picked from the target file's extension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("json") {
            Some(ExportFormat::Json)
        } else if name.eq_ignore_ascii_case("csv") {
            Some(ExportFormat::Csv)
        } else {
            None
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::BatchRunner;
    use crate::models::{CaseId, TestResult};
    use tempfile::tempdir;

    fn ledger(case: &str) -> CaseId {
        CaseId::new("generalledger_test_all", case)
    }

    fn stored(rounds: Vec<Vec<TestResult>>) -> StoredRun {
        let mut run = StoredRun::new("auxi_suites", vec!["generalledger_test_all".to_string()]);
        for (i, results) in rounds.into_iter().enumerate() {
            run.add_round(RunSummary::new(i as u32 + 1, "auxi_suites", results));
        }
        run
    }

    #[test]
    fn test_single_round_run() {
        let run = stored(vec![vec![
            TestResult::pass(ledger("test_post"), 4),
            TestResult::fail(ledger("test_close"), 2, "unbalanced"),
        ]]);

        assert!(!run.passed());
        assert_eq!(run.pass_rate(), 50.0);
        assert!(run.digest.is_none());
    }

    #[test]
    fn test_digest_flags_inconsistent_cases() {
        let mut run = stored(vec![
            vec![TestResult::pass(ledger("test_post"), 4)],
            vec![TestResult::fail(ledger("test_post"), 5, "flaky")],
        ]);
        let aggregate = BatchRunner::aggregate_results(&run.summaries);
        run.set_aggregate(&aggregate);

        let digest = run.digest.as_ref().unwrap();
        assert_eq!(digest.rounds, 2);
        assert_eq!(digest.worst_pass_rate, 0.0);
        assert_eq!(digest.total_duration_ms, 9);
        assert_eq!(digest.inconsistent, vec!["generalledger_test_all::test_post"]);
        assert!(!run.passed());
    }

    #[test]
    fn test_empty_run_never_passes() {
        let run = StoredRun::new("auxi_suites", Vec::new());
        assert!(!run.passed());
        assert_eq!(run.pass_rate(), 0.0);
    }

    #[test]
    fn test_save_list_latest_delete() {
        let dir = tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());
        let run = stored(vec![vec![TestResult::pass(ledger("test_post"), 4)]]);

        let path = storage.save(&run).unwrap();
        assert!(path.starts_with(dir.path().join("auxi_suites")));

        let loaded = storage.load("auxi_suites", &run.id).unwrap();
        assert_eq!(loaded.suites, run.suites);
        assert!(loaded.passed());

        let runs = storage.list_runs("auxi_suites").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].rounds, 1);
        assert!(storage.list_runs("other").unwrap().is_empty());

        assert_eq!(storage.latest("auxi_suites").unwrap().unwrap().id, run.id);
        assert!(storage.delete("auxi_suites", &run.id).unwrap());
        assert!(!storage.delete("auxi_suites", &run.id).unwrap());
        assert!(storage.latest("auxi_suites").unwrap().is_none());
    }

    #[test]
    fn test_label_cannot_escape_base_dir() {
        assert_eq!(label_dir_name("Auxi_Suites"), "auxi_suites");
        assert_eq!(label_dir_name("../x"), "___x");
        assert_eq!(label_dir_name(""), "_");

        let dir = tempdir().unwrap();
        let base = dir.path().join("results");
        let storage = ResultsStorage::new(&base);
        let mut run = stored(vec![vec![TestResult::pass(ledger("test_post"), 1)]]);
        run.label = "../../outside".to_string();

        let path = storage.save(&run).unwrap();
        assert!(path.starts_with(&base));
        assert_eq!(storage.latest("../../outside").unwrap().unwrap().id, run.id);
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());
        storage
            .save(&stored(vec![vec![TestResult::pass(ledger("test_post"), 1)]]))
            .unwrap();
        fs::write(dir.path().join("auxi_suites").join("broken.json"), "{").unwrap();

        assert_eq!(storage.load_all("auxi_suites").unwrap().len(), 1);
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let storage = ResultsStorage::new(dir.path());
        let run = stored(vec![vec![TestResult::fail(
            CaseId::new("transaction_test_all", "test_amount"),
            3,
            "expected 10, got 12",
        )]]);

        let path = dir.path().join("export.csv");
        storage.export(&run, &path, ExportFormat::Csv).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("round,suite,case,status,duration_ms,message"));
        assert_eq!(
            lines.next(),
            Some("1,transaction_test_all,test_amount,FAIL,3,\"expected 10, got 12\"")
        );
    }

    #[test]
    fn test_export_format_from_extension() {
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(
            ExportFormat::from_extension(Path::new("out.CSV")),
            Some(ExportFormat::Csv)
        );
        assert_eq!(ExportFormat::from_extension(Path::new("out.txt")), None);
    }

    #[test]
    fn test_host_info() {
        let host = HostInfo::current();
        assert!(!host.os.is_empty());
        assert_eq!(host.runner_version, env!("CARGO_PKG_VERSION"));
    }
}
