//! External command provider
//!
//! Runs a suite through an external program, e.g. the Python interpreter
//! driving `unittest` against one auxi test class.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{CaseOutcome, ProviderError, SuiteProvider};
use crate::models::WHOLE_SUITE_CASE;

/// Number of output lines kept as the failure message
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Suite backed by an external program
#[derive(Clone, Debug)]
pub struct CommandProvider {
    /// Program to execute (path or name looked up on PATH)
    program: String,

    /// Arguments running the whole suite as one case
    args: Vec<String>,

    /// Arguments printing one case name per line
    discover_args: Option<Vec<String>>,

    /// Arguments running a single discovered case
    case_args: Option<Vec<String>>,

    /// Arguments of a load-time check that must exit 0, e.g. an import
    resolve_args: Option<Vec<String>>,

    /// Value substituted for `{target}`
    target: Option<String>,

    /// Working directory
    workdir: Option<PathBuf>,

    /// Extra environment variables
    env: BTreeMap<String, String>,

    /// Per-invocation timeout; unbounded when unset
    timeout_secs: Option<u64>,
}

impl CommandProvider {
    /// Create a new command provider
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            discover_args: None,
            case_args: None,
            resolve_args: None,
            target: None,
            workdir: None,
            env: BTreeMap::new(),
            timeout_secs: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn discover_with<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.discover_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn case_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.case_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn resolve_with<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolve_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Expand `{target}` and `{case}` placeholders
    fn expand(&self, template: &[String], case: &str) -> Vec<String> {
        let target = self.target.as_deref().unwrap_or_default();
        template
            .iter()
            .map(|arg| arg.replace("{target}", target).replace("{case}", case))
            .collect()
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args).envs(&self.env).kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        command
    }

    /// Run the load-time check to completion; blocks the calling thread
    fn run_check(&self, template: &[String]) -> Result<(), ProviderError> {
        let args = self.expand(template, "");
        debug!("Checking {} {}", self.program, args.join(" "));

        let mut command = std::process::Command::new(&self.program);
        command.args(args).envs(&self.env).stdin(Stdio::null());
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| ProviderError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(ProviderError::CheckFailed {
                status: output.status.to_string(),
                output: diagnostic_tail(&output),
            });
        }
        Ok(())
    }

    async fn execute(&self, args: Vec<String>) -> Result<Output, String> {
        debug!("Spawning {} {}", self.program, args.join(" "));

        let mut command = self.command(args);
        let output = command.output();
        let result = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), output).await {
                Ok(result) => result,
                Err(_) => return Err(format!("Timed out after {secs} seconds")),
            },
            None => output.await,
        };

        result.map_err(|e| format!("Failed to spawn {}: {e}", self.program))
    }
}

#[async_trait]
impl SuiteProvider for CommandProvider {
    fn describe(&self) -> String {
        let args = self.expand(&self.args, WHOLE_SUITE_CASE);
        if args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, args.join(" "))
        }
    }

    fn resolve(&self) -> Result<(), ProviderError> {
        if let Some(dir) = &self.workdir {
            if !dir.is_dir() {
                return Err(ProviderError::MissingWorkdir(dir.clone()));
            }
        }

        if self.discover_args.is_some() && self.case_args.is_none() {
            return Err(ProviderError::MissingCaseArgs);
        }

        // Relative program paths are looked up from the working directory
        let program = match &self.workdir {
            Some(dir) if Path::new(&self.program).components().count() > 1 => {
                dir.join(&self.program).to_string_lossy().into_owned()
            }
            _ => self.program.clone(),
        };

        if locate_program(&program).is_none() {
            return Err(ProviderError::ProgramNotFound(self.program.clone()));
        }

        match &self.resolve_args {
            Some(template) => self.run_check(template),
            None => Ok(()),
        }
    }

    async fn discover(&self) -> Result<Vec<String>, ProviderError> {
        let Some(template) = &self.discover_args else {
            return Ok(vec![WHOLE_SUITE_CASE.to_string()]);
        };

        let output = self
            .execute(self.expand(template, ""))
            .await
            .map_err(|reason| ProviderError::Spawn {
                program: self.program.clone(),
                reason,
            })?;

        if !output.status.success() {
            return Err(ProviderError::DiscoveryFailed {
                status: output.status.to_string(),
                output: diagnostic_tail(&output),
            });
        }

        let cases: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if cases.is_empty() {
            return Err(ProviderError::NoCases);
        }

        Ok(cases)
    }

    async fn run_case(&self, case: &str) -> CaseOutcome {
        let template = match (&self.case_args, case) {
            (_, WHOLE_SUITE_CASE) | (None, _) => &self.args,
            (Some(case_args), _) => case_args,
        };

        match self.execute(self.expand(template, case)).await {
            Ok(output) if output.status.success() => CaseOutcome::Passed,
            Ok(output) => CaseOutcome::Failed(diagnostic_tail(&output)),
            Err(reason) => CaseOutcome::Errored(reason),
        }
    }
}

/// Find an executable either by path or on PATH
pub fn locate_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .flat_map(|dir| {
            [
                dir.join(program),
                dir.join(format!("{program}{}", env::consts::EXE_SUFFIX)),
            ]
        })
        .find(|candidate| candidate.is_file())
}

/// Last lines of stderr, falling back to stdout
fn diagnostic_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };

    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    let tail = lines[start..].join("\n");

    if tail.is_empty() {
        format!("exited with {}", output.status)
    } else {
        tail
    }
}
