//! In-process suites built from Rust closures

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::{CaseOutcome, ProviderError, SuiteProvider};

type CaseFn = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

/// Suite whose cases are plain functions returning `Err(message)` on failure.
/// A panicking case is reported as an error rather than a failure.
#[derive(Clone, Default)]
pub struct InlineSuite {
    cases: Vec<(String, CaseFn)>,
}

impl InlineSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named case
    pub fn case<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        self.cases.push((name.into(), Arc::new(f)));
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl fmt::Debug for InlineSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineSuite")
            .field("cases", &self.cases.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl SuiteProvider for InlineSuite {
    fn describe(&self) -> String {
        format!("inline ({} cases)", self.cases.len())
    }

    fn resolve(&self) -> Result<(), ProviderError> {
        if self.cases.is_empty() {
            return Err(ProviderError::NoCases);
        }
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.cases.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn run_case(&self, case: &str) -> CaseOutcome {
        let Some((_, f)) = self.cases.iter().find(|(name, _)| name == case) else {
            return CaseOutcome::Errored(format!("Unknown case: {case}"));
        };

        let f = Arc::clone(f);
        match tokio::task::spawn_blocking(move || f()).await {
            Ok(Ok(())) => CaseOutcome::Passed,
            Ok(Err(message)) => CaseOutcome::Failed(message),
            Err(e) if e.is_panic() => CaseOutcome::Errored(panic_message(e.into_panic())),
            Err(e) => CaseOutcome::Errored(e.to_string()),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
