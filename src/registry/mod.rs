//! Suite registry
//!
//! An ordered alias → provider mapping. It is built and resolved once at
//! startup and never mutated afterwards; filtering produces a new registry.

mod auxi;

pub use auxi::{auxi_provider, auxi_registry, AUXI_SUITES};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::providers::{ProviderError, SuiteProvider};

/// Registry construction errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Duplicate suite alias: {0}")]
    DuplicateAlias(String),

    #[error("Registry contains no suites")]
    Empty,

    #[error("Suite '{alias}' could not be resolved: {source}")]
    Unresolved {
        alias: String,
        #[source]
        source: ProviderError,
    },

    #[error("Unknown suite alias: {0}")]
    UnknownAlias(String),
}

/// Handle to one registered suite
#[derive(Clone)]
pub struct SuiteRef {
    alias: String,
    provider: Arc<dyn SuiteProvider>,
}

impl SuiteRef {
    pub fn new(alias: impl Into<String>, provider: Arc<dyn SuiteProvider>) -> Self {
        Self {
            alias: alias.into(),
            provider,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn provider(&self) -> &Arc<dyn SuiteProvider> {
        &self.provider
    }
}

impl fmt::Debug for SuiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRef")
            .field("alias", &self.alias)
            .field("provider", &self.provider.describe())
            .finish()
    }
}

/// Immutable, resolved set of suites
#[derive(Clone, Debug)]
pub struct Registry {
    suites: Vec<SuiteRef>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuiteRef> {
        self.suites.iter()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.suites.iter().map(|s| s.alias()).collect()
    }

    pub fn get(&self, alias: &str) -> Option<&SuiteRef> {
        self.suites.iter().find(|s| s.alias == alias)
    }

    /// Restrict to the given aliases, keeping registry order
    pub fn select(&self, aliases: &[String]) -> Result<Registry, RegistryError> {
        if let Some(unknown) = aliases.iter().find(|a| self.get(a).is_none()) {
            return Err(RegistryError::UnknownAlias(unknown.clone()));
        }

        let suites: Vec<SuiteRef> = self
            .suites
            .iter()
            .filter(|s| aliases.iter().any(|a| a == &s.alias))
            .cloned()
            .collect();

        if suites.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Registry { suites })
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a SuiteRef;
    type IntoIter = std::slice::Iter<'a, SuiteRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.suites.iter()
    }
}

/// Collects suites, then validates and resolves them in [`RegistryBuilder::build`]
#[derive(Default)]
pub struct RegistryBuilder {
    suites: Vec<SuiteRef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(self, alias: impl Into<String>, provider: P) -> Self
    where
        P: SuiteProvider + 'static,
    {
        self.register_shared(alias, Arc::new(provider))
    }

    pub fn register_shared(
        mut self,
        alias: impl Into<String>,
        provider: Arc<dyn SuiteProvider>,
    ) -> Self {
        self.suites.push(SuiteRef::new(alias, provider));
        self
    }

    /// Suites registered so far, in order
    pub fn suites(&self) -> &[SuiteRef] {
        &self.suites
    }

    /// Non-empty with unique aliases; providers are not touched
    pub fn check_aliases(&self) -> Result<(), RegistryError> {
        if self.suites.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for suite in &self.suites {
            if !seen.insert(suite.alias.as_str()) {
                return Err(RegistryError::DuplicateAlias(suite.alias.clone()));
            }
        }
        Ok(())
    }

    /// Check aliases and resolve every provider, stopping at the first failure
    pub fn build(self) -> Result<Registry, RegistryError> {
        self.check_aliases()?;

        for suite in &self.suites {
            suite
                .provider
                .resolve()
                .map_err(|source| RegistryError::Unresolved {
                    alias: suite.alias.clone(),
                    source,
                })?;
            debug!("Resolved {} -> {}", suite.alias, suite.provider.describe());
        }

        Ok(Registry {
            suites: self.suites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CommandProvider, InlineSuite};

    fn passing() -> InlineSuite {
        InlineSuite::new().case("test_ok", || Ok(()))
    }

    #[test]
    fn test_build_keeps_order() {
        let registry = Registry::builder()
            .register("object_test_all", passing())
            .register("namedobject_test_all", passing())
            .register("stoich_test_all", passing())
            .build()
            .unwrap();

        assert_eq!(
            registry.aliases(),
            vec!["object_test_all", "namedobject_test_all", "stoich_test_all"]
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(matches!(
            Registry::builder().build(),
            Err(RegistryError::Empty)
        ));
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let result = Registry::builder()
            .register("object_test_all", passing())
            .register("object_test_all", passing())
            .build();

        assert!(matches!(result, Err(RegistryError::DuplicateAlias(a)) if a == "object_test_all"));
    }

    #[test]
    fn test_unresolved_provider_rejected() {
        let result = Registry::builder()
            .register("object_test_all", passing())
            .register(
                "stoich_test_all",
                CommandProvider::new("definitely-not-a-real-program-xyz"),
            )
            .build();

        match result {
            Err(RegistryError::Unresolved { alias, source }) => {
                assert_eq!(alias, "stoich_test_all");
                assert!(matches!(source, ProviderError::ProgramNotFound(_)));
            }
            other => panic!("Expected unresolved error, got {other:?}"),
        }
    }

    #[test]
    fn test_check_aliases_skips_resolution() {
        let builder = Registry::builder()
            .register("object_test_all", passing())
            .register(
                "stoich_test_all",
                CommandProvider::new("definitely-not-a-real-program-xyz"),
            );
        assert!(builder.check_aliases().is_ok());
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_select_subset() {
        let registry = Registry::builder()
            .register("object_test_all", passing())
            .register("namedobject_test_all", passing())
            .register("stoich_test_all", passing())
            .build()
            .unwrap();

        let subset = registry
            .select(&["stoich_test_all".to_string(), "object_test_all".to_string()])
            .unwrap();
        assert_eq!(subset.aliases(), vec!["object_test_all", "stoich_test_all"]);

        assert!(matches!(
            registry.select(&["missing".to_string()]),
            Err(RegistryError::UnknownAlias(_))
        ));
    }
}
