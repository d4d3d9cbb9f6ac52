//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::AppConfig;
use crate::providers::CommandProvider;
use crate::registry::{auxi_registry, RegistryBuilder};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./auxi-suites.yaml",
    "./auxi-suites.yml",
    "./.auxi-suites.yaml",
    "~/.config/auxi-suites/config.yaml",
];

/// Supported config file versions
const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Custom suites; the built-in auxi suites are used when empty
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            suites: Vec::new(),
        }
    }
}

/// One externally defined suite
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Unique alias
    pub alias: String,

    /// Program to run
    pub command: String,

    /// Arguments running the whole suite
    #[serde(default)]
    pub args: Vec<String>,

    /// Arguments listing case names, one per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discover: Option<Vec<String>>,

    /// Arguments running one case; `{case}` is replaced by its name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_args: Option<Vec<String>>,

    /// Arguments of a check run while loading; a non-zero exit aborts startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve: Option<Vec<String>>,

    /// Value substituted for `{target}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Timeout override for this suite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl SuiteConfig {
    /// Build the provider, falling back to application-wide settings
    pub fn to_provider(&self, app: &AppConfig) -> CommandProvider {
        let mut provider = CommandProvider::new(&self.command)
            .args(self.args.iter().cloned())
            .timeout(self.timeout_secs.or(app.timeout_secs));

        if let Some(discover) = &self.discover {
            provider = provider.discover_with(discover.iter().cloned());
        }
        if let Some(case_args) = &self.case_args {
            provider = provider.case_args(case_args.iter().cloned());
        }
        if let Some(resolve) = &self.resolve {
            provider = provider.resolve_with(resolve.iter().cloned());
        }
        if let Some(target) = &self.target {
            provider = provider.target(target);
        }
        if let Some(dir) = self.workdir.as_ref().or(app.source_dir.as_ref()) {
            provider = provider.workdir(dir);
        }
        for (key, value) in &self.env {
            provider = provider.env(key, value);
        }

        provider
    }
}

impl ConfigFile {
    /// Create a new config file with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::find() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        if self.app.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }

        if self.app.rounds == 0 {
            anyhow::bail!("rounds must be at least 1");
        }

        let mut aliases = HashSet::new();
        for suite in &self.suites {
            if suite.alias.trim().is_empty() {
                anyhow::bail!("Suite alias must not be empty");
            }
            if suite.command.trim().is_empty() {
                anyhow::bail!("Suite '{}' has an empty command", suite.alias);
            }
            if !aliases.insert(suite.alias.as_str()) {
                anyhow::bail!("Duplicate suite alias '{}'", suite.alias);
            }
        }

        Ok(())
    }

    /// Registry builder for the configured suites
    pub fn registry(&self) -> RegistryBuilder {
        if self.suites.is_empty() {
            return auxi_registry(&self.app);
        }

        self.suites
            .iter()
            .fold(RegistryBuilder::new(), |builder, suite| {
                builder.register(suite.alias.clone(), suite.to_provider(&self.app))
            })
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            version: default_version(),
            app: AppConfig {
                source_dir: Some(PathBuf::from("./auxi")),
                timeout_secs: Some(300),
                skip: vec!["psd_test_material_package".to_string()],
                ..AppConfig::default()
            },
            suites: Vec::new(),
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AUXI_SUITES;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_file() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.suites.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auxi-suites.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.app.timeout_secs, Some(300));
        assert_eq!(loaded.app.skip, vec!["psd_test_material_package"]);
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ConfigFile::new();
        config.app.parallel = true;
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert!(loaded.app.parallel);
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let config = ConfigFile {
            version: "9.9".to_string(),
            ..ConfigFile::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = ConfigFile::default();
        config.app.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_suites_from_yaml() {
        let yaml = r#"
version: "1.0"
suites:
  - alias: ledger
    command: sh
    args: ["-c", "exit 0"]
  - alias: ledger
    command: sh
"#;
        let config: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.suites.len(), 2);
        assert!(config.validate().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_registry_uses_auxi_wiring_by_default() {
        // `true` accepts the import check; the suites are not run here
        let mut config = ConfigFile::default();
        config.app.python = "true".to_string();

        let registry = config.registry().build().unwrap();
        assert_eq!(registry.len(), AUXI_SUITES.len());
        assert_eq!(registry.aliases()[0], "object_test_all");
    }

    #[cfg(unix)]
    #[test]
    fn test_registry_uses_custom_suites() {
        let yaml = r#"
suites:
  - alias: ledger_smoke
    command: sh
    args: ["-c", "exit 0"]
"#;
        let config: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        let registry = config.registry().build().unwrap();
        assert_eq!(registry.aliases(), vec!["ledger_smoke"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_custom_suite_resolve_check_aborts_build() {
        let yaml = r#"
suites:
  - alias: ledger_smoke
    command: sh
    args: ["-c", "exit 0"]
    resolve: ["-c", "test -d {target}"]
    target: /definitely/not/a/checkout
"#;
        let config: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert!(config.registry().build().is_err());
    }

    #[test]
    fn test_suite_inherits_app_timeout() {
        let suite = SuiteConfig {
            alias: "ledger".to_string(),
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "true".to_string()],
            discover: None,
            case_args: None,
            resolve: None,
            target: None,
            workdir: None,
            env: BTreeMap::new(),
            timeout_secs: None,
        };
        let app = AppConfig {
            timeout_secs: Some(7),
            ..AppConfig::default()
        };
        let provider = suite.to_provider(&app);
        assert!(format!("{provider:?}").contains("timeout_secs: Some(7)"));
    }
}
