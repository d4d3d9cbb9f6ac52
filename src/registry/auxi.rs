//! Built-in wiring of the auxi test classes
//!
//! Each auxi test class is run through the Python interpreter's `unittest`
//! module. When case discovery is enabled the test method names are listed
//! through `unittest.TestLoader` and run one at a time. Every test class is
//! imported once while the registry is built, so a missing or broken module
//! stops the run before anything executes.

use super::RegistryBuilder;
use crate::config::AppConfig;
use crate::providers::CommandProvider;

/// Alias → dotted path of the auxi test class, in reporting order
pub const AUXI_SUITES: &[(&str, &str)] = &[
    ("object_test_all", "auxi.core.object_test.TestAllFunctions"),
    (
        "namedobject_test_all",
        "auxi.core.namedobject_test.TestAllFunctions",
    ),
    (
        "stoich_test_all",
        "auxi.tools.chemistry.stoichiometry_test.TestAllFunctions",
    ),
    (
        "thermo_test_all",
        "auxi.tools.chemistry.thermochemistry_test.TestAllFunctions",
    ),
    (
        "transactiontemplate_test_all",
        "auxi.modeling.financial.des.transactiontemplate_test.TestAllFunctions",
    ),
    (
        "transaction_test_all",
        "auxi.modeling.financial.des.transaction_test.TestAllFunctions",
    ),
    (
        "generalledgeraccount_test_all",
        "auxi.modeling.financial.des.generalledgeraccount_test.TestAllFunctions",
    ),
    (
        "generalledgerstructure_test_all",
        "auxi.modeling.financial.des.generalledgerstructure_test.TestAllFunctions",
    ),
    (
        "generalledger_test_all",
        "auxi.modeling.financial.des.generalledger_test.TestAllFunctions",
    ),
    (
        "chem_test_material",
        "auxi.modeling.process.materials.chemistry.material_test.TestMaterial",
    ),
    (
        "chem_test_material_package",
        "auxi.modeling.process.materials.chemistry.material_test.TestMaterialPackage",
    ),
    (
        "thermo_test_material",
        "auxi.modeling.process.materials.thermochemistry.material_test.TestMaterial",
    ),
    (
        "thermo_test_material_package",
        "auxi.modeling.process.materials.thermochemistry.material_test.TestMaterialPackage",
    ),
    (
        "psd_test_material",
        "auxi.modeling.process.materials.psd.material_test.TestMaterial",
    ),
    (
        "psd_test_material_package",
        "auxi.modeling.process.materials.psd.material_test.TestMaterialPackage",
    ),
];

/// Imports the class named in argv[1]; exits non-zero when that fails
const IMPORT_SCRIPT: &str = "import importlib, sys; \
    m, c = sys.argv[1].rsplit('.', 1); \
    getattr(importlib.import_module(m), c)";

/// Prints one test method name per line for the class named in argv[1]
const DISCOVER_SCRIPT: &str = "import importlib, sys, unittest; \
    m, c = sys.argv[1].rsplit('.', 1); \
    print('\\n'.join(unittest.TestLoader().getTestCaseNames(getattr(importlib.import_module(m), c))))";

/// Provider running one auxi test class
pub fn auxi_provider(app: &AppConfig, target: &str) -> CommandProvider {
    let mut provider = CommandProvider::new(&app.python)
        .args(["-m", "unittest", "{target}"])
        .target(target)
        .resolve_with(["-c", IMPORT_SCRIPT, "{target}"])
        .timeout(app.timeout_secs);

    if app.discover_cases {
        provider = provider
            .discover_with(["-c", DISCOVER_SCRIPT, "{target}"])
            .case_args(["-m", "unittest", "{target}.{case}"]);
    }

    if let Some(dir) = &app.source_dir {
        provider = provider.workdir(dir);
    }

    provider
}

/// Registry builder holding every auxi suite
pub fn auxi_registry(app: &AppConfig) -> RegistryBuilder {
    AUXI_SUITES
        .iter()
        .fold(RegistryBuilder::new(), |builder, (alias, target)| {
            builder.register(*alias, auxi_provider(app, target))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SuiteProvider;
    use std::collections::HashSet;

    #[test]
    fn test_auxi_aliases_unique() {
        let aliases: HashSet<_> = AUXI_SUITES.iter().map(|(a, _)| a).collect();
        assert_eq!(aliases.len(), AUXI_SUITES.len());
        assert_eq!(AUXI_SUITES.len(), 15);
    }

    #[test]
    fn test_auxi_order_starts_with_core() {
        assert_eq!(AUXI_SUITES[0].0, "object_test_all");
        assert_eq!(AUXI_SUITES[1].0, "namedobject_test_all");
        assert_eq!(AUXI_SUITES[14].0, "psd_test_material_package");
    }

    #[test]
    fn test_auxi_provider_command_line() {
        let app = AppConfig {
            python: "python3".to_string(),
            ..AppConfig::default()
        };
        let provider = auxi_provider(&app, "auxi.core.object_test.TestAllFunctions");
        assert_eq!(
            provider.describe(),
            "python3 -m unittest auxi.core.object_test.TestAllFunctions"
        );
    }

    #[test]
    fn test_auxi_registry_fails_without_interpreter() {
        let app = AppConfig {
            python: "definitely-not-a-python-xyz".to_string(),
            ..AppConfig::default()
        };
        assert!(auxi_registry(&app).build().is_err());
    }
}

#[cfg(all(test, unix))]
mod package_tests {
    use super::*;
    use crate::models::WHOLE_SUITE_CASE;
    use crate::providers::{locate_program, CaseOutcome, ProviderError, SuiteProvider};
    use crate::registry::RegistryError;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const OBJECT_TEST: &str = "\
import unittest


class TestAllFunctions(unittest.TestCase):
    def test_a(self):
        self.assertEqual(1 + 1, 2)

    def test_b(self):
        self.assertEqual(1 + 1, 3)
";

    /// A checkout holding `auxi.core.object_test.TestAllFunctions` only
    fn auxi_checkout() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let core = dir.path().join("auxi").join("core");
        fs::create_dir_all(&core).unwrap();
        fs::write(dir.path().join("auxi").join("__init__.py"), "").unwrap();
        fs::write(core.join("__init__.py"), "").unwrap();
        fs::write(core.join("object_test.py"), OBJECT_TEST).unwrap();
        dir
    }

    fn app_for(checkout: &Path, discover_cases: bool) -> Option<AppConfig> {
        locate_program("python3")?;
        Some(AppConfig {
            python: "python3".to_string(),
            source_dir: Some(checkout.to_path_buf()),
            discover_cases,
            ..AppConfig::default()
        })
    }

    #[test]
    fn test_resolve_imports_test_class() {
        let checkout = auxi_checkout();
        let Some(app) = app_for(checkout.path(), true) else {
            return;
        };

        let present = auxi_provider(&app, "auxi.core.object_test.TestAllFunctions");
        assert!(present.resolve().is_ok());

        let missing = auxi_provider(&app, "auxi.core.namedobject_test.TestAllFunctions");
        match missing.resolve() {
            Err(ProviderError::CheckFailed { output, .. }) => {
                assert!(output.contains("namedobject_test"));
            }
            other => panic!("Expected import failure, got {other:?}"),
        }

        let wrong_class = auxi_provider(&app, "auxi.core.object_test.TestMissing");
        assert!(wrong_class.resolve().is_err());
    }

    #[test]
    fn test_registry_with_unimportable_suite_is_rejected() {
        let checkout = auxi_checkout();
        let Some(app) = app_for(checkout.path(), true) else {
            return;
        };

        let result = auxi_registry(&app).build();
        match result {
            Err(RegistryError::Unresolved { alias, .. }) => {
                assert_eq!(alias, "namedobject_test_all");
            }
            other => panic!("Expected unresolved suite, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_discover_and_run_cases() {
        let checkout = auxi_checkout();
        let Some(app) = app_for(checkout.path(), true) else {
            return;
        };
        let provider = auxi_provider(&app, "auxi.core.object_test.TestAllFunctions");

        assert_eq!(provider.discover().await.unwrap(), vec!["test_a", "test_b"]);
        assert_eq!(provider.run_case("test_a").await, CaseOutcome::Passed);
        match provider.run_case("test_b").await {
            CaseOutcome::Failed(msg) => assert!(msg.contains("AssertionError")),
            other => panic!("Expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_whole_class_without_discovery() {
        let checkout = auxi_checkout();
        let Some(app) = app_for(checkout.path(), false) else {
            return;
        };
        let provider = auxi_provider(&app, "auxi.core.object_test.TestAllFunctions");

        assert_eq!(provider.discover().await.unwrap(), vec![WHOLE_SUITE_CASE]);
        assert!(matches!(
            provider.run_case(WHOLE_SUITE_CASE).await,
            CaseOutcome::Failed(_)
        ));
    }
}
