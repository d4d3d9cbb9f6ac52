//! auxi-suites - aggregating test runner for the auxi library
//!
//! Runs the registered auxi test suites (core objects, stoichiometry,
//! thermochemistry, financial general ledger and process materials) and
//! reports a single consolidated summary.
//!
//! ## Usage
//!
//! ```bash
//! # Run everything (same as `auxi-suites run`)
//! auxi-suites
//!
//! # Run two suites in parallel, skipping one case
//! auxi-suites run -s stoich_test_all -s thermo_test_all --skip thermo_test_all::test_cp --parallel
//!
//! # Repeat the run to detect inconsistent outcomes
//! auxi-suites run --rounds 5 --format summary
//!
//! # Check that every suite resolves
//! auxi-suites check
//! ```
//!
//! The exit status is 0 when every case passed or was skipped, 1 otherwise.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, warn};

use auxi_suites::config::{ConfigFile, EnvConfig};
use auxi_suites::executor::{Engine, ExecutionOptions, ParallelExecutor, TestRunner};
use auxi_suites::output::{write_results_to_file, OutputFormat, ResultFormatter};
use auxi_suites::results::{ExportFormat, ResultsStorage, StoredRun};
use auxi_suites::utils::{init_logger, LogLevel};
use auxi_suites::Aggregator;
use cli::{Args, Command, ConfigArgs, ListArgs, ResultsArgs, RunArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = env
        .log
        .as_deref()
        .and_then(LogLevel::parse)
        .unwrap_or_else(|| LogLevel::from_verbosity(args.verbose));
    init_logger(level);
    env.warn_ignored();

    let config = load_config(args.config.as_deref(), &env)?;

    let status = match args.command {
        None => run_suites(config, RunArgs::default()).await?,
        Some(Command::Run(run_args)) => run_suites(config, run_args).await?,
        Some(Command::List(list_args)) => list_suites(&config, list_args).await?,
        Some(Command::Check) => check_suites(&config)?,
        Some(Command::Results(results_args)) => show_results(&config, results_args)?,
        Some(Command::Config(config_args)) => manage_config(&config, &env, config_args)?,
    };

    Ok(ExitCode::from(status))
}

/// Process exit status of a subcommand
const SUCCESS: u8 = 0;
const FAILURE: u8 = 1;

/// Explicit path, then AUXI_SUITES_CONFIG, then the standard locations
fn load_config(path: Option<&Path>, env: &EnvConfig) -> Result<ConfigFile> {
    let mut config = match path.or(env.config_file.as_deref().map(Path::new)) {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };

    env.apply(&mut config.app);
    config.validate()?;
    Ok(config)
}

async fn run_suites(mut config: ConfigFile, args: RunArgs) -> Result<u8> {
    let app = &mut config.app;
    app.parallel |= args.parallel;
    if let Some(concurrent) = args.concurrent {
        app.max_concurrent = concurrent;
    }
    if let Some(rounds) = args.rounds {
        app.rounds = rounds;
    }
    if args.timeout.is_some() {
        app.timeout_secs = args.timeout;
    }
    if let Some(format) = args.format {
        app.format = format;
    }
    app.skip.extend(args.skip);
    config.validate()?;

    let app = &config.app;
    let format = OutputFormat::from_str(&app.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", app.format))?;

    let mut registry = config
        .registry()
        .build()
        .context("Failed to load suite registry")?;
    if !args.suites.is_empty() {
        registry = registry.select(&args.suites)?;
    }

    info!(
        "Running {} suite(s): {}",
        registry.len(),
        registry.aliases().join(", ")
    );

    let mut formatter = ResultFormatter::new(format);
    if args.no_color || !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }

    let options = ExecutionOptions::new(&app.label).with_skip(app.skip.clone());
    let engine: Box<dyn Engine> = if app.parallel {
        Box::new(ParallelExecutor::new(app.max_concurrent, options))
    } else {
        Box::new(TestRunner::new(options))
    };

    let suites: Vec<String> = registry.aliases().iter().map(|a| a.to_string()).collect();
    let aggregator = Aggregator::new(&app.label, registry).with_formatter(formatter);
    let mut stdout = std::io::stdout();
    let mut stored = StoredRun::new(&app.label, suites);

    let exit_code = if app.rounds > 1 {
        let report = aggregator
            .run_rounds(engine.as_ref(), app.rounds, &mut stdout)
            .await?;
        let code = report.exit_code();
        for summary in report.summaries {
            stored.add_round(summary);
        }
        stored.set_aggregate(&report.aggregate);
        code
    } else {
        let summary = aggregator.run_all(engine.as_ref(), &mut stdout).await?;
        let code = summary.exit_code();
        stored.add_round(summary);
        code
    };

    if let (Some(path), Some(last)) = (&args.output, stored.summaries.last()) {
        let file_format = ExportFormat::from_extension(path)
            .map(|f| match f {
                ExportFormat::Json => OutputFormat::JsonPretty,
                ExportFormat::Csv => OutputFormat::Csv,
            })
            .unwrap_or(format);
        write_results_to_file(path, last, file_format)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote report to {}", path.display());
    }

    if args.save || app.store_results {
        results_storage(&config).save(&stored)?;
    }

    Ok(exit_code)
}

async fn list_suites(config: &ConfigFile, args: ListArgs) -> Result<u8> {
    let registry = config
        .registry()
        .build()
        .context("Failed to load suite registry")?;

    println!("\nRegistered suites ({} total)\n", registry.len());

    for suite in &registry {
        println!("  {:34} {}", suite.alias(), suite.provider().describe());

        if args.cases {
            match suite.provider().discover().await {
                Ok(cases) => {
                    for case in cases {
                        println!("      - {case}");
                    }
                }
                Err(e) => println!("      ! discovery failed: {e}"),
            }
        }
    }

    println!();
    Ok(SUCCESS)
}

fn check_suites(config: &ConfigFile) -> Result<u8> {
    let builder = config.registry();
    builder.check_aliases().context("Registry is invalid")?;

    let mut unresolved = 0;

    for suite in builder.suites() {
        match suite.provider().resolve() {
            Ok(()) => println!("  ✓ {:34} {}", suite.alias(), suite.provider().describe()),
            Err(e) => {
                unresolved += 1;
                println!("  ✗ {:34} {}", suite.alias(), e);
            }
        }
    }

    if unresolved > 0 {
        warn!("{} suite(s) could not be resolved", unresolved);
        return Ok(FAILURE);
    }

    println!("\nAll suites resolved.");
    Ok(SUCCESS)
}

fn results_storage(config: &ConfigFile) -> ResultsStorage {
    match &config.app.results_dir {
        Some(dir) => ResultsStorage::new(dir),
        None => ResultsStorage::default_dir(),
    }
}

fn show_results(config: &ConfigFile, args: ResultsArgs) -> Result<u8> {
    let storage = results_storage(config);
    let label = &config.app.label;

    if let Some(path) = &args.export {
        let run = storage
            .latest(label)?
            .ok_or_else(|| anyhow::anyhow!("No stored runs for {label}"))?;
        let format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json);
        storage.export(&run, path, format)?;
        println!("Exported run {} to {}", run.id, path.display());
        return Ok(SUCCESS);
    }

    let runs = storage.list_runs(label)?;
    if runs.is_empty() {
        println!("\nNo stored results found in {}.", storage.base_dir().display());
        println!("   Store a run with: auxi-suites run --save");
        return Ok(SUCCESS);
    }

    println!("\nStored runs for {label}\n");
    for run in runs.iter().take(args.limit) {
        println!(
            "  {} {:22} {} {:2} round(s) {:5.1}%",
            if run.passed { "✓" } else { "✗" },
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.rounds,
            run.pass_rate
        );
    }
    println!();

    Ok(SUCCESS)
}

fn manage_config(config: &ConfigFile, env: &EnvConfig, args: ConfigArgs) -> Result<u8> {
    if let Some(path) = &args.init {
        if path.exists() {
            anyhow::bail!("Refusing to overwrite existing file: {}", path.display());
        }
        ConfigFile::example().save(path)?;
        println!("Wrote example configuration to {}", path.display());
        return Ok(SUCCESS);
    }

    if args.env {
        env.print_summary();
        return Ok(SUCCESS);
    }

    print!(
        "{}",
        serde_yaml::to_string(config).context("Failed to serialize config")?
    );
    Ok(SUCCESS)
}
