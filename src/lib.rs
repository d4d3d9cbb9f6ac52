//! auxi-suites - aggregating test runner for the auxi library
//!
//! Holds an immutable registry of aliased test suites (by default the auxi
//! chemistry, financial ledger and material suites, run through Python's
//! `unittest`) and runs all of them through one entry point.
//!
//! ```no_run
//! use auxi_suites::executor::{ExecutionOptions, TestRunner};
//! use auxi_suites::providers::InlineSuite;
//! use auxi_suites::registry::Registry;
//! use auxi_suites::Aggregator;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let registry = Registry::builder()
//!     .register("ledger", InlineSuite::new().case("balanced", || Ok(())))
//!     .build()?;
//!
//! let aggregator = Aggregator::new("ledger-checks", registry);
//! let engine = TestRunner::new(ExecutionOptions::new("ledger-checks"));
//! let summary = aggregator.run_all(&engine, &mut std::io::stdout()).await?;
//! std::process::exit(summary.exit_code().into());
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod providers;
pub mod registry;
pub mod results;
pub mod utils;

pub use aggregator::{Aggregator, RoundsReport};
