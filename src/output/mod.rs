//! Output formatting module
//!
//! Provides various output formats for test results.

mod formatter;

pub use formatter::{write_csv, write_results_to_file, CsvRecord, OutputFormat, ResultFormatter};
