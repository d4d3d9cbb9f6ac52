//! Results storage module
//!
//! Provides persistent storage and export of run results.

mod storage;

pub use storage::{ExportFormat, HostInfo, ResultsStorage, RoundsDigest, RunInfo, StoredRun};
