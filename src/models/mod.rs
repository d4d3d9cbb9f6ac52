//! Data models for aggregated suite runs
//!
//! This module contains the result structures shared by engines, output and storage.

mod test_result;

pub use test_result::{
    CaseId, RunSummary, TestResult, TestStatus, DISCOVERY_CASE, WHOLE_SUITE_CASE,
};
