//! trcli: TestRail command-line client
//!
//! Maps command invocations onto TestRail REST calls and provides a CSV
//! pipeline for bulk import and export of test cases with their steps.

pub mod cli;
pub mod core;
pub mod csv_import;
