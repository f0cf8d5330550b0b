//! CLI command implementations

pub mod utils;

pub mod cases;
pub mod completions;
pub mod config;
pub mod projects;
pub mod raw;
pub mod sections;
pub mod suites;
