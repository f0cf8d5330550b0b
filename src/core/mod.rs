//! Core module - configuration, the TestRail API seam, and section paths

pub mod client;
pub mod config;
pub mod http;
pub mod sections;

pub use client::{ApiError, CaseFilter, CaseRecord, NewSection, Section, Suite, TestRailApi};
pub use config::{ConfigError, ConfigFile, ConfigOverrides, ConnectionConfig, Profile};
pub use http::HttpClient;
pub use sections::{SectionError, SectionPathCache, SectionResolver};
