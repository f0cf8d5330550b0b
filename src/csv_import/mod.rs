//! CSV import/export of test cases
//!
//! The importer reads a loosely structured spreadsheet where one case may
//! span several rows and steps may be written in several notations:
//!
//! ```text
//! raw row ─► normalize ─► aggregate (by key) ─► route steps ─► add/update case
//! ```
//!
//! The exporter writes the inverse: one row per step, in the same column
//! set the importer accepts, so an export can be edited and re-imported.
//!
//! Errors fall into two classes. Problems with prerequisites (mapping file
//! format, suite or section resolution) abort the run as [`PipelineError`].
//! Everything else (bad rows, merge conflicts, failed API calls for one
//! case) is collected into [`ImportResult::error_details`] and the run
//! continues.

pub mod aggregate;
pub mod columns;
pub mod export;
pub mod importer;
pub mod mapping;
pub mod normalize;
pub mod router;
pub mod steps;

use std::path::PathBuf;
use thiserror::Error;

use crate::core::client::ApiError;
use crate::core::sections::SectionError;

pub use aggregate::{AggregatedCase, CaseAggregator, CaseKey};
pub use export::{export_to_csv, ExportOptions, ExportSummary, EXPORT_COLUMNS};
pub use importer::{import_from_csv, resolve_suite, ImportOptions, ImportResult};
pub use mapping::{ColumnMapping, MappingError};
pub use normalize::{normalize_row, CaseRow, NormalizedRow};
pub use router::StepsTarget;
pub use steps::Step;

/// Fatal errors that stop an import or export before or outside row processing
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Suite not found: {0}")]
    SuiteNotFound(String),

    #[error("suite_id or suite_name is required for multi-suite projects")]
    SuiteRequired,

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}
