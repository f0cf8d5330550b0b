//! Case export to CSV
//!
//! Writes the same column set the importer reads, one row per step.
//!
//! Text (`custom_steps`) and Gherkin (`custom_gherkin`) cases export one line
//! per `step` cell. The file carries no steps-field or template-name column,
//! so a re-import sends those lines to `custom_steps_separated` unless the
//! row gains a `steps_field` column or `--steps-field` is given.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::client::{CaseFilter, CaseRecord, TestRailApi};
use crate::core::sections::SectionPathCache;

use super::router::{GHERKIN_FIELD, SEPARATED_FIELD, TEXT_FIELD};
use super::steps::{steps_from_value, Step};
use super::PipelineError;

/// Fixed header of an exported file
pub const EXPORT_COLUMNS: [&str; 14] = [
    "case_id",
    "title",
    "section",
    "priority_id",
    "type_id",
    "template_id",
    "estimate",
    "refs",
    "mission",
    "goals",
    "preconds",
    "step",
    "expected",
    "additional_info",
];

/// Which cases to export and where to
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub project_id: u64,
    pub csv_path: PathBuf,
    pub suite_id: Option<u64>,
    /// Explicit cases; when non-empty the filters below are ignored
    pub case_ids: Vec<u64>,
    pub section_id: Option<u64>,
    pub priority_ids: Vec<u64>,
    pub type_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Data rows written (not cases)
    pub exported: usize,
}

/// Steps of a fetched case, from the first populated steps field
pub fn case_steps(case: &CaseRecord) -> Vec<Step> {
    if let Some(value @ Value::Array(_)) = case.fields.get(SEPARATED_FIELD) {
        let steps = steps_from_value(value);
        if !steps.is_empty() {
            return steps;
        }
    }

    for field in [TEXT_FIELD, GHERKIN_FIELD] {
        if let Some(Value::String(text)) = case.fields.get(field) {
            let steps: Vec<Step> = text
                .lines()
                .filter_map(|line| Step::new(line, "", ""))
                .collect();
            if !steps.is_empty() {
                return steps;
            }
        }
    }

    Vec::new()
}

/// CSV rows for one case; a case without steps still gets one row
pub fn case_rows(case: &CaseRecord, section_path: &str) -> Vec<Vec<String>> {
    let base = vec![
        case.id.to_string(),
        case.title.clone(),
        section_path.to_string(),
        case.field_text("priority_id"),
        case.field_text("type_id"),
        case.field_text("template_id"),
        case.field_text("estimate"),
        case.field_text("refs"),
        case.field_text("custom_mission"),
        case.field_text("custom_goals"),
        case.field_text("custom_preconds"),
    ];

    let steps = case_steps(case);
    if steps.is_empty() {
        let mut row = base;
        row.extend([String::new(), String::new(), String::new()]);
        return vec![row];
    }

    steps
        .into_iter()
        .map(|step| {
            let mut row = base.clone();
            row.push(step.content);
            row.push(step.expected);
            row.push(step.additional_info.unwrap_or_default());
            row
        })
        .collect()
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Export cases to a CSV file
///
/// All cases and section paths are fetched before the file is opened, so a
/// failed API call leaves no partial output.
pub fn export_to_csv<C: TestRailApi + ?Sized>(
    client: &C,
    options: &ExportOptions,
) -> Result<ExportSummary, PipelineError> {
    let cases = if options.case_ids.is_empty() {
        let filter = CaseFilter {
            suite_id: options.suite_id,
            section_id: options.section_id,
            priority_ids: options.priority_ids.clone(),
            type_ids: options.type_ids.clone(),
            ..Default::default()
        };
        client.get_cases(options.project_id, &filter)?
    } else {
        options
            .case_ids
            .iter()
            .map(|&id| client.get_case(id))
            .collect::<Result<Vec<_>, _>>()?
    };
    debug!(count = cases.len(), "Fetched cases for export");

    let mut paths = SectionPathCache::new();
    let mut rows = Vec::new();
    for case in &cases {
        let section = match case.section_id {
            Some(id) => paths.path_for(client, id)?,
            None => String::new(),
        };
        rows.extend(case_rows(case, &section));
    }

    let path = options.csv_path.as_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_error(path, e))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
    writer
        .write_record(EXPORT_COLUMNS)
        .map_err(|e| write_error(path, e))?;
    for row in &rows {
        writer.write_record(row).map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))?;

    info!(cases = cases.len(), rows = rows.len(), path = %path.display(), "Exported cases");
    Ok(ExportSummary {
        exported: rows.len(),
    })
}
