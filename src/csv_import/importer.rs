//! Import orchestration
//!
//! Resolves the suite and default section, scans the CSV once, then issues
//! one `add_case` per new case (framed in batches of `chunk_size`) and one
//! `update_case` per existing case.

use csv::{Reader, ReaderBuilder, StringRecord};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::client::TestRailApi;
use crate::core::sections::SectionResolver;

use super::aggregate::{AggregatedCase, CaseAggregator};
use super::columns::{classify, ColumnKind};
use super::mapping::{ColumnMapping, MappingError};
use super::normalize::normalize_row;
use super::router::{apply_steps, infer_target, StepsTarget};
use super::PipelineError;

/// Default number of creates per batch
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Parameters of one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub project_id: u64,
    pub csv_path: PathBuf,
    pub suite_id: Option<u64>,
    pub suite_name: Option<String>,
    /// Default section path for rows without a `section` column value
    pub section_path: Option<String>,
    pub mapping_path: Option<PathBuf>,
    /// Applied to every case whose row has no `template_id` of its own
    pub template_id: Option<u64>,
    /// Steps field for the whole run, overriding per-row inference
    pub steps_field: Option<String>,
    pub create_missing_sections: bool,
    pub chunk_size: usize,
}

impl ImportOptions {
    pub fn new(project_id: u64, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            project_id,
            csv_path: csv_path.into(),
            suite_id: None,
            suite_name: None,
            section_path: None,
            mapping_path: None,
            template_id: None,
            steps_field: None,
            create_missing_sections: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub error_details: Option<Vec<String>>,
}

impl ImportResult {
    /// A run that stopped before touching any row
    fn failed(message: String) -> Self {
        Self {
            errors: 1,
            error_details: Some(vec![message]),
            ..Default::default()
        }
    }

    fn new(created: usize, updated: usize, errors: Vec<String>) -> Self {
        Self {
            created,
            updated,
            errors: errors.len(),
            error_details: (!errors.is_empty()).then_some(errors),
        }
    }
}

/// Pick the suite: explicit id, then exact name, then the only suite
pub fn resolve_suite<C: TestRailApi + ?Sized>(
    client: &C,
    project_id: u64,
    suite_id: Option<u64>,
    suite_name: Option<&str>,
) -> Result<u64, PipelineError> {
    if let Some(id) = suite_id {
        return Ok(id);
    }

    let suites = client.get_suites(project_id)?;

    if let Some(name) = suite_name {
        return suites
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| PipelineError::SuiteNotFound(name.to_string()));
    }

    match suites.as_slice() {
        [only] => Ok(only.id),
        _ => Err(PipelineError::SuiteRequired),
    }
}

type CsvReader = Reader<BufReader<File>>;

/// Open the CSV and check its header; failures become a one-error result
fn open_csv(
    path: &Path,
    mapping: Option<&ColumnMapping>,
) -> Result<(CsvReader, StringRecord), String> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => format!("CSV file not found: {}", path.display()),
        _ => format!("Cannot read CSV file {}: {}", path.display(), e),
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| format!("Cannot read CSV header: {}", e))?
        .clone();

    let has_case_id = headers.iter().any(|header| {
        let header = header.trim();
        let name = mapping.map_or(header, |m| m.target(header));
        classify(name) == ColumnKind::CaseId
    });
    if !has_case_id {
        return Err("CSV is missing required 'case_id' column (values may be empty)".to_string());
    }

    Ok((reader, headers))
}

/// Build the API payload shared by creates and updates
fn build_payload(
    case: &AggregatedCase,
    template_id: Option<u64>,
    run_target: Option<&StepsTarget>,
    include_title: bool,
) -> Map<String, Value> {
    let mut payload = Map::new();

    if include_title {
        if let Some(ref title) = case.base.title {
            payload.insert("title".to_string(), Value::String(title.clone()));
        }
    }

    for (name, value) in &case.base.fields {
        if !value.trim().is_empty() {
            payload.insert(name.clone(), Value::String(value.clone()));
        }
    }

    if let Some(id) = template_id {
        payload
            .entry("template_id")
            .or_insert_with(|| Value::from(id));
    }

    let target = run_target
        .cloned()
        .unwrap_or_else(|| infer_target(&case.base));
    debug!(key = %case.key, %target, steps = case.steps.len(), "Routing steps");
    apply_steps(&mut payload, &case.steps, &target);

    payload
}

fn create_case<C: TestRailApi + ?Sized>(
    client: &C,
    sections: &mut SectionResolver<'_, C>,
    default_section_id: Option<u64>,
    case: &AggregatedCase,
    template_id: Option<u64>,
    run_target: Option<&StepsTarget>,
) -> Result<Value, String> {
    let section_id = match case.base.section.as_deref() {
        Some(path) => sections.resolve(path).map_err(|e| e.to_string())?,
        None => None,
    }
    .or(default_section_id)
    .ok_or_else(|| "Section is required for creating cases".to_string())?;

    let title = case
        .base
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "Title is required for creating cases".to_string())?;

    let payload = build_payload(case, template_id, run_target, false);
    client
        .add_case(section_id, title, &payload)
        .map_err(|e| e.to_string())
}

/// Import test cases from a CSV file
///
/// Missing/unreadable files and a header without `case_id` produce a result
/// with a single error and no API calls. Suite/section resolution failures
/// and malformed mapping files are returned as `Err`.
pub fn import_from_csv<C: TestRailApi + ?Sized>(
    client: &C,
    options: &ImportOptions,
) -> Result<ImportResult, PipelineError> {
    let mapping = match options.mapping_path {
        Some(ref path) => match ColumnMapping::load(path) {
            Ok(mapping) => Some(mapping),
            Err(e @ MappingError::FileFormat { .. }) => return Err(e.into()),
            Err(e) => return Ok(ImportResult::failed(e.to_string())),
        },
        None => None,
    };

    let (mut reader, headers) = match open_csv(&options.csv_path, mapping.as_ref()) {
        Ok(opened) => opened,
        Err(message) => {
            warn!("{}", message);
            return Ok(ImportResult::failed(message));
        }
    };

    let suite_id = resolve_suite(
        client,
        options.project_id,
        options.suite_id,
        options.suite_name.as_deref(),
    )?;
    debug!(suite_id, "Resolved suite");

    let mut sections = SectionResolver::new(
        client,
        options.project_id,
        Some(suite_id),
        options.create_missing_sections,
    );
    let default_section_id = match options.section_path {
        Some(ref path) => sections.resolve(path)?,
        None => None,
    };

    let mut aggregator = CaseAggregator::new(options.section_path.as_deref());
    for (idx, record) in reader.records().enumerate() {
        let row_num = idx + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                aggregator.reject(vec![format!("Row {}: CSV parse error: {}", row_num, e)]);
                continue;
            }
        };

        let normalized =
            normalize_row(headers.iter().zip(record.iter()), mapping.as_ref(), row_num);
        if !normalized.errors.is_empty() {
            aggregator.reject(normalized.errors);
            continue;
        }
        aggregator.add(normalized, row_num);
    }
    drop(reader);

    let (cases, mut errors) = aggregator.finish();
    let (creates, updates): (Vec<_>, Vec<_>) =
        cases.into_iter().partition(|case| case.case_id().is_none());
    info!(
        creates = creates.len(),
        updates = updates.len(),
        row_errors = errors.len(),
        "Scanned CSV"
    );

    let run_target = options.steps_field.as_deref().map(StepsTarget::from_field);

    let mut created = 0;
    for (batch, chunk) in creates.chunks(options.chunk_size.max(1)).enumerate() {
        debug!(batch = batch + 1, size = chunk.len(), "Creating cases");
        for case in chunk {
            let outcome = create_case(
                client,
                &mut sections,
                default_section_id,
                case,
                options.template_id,
                run_target.as_ref(),
            );

            match outcome {
                Ok(_) => created += 1,
                Err(message) => {
                    let message = format!("Create error (row {}): {}", case.first_row, message);
                    warn!("{}", message);
                    errors.push(message);
                }
            }
        }
    }

    let mut updated = 0;
    for case in &updates {
        let Some(case_id) = case.case_id() else {
            errors.push(format!(
                "Update error (row {}): case_id is required for updates",
                case.first_row
            ));
            continue;
        };

        let payload = build_payload(case, options.template_id, run_target.as_ref(), true);
        match client.update_case(case_id, &payload) {
            Ok(_) => updated += 1,
            Err(e) => {
                let message = format!("Update error for case {}: {}", case_id, e);
                warn!("{}", message);
                errors.push(message);
            }
        }
    }

    let result = ImportResult::new(created, updated, errors);
    info!(
        created = result.created,
        updated = result.updated,
        errors = result.errors,
        "Import finished"
    );
    Ok(result)
}
