//! Multi-row case aggregation
//!
//! Rows belonging to the same case are grouped by [`CaseKey`]. Base fields
//! merge first-value-wins: a later row may fill a blank field but never
//! change a non-empty one. A disagreement is reported and the earlier value
//! kept, while the rest of the case keeps merging. Steps from all rows are
//! concatenated in file order.

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::normalize::{CaseRow, NormalizedRow};
use super::steps::Step;

/// Identity used to group rows into one case
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseKey {
    /// Case that already exists in TestRail
    Existing(u64),
    /// New case, identified by lowercased title and section path
    New { title: String, section: String },
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseKey::Existing(id) => write!(f, "case {}", id),
            CaseKey::New { title, section } => write!(f, "new case '{}' in '{}'", title, section),
        }
    }
}

/// Why a row could not be keyed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    InvalidCaseId(String),
    MissingTitle,
    MissingSection,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidCaseId(value) => write!(f, "Invalid case_id '{}'", value),
            KeyError::MissingTitle => f.write_str("Missing or empty 'title' field for new cases"),
            KeyError::MissingSection => f.write_str("Section is required for new cases"),
        }
    }
}

/// Parse a case id, accepting TestRail's `C123` display form
pub fn parse_case_id(value: &str) -> Option<u64> {
    let value = value.trim();
    let digits = value
        .strip_prefix('C')
        .or_else(|| value.strip_prefix('c'))
        .unwrap_or(value);
    digits.parse().ok()
}

/// Compute the key for a row; `default_section` applies when the row has none
pub fn build_key(row: &CaseRow, default_section: Option<&str>) -> Result<CaseKey, KeyError> {
    if let Some(ref raw) = row.case_id {
        return parse_case_id(raw)
            .map(CaseKey::Existing)
            .ok_or_else(|| KeyError::InvalidCaseId(raw.clone()));
    }

    let title = row.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let section = row
        .section
        .as_deref()
        .or(default_section)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (title, section) {
        (Some(title), Some(section)) => Ok(CaseKey::New {
            title: title.to_lowercase(),
            section: section.to_lowercase(),
        }),
        (Some(_), None) => Err(KeyError::MissingSection),
        (None, _) => Err(KeyError::MissingTitle),
    }
}

/// Merge one incoming value into an accumulated slot
fn merge_value(
    slot: &mut Option<String>,
    incoming: Option<&str>,
    field: &str,
    context: (usize, &CaseKey),
    errors: &mut Vec<String>,
) {
    let Some(incoming) = incoming.filter(|v| !v.trim().is_empty()) else {
        return;
    };
    let existing = slot
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    match existing {
        None => *slot = Some(incoming.to_string()),
        Some(existing) if existing != incoming.trim() => errors.push(format!(
            "Row {}: Conflicting values for '{}' in {}: '{}' vs '{}'",
            context.0, field, context.1, existing, incoming
        )),
        Some(_) => {}
    }
}

/// Merge an incoming row's base fields into the accumulated base
///
/// Returns one error per conflicting field. `case_id` is the key itself and
/// is not compared.
pub fn merge(
    existing: &mut CaseRow,
    incoming: &CaseRow,
    row_num: usize,
    key: &CaseKey,
) -> Vec<String> {
    let mut errors = Vec::new();
    let ctx = (row_num, key);

    merge_value(&mut existing.title, incoming.title.as_deref(), "title", ctx, &mut errors);
    merge_value(&mut existing.section, incoming.section.as_deref(), "section", ctx, &mut errors);
    merge_value(&mut existing.template, incoming.template.as_deref(), "template", ctx, &mut errors);
    merge_value(
        &mut existing.steps_field,
        incoming.steps_field.as_deref(),
        "steps_field",
        ctx,
        &mut errors,
    );

    for (name, value) in &incoming.fields {
        let mut slot = existing.fields.get(name).cloned();
        let had_column = slot.is_some();
        merge_value(&mut slot, Some(value), name, ctx, &mut errors);
        match slot {
            Some(merged) => {
                existing.fields.insert(name.clone(), merged);
            }
            // Remember that the column exists even when blank everywhere
            None if !had_column => {
                existing.fields.insert(name.clone(), String::new());
            }
            None => {}
        }
    }

    errors
}

/// All rows of one case, merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedCase {
    pub key: CaseKey,
    pub base: CaseRow,
    pub steps: Vec<Step>,
    /// File row where the case first appeared
    pub first_row: usize,
}

impl AggregatedCase {
    /// Id of an existing case, if this is an update
    pub fn case_id(&self) -> Option<u64> {
        match self.key {
            CaseKey::Existing(id) => Some(id),
            CaseKey::New { .. } => None,
        }
    }
}

/// Accumulates normalized rows into cases, preserving first-seen order
#[derive(Debug, Default)]
pub struct CaseAggregator {
    default_section: Option<String>,
    cases: Vec<AggregatedCase>,
    index: HashMap<CaseKey, usize>,
    errors: Vec<String>,
}

impl CaseAggregator {
    pub fn new(default_section: Option<&str>) -> Self {
        Self {
            default_section: default_section.map(str::to_string),
            ..Default::default()
        }
    }

    /// Add one normalized row; rows that cannot be keyed are reported and dropped
    pub fn add(&mut self, normalized: NormalizedRow, row_num: usize) {
        let NormalizedRow { row, steps, .. } = normalized;

        let key = match build_key(&row, self.default_section.as_deref()) {
            Ok(key) => key,
            Err(e) => {
                self.errors.push(format!("Row {}: {}", row_num, e));
                return;
            }
        };

        match self.index.get(&key) {
            Some(&idx) => {
                let case = &mut self.cases[idx];
                debug!(row = row_num, %key, steps = steps.len(), "Merging row into case");
                let conflicts = merge(&mut case.base, &row, row_num, &key);
                self.errors.extend(conflicts);
                case.steps.extend(steps);
            }
            None => {
                debug!(row = row_num, %key, steps = steps.len(), "New case");
                self.index.insert(key.clone(), self.cases.len());
                self.cases.push(AggregatedCase {
                    key,
                    base: row,
                    steps,
                    first_row: row_num,
                });
            }
        }
    }

    /// Record errors for a row that was rejected before keying
    pub fn reject(&mut self, errors: Vec<String>) {
        self.errors.extend(errors);
    }

    /// Errors collected so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Finish the scan: revalidate every case and hand back the valid ones
    pub fn finish(self) -> (Vec<AggregatedCase>, Vec<String>) {
        let mut errors = self.errors;
        let mut valid = Vec::with_capacity(self.cases.len());

        for case in self.cases {
            let has_title = case
                .base
                .title
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty());
            if case.case_id().is_none() && !has_title {
                errors.push(format!(
                    "Row {}: Missing or empty 'title' field for new cases",
                    case.first_row
                ));
                continue;
            }
            valid.push(case);
        }

        (valid, errors)
    }
}
