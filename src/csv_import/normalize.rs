//! Row normalization
//!
//! Turns one raw CSV row into a [`CaseRow`] plus the steps it carries.
//! Order of operations:
//!
//! 1. rename columns through the mapping file
//! 2. apply the standard aliases (`mission` → `custom_mission`, ...) when the
//!    target column is not already present, either in the file or from an
//!    earlier alias
//! 3. pull out single-step and numbered step columns
//! 4. fall back to the `teststeps` cell when no step came from (3)
//!
//! Step columns and routing hints never reach [`CaseRow::fields`].

use std::collections::{BTreeMap, HashSet};

use super::columns::{classify, ColumnKind};
use super::mapping::ColumnMapping;
use super::steps::{parse_steps, Step};

/// A normalized row: the columns the importer routes on plus opaque API fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseRow {
    pub case_id: Option<String>,
    pub title: Option<String>,
    pub section: Option<String>,
    /// Template name hint (`template` / `template_name`)
    pub template: Option<String>,
    /// Explicit steps field override (`steps_field` / `step_field` / `steps_target`)
    pub steps_field: Option<String>,
    /// Everything else, keyed by (mapped) column name; empty cells are kept
    /// so the router can see which columns exist
    pub fields: BTreeMap<String, String>,
}

/// Result of normalizing one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    pub row: CaseRow,
    pub steps: Vec<Step>,
    pub errors: Vec<String>,
}

#[derive(Default)]
struct StepParts {
    content: String,
    expected: String,
    additional_info: String,
}

impl StepParts {
    fn into_step(self) -> Option<Step> {
        Step::new(&self.content, &self.expected, &self.additional_info)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Normalize one raw row given as (header, value) pairs in column order
pub fn normalize_row<'r, I>(
    raw: I,
    mapping: Option<&ColumnMapping>,
    row_num: usize,
) -> NormalizedRow
where
    I: IntoIterator<Item = (&'r str, &'r str)>,
{
    let columns: Vec<(String, &str)> = raw
        .into_iter()
        .map(|(header, value)| {
            let header = header.trim();
            let name = mapping.map_or(header, |m| m.target(header)).trim();
            (name.to_string(), value)
        })
        .collect();

    let present: HashSet<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();

    let mut row = CaseRow::default();
    let mut single = StepParts::default();
    let mut numbered: BTreeMap<u32, StepParts> = BTreeMap::new();
    let mut teststeps: Option<(&str, &str)> = None;

    for (name, value) in &columns {
        let value = *value;
        match classify(name) {
            ColumnKind::CaseId => row.case_id = non_empty(value),
            ColumnKind::Title => row.title = non_empty(value),
            ColumnKind::Section => row.section = non_empty(value),
            ColumnKind::TemplateHint => row.template = non_empty(value),
            ColumnKind::StepsTarget => row.steps_field = non_empty(value),
            ColumnKind::TestSteps => teststeps = Some((name.as_str(), value)),
            ColumnKind::SingleStep => single.content = value.to_string(),
            ColumnKind::SingleExpected => single.expected = value.to_string(),
            ColumnKind::SingleAdditionalInfo => single.additional_info = value.to_string(),
            ColumnKind::Step(n) => numbered.entry(n).or_default().content = value.to_string(),
            ColumnKind::Expected(n) => numbered.entry(n).or_default().expected = value.to_string(),
            ColumnKind::AdditionalInfo(n) => {
                numbered.entry(n).or_default().additional_info = value.to_string()
            }
            ColumnKind::StandardAlias(target)
                if !present.contains(target) && !row.fields.contains_key(target) =>
            {
                row.fields.insert(target.to_string(), value.trim().to_string());
            }
            ColumnKind::StandardAlias(_) | ColumnKind::Passthrough => {
                row.fields.insert(name.clone(), value.trim().to_string());
            }
        }
    }

    let mut steps: Vec<Step> = single.into_step().into_iter().collect();
    steps.extend(numbered.into_values().filter_map(StepParts::into_step));

    let mut errors = Vec::new();
    if steps.is_empty() {
        if let Some((field, value)) = teststeps {
            let (parsed, parse_errors) = parse_steps(value, row_num, field);
            steps = parsed;
            errors = parse_errors;
        }
    }

    NormalizedRow { row, steps, errors }
}
