//! Column name classification
//!
//! Every CSV header (after mapping) is classified exactly once. Matching is
//! case-insensitive and treats spaces and hyphens like underscores, so
//! `Expected Result 2` and `expected_result_2` are the same column.

/// Columns holding the action of a single step
pub const STEP_COLUMNS: &[&str] = &["step", "step_content", "action"];

/// Columns holding the expected result of a single step
pub const EXPECTED_COLUMNS: &[&str] = &["expected", "expected_result"];

/// Columns holding extra data for a single step
pub const ADDITIONAL_INFO_COLUMNS: &[&str] = &[
    "additional_info",
    "info",
    "notes",
    "note",
    "data",
    "test_data",
];

/// Columns holding a whole step list in one cell
pub const TESTSTEPS_COLUMNS: &[&str] = &["teststeps", "test_steps"];

/// Per-row override of the field that receives steps
pub const STEPS_TARGET_COLUMNS: &[&str] = &["steps_field", "step_field", "steps_target"];

/// Template name hints used to pick the steps field
pub const TEMPLATE_HINT_COLUMNS: &[&str] = &["template", "template_name"];

/// Friendly names for TestRail's built-in custom fields
pub const STANDARD_ALIASES: &[(&str, &str)] = &[
    ("mission", "custom_mission"),
    ("goals", "custom_goals"),
    ("preconds", "custom_preconds"),
    ("preconditions", "custom_preconds"),
];

/// What a column contributes to a normalized row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    CaseId,
    Title,
    Section,
    TemplateHint,
    StepsTarget,
    TestSteps,
    SingleStep,
    SingleExpected,
    SingleAdditionalInfo,
    Step(u32),
    Expected(u32),
    AdditionalInfo(u32),
    StandardAlias(&'static str),
    Passthrough,
}

/// Lowercase a header and fold separators to underscores
pub fn canonical_name(column: &str) -> String {
    column
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Classify a (mapped) column name
pub fn classify(column: &str) -> ColumnKind {
    let name = canonical_name(column);
    let name = name.as_str();

    match name {
        "case_id" => return ColumnKind::CaseId,
        "title" => return ColumnKind::Title,
        "section" => return ColumnKind::Section,
        _ => {}
    }

    if TEMPLATE_HINT_COLUMNS.contains(&name) {
        return ColumnKind::TemplateHint;
    }
    if STEPS_TARGET_COLUMNS.contains(&name) {
        return ColumnKind::StepsTarget;
    }
    if TESTSTEPS_COLUMNS.contains(&name) {
        return ColumnKind::TestSteps;
    }
    if STEP_COLUMNS.contains(&name) {
        return ColumnKind::SingleStep;
    }
    if EXPECTED_COLUMNS.contains(&name) {
        return ColumnKind::SingleExpected;
    }
    if ADDITIONAL_INFO_COLUMNS.contains(&name) {
        return ColumnKind::SingleAdditionalInfo;
    }
    if let Some(&(_, target)) = STANDARD_ALIASES.iter().find(|(alias, _)| *alias == name) {
        return ColumnKind::StandardAlias(target);
    }

    if let Some((base, index)) = split_index(name) {
        if STEP_COLUMNS.contains(&base) {
            return ColumnKind::Step(index);
        }
        if EXPECTED_COLUMNS.contains(&base) {
            return ColumnKind::Expected(index);
        }
        if ADDITIONAL_INFO_COLUMNS.contains(&base) {
            return ColumnKind::AdditionalInfo(index);
        }
    }

    ColumnKind::Passthrough
}

/// Split `step_12` / `step12` into (`step`, 12)
fn split_index(name: &str) -> Option<(&str, u32)> {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    let index = name[digits_start..].parse().ok()?;
    let base = name[..digits_start].trim_end_matches('_');
    if base.is_empty() {
        return None;
    }
    Some((base, index))
}
