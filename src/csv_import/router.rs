//! Step routing
//!
//! TestRail stores steps in one of three fields depending on the case
//! template. The field is chosen, in order, from an explicit per-row
//! override, the template name hint, an existing text/Gherkin column on the
//! row, and finally the structured list.

use serde_json::{Map, Value};
use std::fmt;

use super::normalize::CaseRow;
use super::steps::{steps_to_text, Step};

pub const SEPARATED_FIELD: &str = "custom_steps_separated";
pub const TEXT_FIELD: &str = "custom_steps";
pub const GHERKIN_FIELD: &str = "custom_gherkin";

/// Destination field for a case's steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepsTarget {
    /// `custom_steps_separated`, a list of step objects
    Separated,
    /// `custom_steps`, one text blob
    Text,
    /// `custom_gherkin`, one text blob
    Gherkin,
    /// Any other field named explicitly; receives the structured list
    Other(String),
}

impl StepsTarget {
    /// Interpret an explicit field name
    pub fn from_field(name: &str) -> Self {
        match name.trim() {
            SEPARATED_FIELD => StepsTarget::Separated,
            TEXT_FIELD => StepsTarget::Text,
            GHERKIN_FIELD => StepsTarget::Gherkin,
            other => StepsTarget::Other(other.to_string()),
        }
    }

    /// Infer from a template name, if it says anything about steps
    pub fn from_template_hint(hint: &str) -> Option<Self> {
        let hint = hint.to_lowercase();
        if hint.contains("gherkin") {
            Some(StepsTarget::Gherkin)
        } else if hint.contains("text") || hint.contains("exploratory") {
            Some(StepsTarget::Text)
        } else if hint.contains("step") {
            Some(StepsTarget::Separated)
        } else {
            None
        }
    }

    pub fn field_name(&self) -> &str {
        match self {
            StepsTarget::Separated => SEPARATED_FIELD,
            StepsTarget::Text => TEXT_FIELD,
            StepsTarget::Gherkin => GHERKIN_FIELD,
            StepsTarget::Other(name) => name,
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, StepsTarget::Text | StepsTarget::Gherkin)
    }
}

impl fmt::Display for StepsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Pick the steps field for a row
///
/// The hint columns themselves were consumed during normalization, so they
/// never reach the payload.
pub fn infer_target(row: &CaseRow) -> StepsTarget {
    if let Some(ref field) = row.steps_field {
        return StepsTarget::from_field(field);
    }

    if let Some(target) = row.template.as_deref().and_then(StepsTarget::from_template_hint) {
        return target;
    }

    if row.fields.contains_key(GHERKIN_FIELD) {
        StepsTarget::Gherkin
    } else if row.fields.contains_key(TEXT_FIELD) {
        StepsTarget::Text
    } else {
        StepsTarget::Separated
    }
}

/// Write steps into an API payload under the chosen field
///
/// Text targets get one line per step; everything else gets the list.
/// An empty step list leaves the payload untouched.
pub fn apply_steps(payload: &mut Map<String, Value>, steps: &[Step], target: &StepsTarget) {
    if steps.is_empty() {
        return;
    }

    let value = if target.is_text() {
        Value::String(steps_to_text(steps))
    } else {
        Value::Array(
            steps
                .iter()
                .map(|step| serde_json::to_value(step).unwrap_or(Value::Null))
                .collect(),
        )
    };
    payload.insert(target.field_name().to_string(), value);
}
