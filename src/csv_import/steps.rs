//! Step parsing
//!
//! Steps arrive either as structured JSON (a list of objects, a single
//! object, or a list of strings) or as free text with one step per line:
//!
//! ```text
//! Open login | Form shows
//! Submit form || Success banner || Browser: Chrome
//! Log out -> Login page
//! ```
//!
//! Each line splits on the first delimiter found in the order `||`, `|`,
//! `->` into content, expected result and additional info.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::columns::{classify, ColumnKind};

/// Line delimiters in priority order
const DELIMITERS: [&str; 3] = ["||", "|", "->"];

/// One action/expected pair with optional extra data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub content: String,
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

impl Step {
    /// Build a step from trimmed parts; `None` when every part is empty
    pub fn new(content: &str, expected: &str, additional_info: &str) -> Option<Self> {
        let content = content.trim();
        let expected = expected.trim();
        let additional_info = additional_info.trim();

        if content.is_empty() && expected.is_empty() && additional_info.is_empty() {
            return None;
        }

        Some(Self {
            content: content.to_string(),
            expected: expected.to_string(),
            additional_info: (!additional_info.is_empty()).then(|| additional_info.to_string()),
        })
    }

    /// Single-line text form used by the text and Gherkin templates
    pub fn to_line(&self) -> String {
        let mut line = self.content.clone();
        if !self.expected.is_empty() {
            line.push_str(" | Expected: ");
            line.push_str(&self.expected);
        }
        if let Some(ref info) = self.additional_info {
            line.push_str(" | Info: ");
            line.push_str(info);
        }
        line
    }
}

/// Parse one cell of step data
///
/// Returns the steps found plus any errors, tagged with `row` and `field`.
pub fn parse_steps(value: &str, row: usize, field: &str) -> (Vec<Step>, Vec<String>) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return (Vec::new(), Vec::new());
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        if parsed.is_array() || parsed.is_object() {
            return (steps_from_value(&parsed), Vec::new());
        }
    }

    let steps = parse_text(trimmed);
    if steps.is_empty() {
        return (
            Vec::new(),
            vec![format!("Row {}: Unable to parse steps from '{}'", row, field)],
        );
    }
    (steps, Vec::new())
}

/// Normalize already-structured step data
pub fn steps_from_value(value: &Value) -> Vec<Step> {
    match value {
        Value::Array(items) => items.iter().filter_map(step_from_item).collect(),
        Value::Object(_) => step_from_item(value).into_iter().collect(),
        Value::String(text) => parse_text(text),
        _ => Vec::new(),
    }
}

fn step_from_item(item: &Value) -> Option<Step> {
    match item {
        Value::Object(map) => {
            let mut content = String::new();
            let mut expected = String::new();
            let mut info = String::new();

            for (key, value) in map {
                let slot = if key.eq_ignore_ascii_case("content") {
                    &mut content
                } else {
                    match classify(key) {
                        ColumnKind::SingleStep => &mut content,
                        ColumnKind::SingleExpected => &mut expected,
                        ColumnKind::SingleAdditionalInfo => &mut info,
                        _ => continue,
                    }
                };
                if slot.is_empty() {
                    *slot = value_text(value);
                }
            }
            Step::new(&content, &expected, &info)
        }
        Value::Null => None,
        other => Step::new(&value_text(other), "", ""),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Free-text notation, one step per non-blank line
fn parse_text(text: &str) -> Vec<Step> {
    let text = text.replace("\\n", "\n");
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = match DELIMITERS.iter().find(|d| line.contains(**d)) {
                Some(delimiter) => line.splitn(3, *delimiter).collect(),
                None => vec![line],
            };
            Step::new(
                parts.first().copied().unwrap_or_default(),
                parts.get(1).copied().unwrap_or_default(),
                parts.get(2).copied().unwrap_or_default(),
            )
        })
        .collect()
}

/// Join steps into the text form, one line per step
pub fn steps_to_text(steps: &[Step]) -> String {
    steps
        .iter()
        .map(Step::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}
