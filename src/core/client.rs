//! TestRail API surface consumed by the import/export engine
//!
//! The engine talks to TestRail only through [`TestRailApi`], so tests can
//! drive it with an in-memory stub while the binary uses
//! [`crate::core::http::HttpClient`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by a single API call
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

/// A test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub id: u64,
    pub name: String,
}

/// A section (folder) inside a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<u64>,
}

/// Payload for creating a section
#[derive(Debug, Clone, Serialize)]
pub struct NewSection<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
}

/// A test case as returned by `get_case`/`get_cases`
///
/// Only the fields the exporter reads are typed; everything else (custom
/// fields included) lands in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CaseRecord {
    /// Render a field as CSV cell text (`null`/absent become empty)
    pub fn field_text(&self, name: &str) -> String {
        match self.fields.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Server-side filters for `get_cases`
///
/// Timestamps are epoch seconds. `offset` and `limit` pick a window of the
/// result; without `limit` every page from `offset` on is fetched.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub suite_id: Option<u64>,
    pub section_id: Option<u64>,
    pub priority_ids: Vec<u64>,
    pub type_ids: Vec<u64>,
    pub created_after: Option<i64>,
    pub created_before: Option<i64>,
    pub updated_after: Option<i64>,
    pub updated_before: Option<i64>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl CaseFilter {
    /// Query parameters in TestRail's `&key=value` form
    ///
    /// Paging (`offset`/`limit`) is left to the client, which walks pages.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.suite_id {
            params.push(("suite_id", id.to_string()));
        }
        if let Some(id) = self.section_id {
            params.push(("section_id", id.to_string()));
        }
        if !self.priority_ids.is_empty() {
            params.push(("priority_id", join_ids(&self.priority_ids)));
        }
        if !self.type_ids.is_empty() {
            params.push(("type_id", join_ids(&self.type_ids)));
        }
        if let Some(ts) = self.created_after {
            params.push(("created_after", ts.to_string()));
        }
        if let Some(ts) = self.created_before {
            params.push(("created_before", ts.to_string()));
        }
        if let Some(ts) = self.updated_after {
            params.push(("updated_after", ts.to_string()));
        }
        if let Some(ts) = self.updated_before {
            params.push(("updated_before", ts.to_string()));
        }
        params
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// The TestRail operations the engine depends on
pub trait TestRailApi {
    fn get_suites(&self, project_id: u64) -> Result<Vec<Suite>, ApiError>;

    fn get_sections(&self, project_id: u64, suite_id: Option<u64>)
        -> Result<Vec<Section>, ApiError>;

    fn get_section(&self, section_id: u64) -> Result<Section, ApiError>;

    fn add_section(&self, project_id: u64, section: &NewSection<'_>) -> Result<Section, ApiError>;

    fn get_case(&self, case_id: u64) -> Result<CaseRecord, ApiError>;

    fn get_cases(&self, project_id: u64, filter: &CaseFilter) -> Result<Vec<CaseRecord>, ApiError>;

    /// Create a case; `fields` holds every payload key except `title`
    fn add_case(
        &self,
        section_id: u64,
        title: &str,
        fields: &Map<String, Value>,
    ) -> Result<Value, ApiError>;

    fn update_case(&self, case_id: u64, fields: &Map<String, Value>) -> Result<Value, ApiError>;
}
