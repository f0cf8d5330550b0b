//! Blocking HTTP implementation of [`TestRailApi`]
//!
//! Requests go to `{url}/index.php?/api/v2/{endpoint}` with basic auth.
//! Because the endpoint already lives in the query string, extra parameters
//! are appended with `&`.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::client::{
    ApiError, CaseFilter, CaseRecord, NewSection, Section, Suite, TestRailApi,
};
use crate::core::config::ConnectionConfig;

/// Page size used when walking paginated list endpoints
const PAGE_SIZE: usize = 250;

/// Keys TestRail wraps around a page of results
const PAGE_METADATA_KEYS: [&str; 4] = ["offset", "limit", "size", "_links"];

/// TestRail REST client
pub struct HttpClient {
    client: Client,
    base_url: String,
    email: String,
    password: String,
}

impl HttpClient {
    /// Build a client from resolved connection settings
    pub fn new(config: &ConnectionConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .danger_accept_invalid_certs(!config.verify);

        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ApiError::Transport(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            password: config.password.clone(),
        })
    }

    fn endpoint_url(&self, endpoint: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}/index.php?/api/v2/{}", self.base_url, endpoint);
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    /// Raw GET against an endpoint such as `get_case/12`
    pub fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint, params);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.password))
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_response(endpoint, response)
    }

    /// Raw POST with a JSON body; TestRail also uses POST for deletes
    pub fn post(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint_url(endpoint, params);
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.email, Some(&self.password))
            .json(body)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_response(endpoint, response)
    }

    /// Fetch the items of a list endpoint inside `window`, following offset
    /// pagination
    fn get_all(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        key: &str,
        window: Window,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut offset = window.offset;

        loop {
            let page_size = window.page_size(items.len());
            if page_size == 0 {
                return Ok(items);
            }

            let mut page_params = params.to_vec();
            page_params.push(("limit", page_size.to_string()));
            page_params.push(("offset", offset.to_string()));

            match self.get(endpoint, &page_params)? {
                // Older servers return the bare list without pagination
                Value::Array(list) => {
                    items.extend(list);
                    if let Some(limit) = window.limit {
                        items.truncate(limit);
                    }
                    return Ok(items);
                }
                Value::Object(page) => {
                    let has_next = page
                        .get("_links")
                        .and_then(|links| links.get("next"))
                        .is_some_and(|next| !next.is_null());
                    let list = extract_page(page, key).ok_or_else(|| ApiError::Decode {
                        endpoint: endpoint.to_string(),
                        message: format!("no '{}' list in response", key),
                    })?;
                    let count = list.len();
                    items.extend(list);
                    if count < page_size || !has_next {
                        return Ok(items);
                    }
                    offset += count;
                }
                other => {
                    return Err(ApiError::Decode {
                        endpoint: endpoint.to_string(),
                        message: format!("expected a list, got {}", other),
                    })
                }
            }
        }
    }

    /// Projects visible to the user, optionally only active or completed ones
    pub fn get_projects(&self, is_completed: Option<bool>) -> Result<Vec<Value>, ApiError> {
        let params: Vec<(&str, String)> = is_completed
            .map(|done| vec![("is_completed", u8::from(done).to_string())])
            .unwrap_or_default();
        self.get_all("get_projects", &params, "projects", Window::default())
    }

    pub fn get_project(&self, project_id: u64) -> Result<Value, ApiError> {
        self.get(&format!("get_project/{}", project_id), &[])
    }

    /// Delete a case; with `soft` the server only reports what would go
    pub fn delete_case(&self, case_id: u64, soft: bool) -> Result<Value, ApiError> {
        let params: Vec<(&str, String)> = if soft {
            vec![("soft", "1".to_string())]
        } else {
            Vec::new()
        };
        self.post(
            &format!("delete_case/{}", case_id),
            &params,
            &Value::Object(Map::new()),
        )
    }
}

/// Slice of a list endpoint to fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Window {
    offset: usize,
    limit: Option<usize>,
}

impl Window {
    fn from_filter(filter: &CaseFilter) -> Self {
        Self {
            offset: filter.offset.unwrap_or(0),
            limit: filter.limit,
        }
    }

    /// Size of the next page given how many items are already fetched
    fn page_size(&self, fetched: usize) -> usize {
        match self.limit {
            Some(limit) => limit.saturating_sub(fetched).min(PAGE_SIZE),
            None => PAGE_SIZE,
        }
    }
}

/// Pull the item list out of a paginated response object
fn extract_page(mut page: Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    if let Some(Value::Array(list)) = page.remove(key) {
        return Some(list);
    }
    page.into_iter()
        .filter(|(k, _)| !PAGE_METADATA_KEYS.contains(&k.as_str()))
        .find_map(|(_, v)| match v {
            Value::Array(list) => Some(list),
            _ => None,
        })
}

fn read_response(endpoint: &str, response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if !status.is_success() {
        // TestRail reports failures as {"error": "..."}
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        return Err(ApiError::Http {
            status: status.as_u16(),
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

impl TestRailApi for HttpClient {
    fn get_suites(&self, project_id: u64) -> Result<Vec<Suite>, ApiError> {
        let endpoint = format!("get_suites/{}", project_id);
        let value = self.get(&endpoint, &[])?;
        let list = match value {
            Value::Object(page) => Value::Array(extract_page(page, "suites").unwrap_or_default()),
            other => other,
        };
        decode(&endpoint, list)
    }

    fn get_sections(
        &self,
        project_id: u64,
        suite_id: Option<u64>,
    ) -> Result<Vec<Section>, ApiError> {
        let endpoint = format!("get_sections/{}", project_id);
        let params: Vec<(&str, String)> = suite_id
            .map(|id| vec![("suite_id", id.to_string())])
            .unwrap_or_default();
        let items = self.get_all(&endpoint, &params, "sections", Window::default())?;
        decode(&endpoint, Value::Array(items))
    }

    fn get_section(&self, section_id: u64) -> Result<Section, ApiError> {
        let endpoint = format!("get_section/{}", section_id);
        let value = self.get(&endpoint, &[])?;
        decode(&endpoint, value)
    }

    fn add_section(&self, project_id: u64, section: &NewSection<'_>) -> Result<Section, ApiError> {
        let endpoint = format!("add_section/{}", project_id);
        let body = serde_json::to_value(section).map_err(|e| ApiError::Decode {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;
        let value = self.post(&endpoint, &[], &body)?;
        decode(&endpoint, value)
    }

    fn get_case(&self, case_id: u64) -> Result<CaseRecord, ApiError> {
        let endpoint = format!("get_case/{}", case_id);
        let value = self.get(&endpoint, &[])?;
        decode(&endpoint, value)
    }

    fn get_cases(&self, project_id: u64, filter: &CaseFilter) -> Result<Vec<CaseRecord>, ApiError> {
        let endpoint = format!("get_cases/{}", project_id);
        let params = filter.query_params();
        let items = self.get_all(&endpoint, &params, "cases", Window::from_filter(filter))?;
        decode(&endpoint, Value::Array(items))
    }

    fn add_case(
        &self,
        section_id: u64,
        title: &str,
        fields: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let mut body = fields.clone();
        body.insert("title".to_string(), Value::String(title.to_string()));
        self.post(
            &format!("add_case/{}", section_id),
            &[],
            &Value::Object(body),
        )
    }

    fn update_case(&self, case_id: u64, fields: &Map<String, Value>) -> Result<Value, ApiError> {
        self.post(
            &format!("update_case/{}", case_id),
            &[],
            &Value::Object(fields.clone()),
        )
    }
}
