//! CSV import/export tests against an in-memory TestRail stub
//!
//! The stub records every call so tests can assert both the payloads sent
//! and that no request was made at all.

use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use trcli::core::{
    ApiError, CaseFilter, CaseRecord, NewSection, Section, SectionError, Suite, TestRailApi,
};
use trcli::csv_import::{
    export_to_csv, import_from_csv, ExportOptions, ImportOptions, PipelineError, EXPORT_COLUMNS,
};

struct StubClient {
    suites: Vec<Suite>,
    sections: RefCell<Vec<Section>>,
    cases: Vec<CaseRecord>,
    fail_titles: Vec<String>,
    created: RefCell<Vec<(u64, String, Map<String, Value>)>>,
    updated: RefCell<Vec<(u64, Map<String, Value>)>>,
    new_sections: RefCell<Vec<(String, Option<u64>)>>,
    calls: Cell<usize>,
}

impl StubClient {
    fn new() -> Self {
        Self {
            suites: vec![Suite {
                id: 1,
                name: "Default".to_string(),
            }],
            sections: RefCell::new(vec![section(10, "Auth", None)]),
            cases: Vec::new(),
            fail_titles: Vec::new(),
            created: RefCell::new(Vec::new()),
            updated: RefCell::new(Vec::new()),
            new_sections: RefCell::new(Vec::new()),
            calls: Cell::new(0),
        }
    }

    fn call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn created(&self, idx: usize) -> (u64, String, Map<String, Value>) {
        self.created.borrow()[idx].clone()
    }

    fn updated(&self, idx: usize) -> (u64, Map<String, Value>) {
        self.updated.borrow()[idx].clone()
    }
}

fn section(id: u64, name: &str, parent_id: Option<u64>) -> Section {
    Section {
        id,
        name: name.to_string(),
        parent_id,
        suite_id: Some(1),
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Http {
        status: 400,
        message: format!("Field :{} is not a valid ID.", what),
    }
}

impl TestRailApi for StubClient {
    fn get_suites(&self, _project_id: u64) -> Result<Vec<Suite>, ApiError> {
        self.call();
        Ok(self.suites.clone())
    }

    fn get_sections(
        &self,
        _project_id: u64,
        _suite_id: Option<u64>,
    ) -> Result<Vec<Section>, ApiError> {
        self.call();
        Ok(self.sections.borrow().clone())
    }

    fn get_section(&self, section_id: u64) -> Result<Section, ApiError> {
        self.call();
        self.sections
            .borrow()
            .iter()
            .find(|s| s.id == section_id)
            .cloned()
            .ok_or_else(|| not_found("section_id"))
    }

    fn add_section(&self, _project_id: u64, new: &NewSection<'_>) -> Result<Section, ApiError> {
        self.call();
        let mut sections = self.sections.borrow_mut();
        let created = section(99 + sections.len() as u64, new.name, new.parent_id);
        sections.push(created.clone());
        self.new_sections
            .borrow_mut()
            .push((new.name.to_string(), new.parent_id));
        Ok(created)
    }

    fn get_case(&self, case_id: u64) -> Result<CaseRecord, ApiError> {
        self.call();
        self.cases
            .iter()
            .find(|c| c.id == case_id)
            .cloned()
            .ok_or_else(|| not_found("case_id"))
    }

    fn get_cases(
        &self,
        _project_id: u64,
        filter: &CaseFilter,
    ) -> Result<Vec<CaseRecord>, ApiError> {
        self.call();
        Ok(self
            .cases
            .iter()
            .filter(|c| filter.section_id.is_none() || c.section_id == filter.section_id)
            .cloned()
            .collect())
    }

    fn add_case(
        &self,
        section_id: u64,
        title: &str,
        fields: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        self.call();
        if self.fail_titles.iter().any(|t| t == title) {
            return Err(ApiError::Http {
                status: 400,
                message: "Field :title is too long.".to_string(),
            });
        }
        let mut created = self.created.borrow_mut();
        created.push((section_id, title.to_string(), fields.clone()));
        Ok(json!({"id": created.len(), "title": title, "section_id": section_id}))
    }

    fn update_case(&self, case_id: u64, fields: &Map<String, Value>) -> Result<Value, ApiError> {
        self.call();
        self.updated.borrow_mut().push((case_id, fields.clone()));
        Ok(json!({"id": case_id}))
    }
}

fn write_csv(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("cases.csv");
    fs::write(&path, content).unwrap();
    path
}

fn import(client: &StubClient, csv: &Path) -> trcli::csv_import::ImportResult {
    import_from_csv(client, &ImportOptions::new(1, csv)).unwrap()
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_multi_row_case_creates_one_case() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section,step,expected\n\
         ,Create with rows,Auth,Open login,Form shows\n\
         ,Create with rows,Auth,Submit form,Success banner\n",
    );
    let client = StubClient::new();

    let result = import(&client, &csv);

    assert_eq!((result.created, result.updated, result.errors), (1, 0, 0));
    assert_eq!(result.error_details, None);

    let (section_id, title, payload) = client.created(0);
    assert_eq!(section_id, 10);
    assert_eq!(title, "Create with rows");
    assert_eq!(
        payload["custom_steps_separated"],
        json!([
            {"content": "Open login", "expected": "Form shows"},
            {"content": "Submit form", "expected": "Success banner"},
        ])
    );
    assert!(!payload.contains_key("title"));
    assert!(!payload.contains_key("section"));
}

#[test]
fn test_missing_case_id_column_makes_no_calls() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(&tmp, "title,section,step\nLogin,Auth,Open\n");
    let client = StubClient::new();

    let result = import(&client, &csv);

    assert_eq!((result.created, result.updated, result.errors), (0, 0, 1));
    let details = result.error_details.unwrap();
    assert!(details[0].contains("case_id"));
    assert_eq!(client.calls.get(), 0);
}

#[test]
fn test_missing_csv_file_is_one_error() {
    let tmp = TempDir::new().unwrap();
    let client = StubClient::new();

    let result = import(&client, &tmp.path().join("nope.csv"));

    assert_eq!(result.errors, 1);
    assert!(result.error_details.unwrap()[0].starts_with("CSV file not found"));
    assert_eq!(client.calls.get(), 0);
}

#[test]
fn test_teststeps_and_numbered_steps() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section,teststeps,step_1,expected_1,step_2,expected_2\n\
         ,Create with teststeps,Auth,\"Open login | Form shows\\nSubmit form | \
         Success banner\",,,,\n\
         123,Update with columns,Auth,,Add item,Item added,Remove item,Cart cleared\n",
    );
    let client = StubClient::new();

    let result = import(&client, &csv);

    assert_eq!((result.created, result.updated, result.errors), (1, 1, 0));
    assert_eq!(
        client.created(0).2["custom_steps_separated"],
        json!([
            {"content": "Open login", "expected": "Form shows"},
            {"content": "Submit form", "expected": "Success banner"},
        ])
    );

    let (case_id, payload) = client.updated(0);
    assert_eq!(case_id, 123);
    assert_eq!(payload["title"], json!("Update with columns"));
    assert_eq!(
        payload["custom_steps_separated"],
        json!([
            {"content": "Add item", "expected": "Item added"},
            {"content": "Remove item", "expected": "Cart cleared"},
        ])
    );
}

#[test]
fn test_steps_field_and_template_pick_destination() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section,template,steps_field,teststeps\n\
         ,Text template uses blob,Auth,Text,custom_steps,\"Do thing | Expect thing | Info A\"\n\
         ,Steps template uses list,Auth,Steps,,\"Click login | Form shows | Browser Chrome\"\n",
    );
    let client = StubClient::new();

    let result = import(&client, &csv);
    assert_eq!((result.created, result.errors), (2, 0));

    let text_case = client.created(0).2;
    let text = text_case["custom_steps"].as_str().unwrap();
    assert!(text.contains("Do thing"));
    assert!(text.contains("Expected: Expect thing"));
    assert!(text.contains("Info: Info A"));
    assert!(!text_case.contains_key("custom_steps_separated"));
    assert!(!text_case.contains_key("template"));
    assert!(!text_case.contains_key("steps_field"));

    let steps_case = client.created(1).2;
    assert_eq!(
        steps_case["custom_steps_separated"][0]["additional_info"],
        json!("Browser Chrome")
    );
}

#[test]
fn test_unkeyable_rows_excluded_with_one_error_each() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section,step\n\
         ,,Auth,Orphan step\n\
         ,Valid,Auth,Do\n\
         ,  ,Auth,Another orphan\n",
    );
    let client = StubClient::new();

    let result = import(&client, &csv);

    assert_eq!(result.created, 1);
    assert_eq!(result.errors, 2);
    let details = result.error_details.unwrap();
    assert!(details[0].starts_with("Row 2:"));
    assert!(details[1].starts_with("Row 4:"));
    assert_eq!(client.created(0).1, "Valid");
}

#[test]
fn test_conflicting_rows_keep_first_value() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,priority_id,refs,step\n\
         C7,Login,1,,First\n\
         7,,2,REQ-9,Second\n",
    );
    let client = StubClient::new();

    let result = import(&client, &csv);

    assert_eq!((result.updated, result.errors), (1, 1));
    assert!(result.error_details.unwrap()[0].contains("'priority_id'"));

    let (case_id, payload) = client.updated(0);
    assert_eq!(case_id, 7);
    assert_eq!(payload["priority_id"], json!("1"));
    assert_eq!(payload["refs"], json!("REQ-9"));
    assert_eq!(
        payload["custom_steps_separated"],
        json!([{"content": "First", "expected": ""}, {"content": "Second", "expected": ""}])
    );
}

#[test]
fn test_unparseable_steps_exclude_row() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(&tmp, "case_id,title,section,teststeps\n,Broken,Auth,|\n");
    let client = StubClient::new();

    let result = import(&client, &csv);

    assert_eq!((result.created, result.errors), (0, 1));
    assert_eq!(
        result.error_details.unwrap(),
        vec!["Row 2: Unable to parse steps from 'teststeps'"]
    );
}

#[test]
fn test_api_failure_does_not_abort_siblings() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section\n\
         ,Rejected,Auth\n\
         ,Accepted,Auth\n",
    );
    let mut client = StubClient::new();
    client.fail_titles.push("Rejected".to_string());

    let result = import(&client, &csv);

    assert_eq!((result.created, result.errors), (1, 1));
    let details = result.error_details.unwrap();
    assert!(details[0].starts_with("Create error"));
    assert!(details[0].contains("too long"));
}

#[test]
fn test_default_section_and_template_id() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,template_id,step\n\
         ,Uses default,,Do\n\
         ,Has template,1,Do\n",
    );
    let client = StubClient::new();
    let options = ImportOptions {
        section_path: Some("Auth".to_string()),
        template_id: Some(2),
        ..ImportOptions::new(1, &csv)
    };

    let result = import_from_csv(&client, &options).unwrap();

    assert_eq!((result.created, result.errors), (2, 0));
    assert_eq!(client.created(0).0, 10);
    assert_eq!(client.created(0).2["template_id"], json!(2));
    assert_eq!(client.created(1).2["template_id"], json!("1"));
}

#[test]
fn test_run_level_steps_field_overrides_rows() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section,step,expected\n,Scenario,Auth,Given a user,It works\n",
    );
    let client = StubClient::new();
    let options = ImportOptions {
        steps_field: Some("custom_gherkin".to_string()),
        ..ImportOptions::new(1, &csv)
    };

    import_from_csv(&client, &options).unwrap();

    let payload = client.created(0).2;
    assert_eq!(payload["custom_gherkin"], json!("Given a user | Expected: It works"));
    assert!(!payload.contains_key("custom_steps_separated"));
}

#[test]
fn test_missing_section_is_fatal_without_create() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(&tmp, "case_id,title,section\n,Login,Billing/Invoices\n");
    let client = StubClient::new();
    let options = ImportOptions {
        section_path: Some("Billing".to_string()),
        ..ImportOptions::new(1, &csv)
    };

    let err = import_from_csv(&client, &options).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Section(SectionError::NotFound { ref segment, .. }) if segment == "Billing"
    ));
    assert!(client.created.borrow().is_empty());
}

#[test]
fn test_create_missing_sections_builds_hierarchy() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "case_id,title,section\n\
         ,SSO login,Auth/SSO/Okta\n\
         ,SSO logout,Auth/SSO/Okta\n",
    );
    let client = StubClient::new();
    let options = ImportOptions {
        create_missing_sections: true,
        ..ImportOptions::new(1, &csv)
    };

    let result = import_from_csv(&client, &options).unwrap();

    assert_eq!((result.created, result.errors), (2, 0));
    let new_sections = client.new_sections.borrow().clone();
    assert_eq!(
        new_sections,
        vec![("SSO".to_string(), Some(10)), ("Okta".to_string(), Some(100))]
    );
    assert_eq!(client.created(0).0, 101);
    assert_eq!(client.created(1).0, 101);
}

#[test]
fn test_suite_resolution() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(&tmp, "case_id,title,section\n,Login,Auth\n");

    let mut client = StubClient::new();
    client.suites.push(Suite {
        id: 2,
        name: "Regression".to_string(),
    });

    let err = import_from_csv(&client, &ImportOptions::new(1, &csv)).unwrap_err();
    assert!(matches!(err, PipelineError::SuiteRequired));

    let options = ImportOptions {
        suite_name: Some("Smoke".to_string()),
        ..ImportOptions::new(1, &csv)
    };
    let err = import_from_csv(&client, &options).unwrap_err();
    assert_eq!(err.to_string(), "Suite not found: Smoke");

    let options = ImportOptions {
        suite_name: Some("Regression".to_string()),
        ..ImportOptions::new(1, &csv)
    };
    assert_eq!(import_from_csv(&client, &options).unwrap().created, 1);
}

#[test]
fn test_mapping_file_renames_columns() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(
        &tmp,
        "ID,Summary,Folder,Action,Result\n\
         ,Login,Auth,Open login,Form shows\n",
    );
    let mapping = tmp.path().join("mapping.yaml");
    fs::write(
        &mapping,
        "fields:\n  ID: case_id\n  Summary: title\n  Folder:\n    field: section\n  \
         Action: step\n  Result: expected\n",
    )
    .unwrap();

    let client = StubClient::new();
    let options = ImportOptions {
        mapping_path: Some(mapping),
        ..ImportOptions::new(1, &csv)
    };

    let result = import_from_csv(&client, &options).unwrap();

    assert_eq!((result.created, result.errors), (1, 0));
    let (section_id, title, payload) = client.created(0);
    assert_eq!((section_id, title.as_str()), (10, "Login"));
    assert_eq!(
        payload["custom_steps_separated"],
        json!([{"content": "Open login", "expected": "Form shows"}])
    );
}

#[test]
fn test_malformed_mapping_file_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(&tmp, "case_id,title,section\n,Login,Auth\n");
    let mapping = tmp.path().join("mapping.json");
    fs::write(&mapping, "{not json").unwrap();

    let client = StubClient::new();
    let options = ImportOptions {
        mapping_path: Some(mapping),
        ..ImportOptions::new(1, &csv)
    };

    let err = import_from_csv(&client, &options).unwrap_err();
    assert!(matches!(err, PipelineError::Mapping(_)));
    assert_eq!(client.calls.get(), 0);
}

#[test]
fn test_small_chunks_create_every_case_in_order() {
    let tmp = TempDir::new().unwrap();
    let csv = write_csv(&tmp, "case_id,title,section\n,One,Auth\n,Two,Auth\n,Three,Auth\n");
    let client = StubClient::new();
    let options = ImportOptions {
        chunk_size: 2,
        ..ImportOptions::new(1, &csv)
    };

    let result = import_from_csv(&client, &options).unwrap();

    assert_eq!(result.created, 3);
    let titles: Vec<String> = client.created.borrow().iter().map(|c| c.1.clone()).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
}

// ============================================================================
// Export
// ============================================================================

fn exported_case() -> CaseRecord {
    let Value::Object(fields) = json!({
        "priority_id": 2,
        "type_id": 7,
        "template_id": 2,
        "refs": "REQ-1",
        "custom_preconds": "Logged out",
        "custom_steps_separated": [
            {"content": "Open login", "expected": "Form shows", "additional_info": "Chrome"},
            {"content": "Submit form", "expected": "Success banner"},
            {"content": "Log out", "expected": "Login page"},
        ],
    }) else {
        unreachable!()
    };
    CaseRecord {
        id: 5,
        title: "Login flow".to_string(),
        section_id: Some(11),
        fields,
    }
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

#[test]
fn test_export_round_trip() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("nested/dir/export.csv");

    let mut client = StubClient::new();
    client.sections.borrow_mut().push(section(11, "Login", Some(10)));
    client.cases.push(exported_case());

    let options = ExportOptions {
        project_id: 1,
        csv_path: out.clone(),
        suite_id: Some(1),
        ..Default::default()
    };
    let summary = export_to_csv(&client, &options).unwrap();
    assert_eq!(summary.exported, 3);

    let (headers, rows) = read_rows(&out);
    assert_eq!(headers, EXPORT_COLUMNS);
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(&row[..3], ["5", "Login flow", "Auth/Login"]);
    }

    let result = import(&client, &out);
    assert_eq!((result.updated, result.errors), (1, 0));

    let (case_id, payload) = client.updated(0);
    assert_eq!(case_id, 5);
    assert_eq!(
        payload["custom_steps_separated"],
        exported_case().fields["custom_steps_separated"]
    );
    assert_eq!(payload["custom_preconds"], json!("Logged out"));
    assert_eq!(payload["priority_id"], json!("2"));
    assert!(!payload.contains_key("custom_mission"));
}

#[test]
fn test_text_steps_reimport_as_separated_unless_steps_field_given() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("text.csv");

    let mut client = StubClient::new();
    client.cases.push(CaseRecord {
        id: 6,
        title: "Text case".to_string(),
        section_id: Some(10),
        fields: json!({"custom_steps": "Open login\nSubmit form"})
            .as_object()
            .unwrap()
            .clone(),
    });

    let options = ExportOptions {
        project_id: 1,
        csv_path: out.clone(),
        case_ids: vec![6],
        ..Default::default()
    };
    assert_eq!(export_to_csv(&client, &options).unwrap().exported, 2);

    let (headers, rows) = read_rows(&out);
    assert!(!headers.iter().any(|h| h == "steps_field"));
    assert_eq!(rows[0][11], "Open login");
    assert_eq!(rows[1][11], "Submit form");

    import(&client, &out);
    let (_, payload) = client.updated(0);
    assert_eq!(
        payload["custom_steps_separated"],
        json!([
            {"content": "Open login", "expected": ""},
            {"content": "Submit form", "expected": ""},
        ])
    );
    assert!(!payload.contains_key("custom_steps"));

    let options = ImportOptions {
        steps_field: Some("custom_steps".to_string()),
        ..ImportOptions::new(1, &out)
    };
    import_from_csv(&client, &options).unwrap();
    let (_, payload) = client.updated(1);
    assert_eq!(payload["custom_steps"], json!("Open login\nSubmit form"));
    assert!(!payload.contains_key("custom_steps_separated"));
}

#[test]
fn test_export_stepless_case_and_explicit_ids() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("export.csv");

    let mut client = StubClient::new();
    client.cases.push(CaseRecord {
        id: 8,
        title: "No steps".to_string(),
        section_id: Some(10),
        fields: Map::new(),
    });
    client.cases.push(exported_case());

    let options = ExportOptions {
        project_id: 1,
        csv_path: out.clone(),
        case_ids: vec![8],
        ..Default::default()
    };
    assert_eq!(export_to_csv(&client, &options).unwrap().exported, 1);

    let (_, rows) = read_rows(&out);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][..3], ["8", "No steps", "Auth"]);
    assert!(rows[0][11..].iter().all(String::is_empty));
}

#[test]
fn test_export_fetch_failure_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("export.csv");
    let client = StubClient::new();

    let options = ExportOptions {
        project_id: 1,
        csv_path: out.clone(),
        case_ids: vec![404],
        ..Default::default()
    };

    let err = export_to_csv(&client, &options).unwrap_err();
    assert!(matches!(err, PipelineError::Api(ApiError::Http { status: 400, .. })));
    assert!(!out.exists());
}
