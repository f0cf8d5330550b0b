//! Integration tests for the trcli binary
//!
//! These exercise argument parsing, configuration resolution and the import
//! paths that finish before any request is sent, so no server is needed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a trcli command isolated from the user's environment
fn trcli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trcli").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("TESTRAIL_URL")
        .env_remove("TESTRAIL_EMAIL")
        .env_remove("TESTRAIL_PASSWORD")
        .env_remove("TESTRAIL_PROFILE")
        .env_remove("TRCLI_LOG");
    cmd
}

const CREDENTIALS: [&str; 6] = [
    "--url",
    "https://example.testrail.io",
    "--email",
    "qa@example.com",
    "--password",
    "secret",
];

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("TestRail"))
        .stdout(predicate::str::contains("cases"))
        .stdout(predicate::str::contains("sections"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("trcli"));
}

#[test]
fn test_import_help_lists_options() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["cases", "import", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--csv"))
        .stdout(predicate::str::contains("--steps-field"))
        .stdout(predicate::str::contains("--create-missing-sections"))
        .stdout(predicate::str::contains("--chunk-size"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp).arg("frobnicate").assert().failure();
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trcli"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_missing_credentials_reported() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["suites", "list", "--project-id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TESTRAIL_URL"));
}

#[test]
fn test_missing_explicit_config_file() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["--config", "nope.yaml", "suites", "list", "--project-id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_config_init_writes_profile() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["--profile", "staging", "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"));

    let path = tmp.path().join(".testrail-cli.yaml");
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("staging"));
    assert!(contents.contains("https://example.testrail.io"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    trcli(&tmp)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".testrail-cli.yaml"));
}

#[test]
fn test_config_path_when_absent() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not created)"));
}

// ============================================================================
// Import without a server
// ============================================================================

#[test]
fn test_import_missing_csv() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["cases", "import", "--project-id", "1", "--csv", "missing.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CSV file not found"));
}

#[test]
fn test_import_without_case_id_column_json() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("cases.csv"), "title,section\nLogin,Auth\n").unwrap();

    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["--format", "json", "cases", "import", "--project-id", "1", "--csv", "cases.csv"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"errors\": 1"))
        .stdout(predicate::str::contains("case_id"));
}

#[test]
fn test_import_malformed_mapping() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("cases.csv"), "case_id,title\n,Login\n").unwrap();
    fs::write(tmp.path().join("map.json"), "[1, 2").unwrap();

    trcli(&tmp)
        .args(CREDENTIALS)
        .args([
            "cases",
            "import",
            "--project-id",
            "1",
            "--csv",
            "cases.csv",
            "--mapping",
            "map.json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("map.json"));
}

// ============================================================================
// Case management, projects and raw calls
// ============================================================================

#[test]
fn test_help_lists_all_command_groups() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("raw"));
}

#[test]
fn test_cases_help_lists_crud_commands() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["cases", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn test_cases_add_help_lists_field_flags() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["cases", "add", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--section-id"))
        .stdout(predicate::str::contains("--title"))
        .stdout(predicate::str::contains("--priority-id"))
        .stdout(predicate::str::contains("--field"));
}

#[test]
fn test_cases_delete_help_lists_confirmation_flags() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["cases", "delete", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--soft"));
}

#[test]
fn test_cases_list_help_lists_date_and_paging_filters() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["cases", "list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--created-after"))
        .stdout(predicate::str::contains("--updated-before"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--offset"));
}

#[test]
fn test_cases_list_rejects_bad_date() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["cases", "list", "--project-id", "1", "--created-after", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid datetime"));
}

#[test]
fn test_cases_update_without_fields_fails() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["cases", "update", "C12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to update"));
}

#[test]
fn test_projects_help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["projects", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("get"));
}

#[test]
fn test_raw_help_lists_options() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(["raw", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--method"))
        .stdout(predicate::str::contains("--param"))
        .stdout(predicate::str::contains("--data"))
        .stdout(predicate::str::contains("--payload-file"));
}

#[test]
fn test_raw_rejects_malformed_data() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["raw", "add_case/3", "--method", "post", "--data", "title"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}

#[test]
fn test_raw_get_with_body_fails() {
    let tmp = TempDir::new().unwrap();
    trcli(&tmp)
        .args(CREDENTIALS)
        .args(["raw", "get_projects", "--data", "name=x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GET requests take no body"));
}
