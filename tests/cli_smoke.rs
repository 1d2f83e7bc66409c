use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use tempfile::TempDir;

const LEAD_PAGE: &str = "demos/lead-info.json";
const LEAD_RECORD: &str = "demos/lead.record.json";

/// Config with every pause at zero so fills finish immediately.
fn fast_config(dir: &Path) -> PathBuf {
    let path = dir.join("formfill.yaml");
    fs::write(
        &path,
        "log_level: warn\ntimings:\n  settle_ms: 0\n  dropdown_open_ms: 0\n  typeahead_char_ms: 0\n  typeahead_settle_ms: 0\n  escape_settle_ms: 0\n  option_settle_ms: 0\n  retry_delay_ms: 0\n  entity_render_ms: 0\n  toggle_render_ms: 0\n",
    )
    .expect("write config");
    path
}

fn formfill(config: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("formfill");
    let mut cmd = Command::new(bin);
    cmd.args(["--config", config.to_str().unwrap()]);
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8 output");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn fill_reports_every_field() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());
    let report_path = dir.path().join("report.json");

    let assert = formfill(&config)
        .args(["-o", "json", "fill", "--page", LEAD_PAGE, "--record", LEAD_RECORD])
        .args(["--report", report_path.to_str().unwrap()])
        .assert()
        .success();

    let report = stdout_json(assert.get_output());
    assert_eq!(report["page"], "lead-info");
    assert_eq!(report["counts"]["text"]["applied"], 3);
    assert_eq!(report["counts"]["dropdown"]["applied"], 2);

    let outcomes = report["outcomes"].as_array().unwrap();
    let state = outcomes.iter().find(|o| o["field"] == "State").unwrap();
    assert_eq!(state["matched"], "Washington");

    let written: Value = serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(written["session_id"], report["session_id"]);
}

#[test]
fn fill_reads_the_record_from_stdin() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());

    let assert = formfill(&config)
        .args(["fill", "--page", LEAD_PAGE, "--record", "-"])
        .write_stdin(r#"{"FirstName":"Grace"}"#)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("FirstName"), "{stdout}");
}

#[test]
fn context_classifies_the_snapshot() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());

    let assert = formfill(&config)
        .args(["-o", "json", "context", "--page", LEAD_PAGE])
        .assert()
        .success();

    let context = stdout_json(assert.get_output());
    assert_eq!(context["kind"], "lead-info");
    assert_eq!(context["heading"], "Lead Info");
}

#[test]
fn scan_writes_a_hints_file() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());
    let hints_path = dir.path().join("hints.json");

    let assert = formfill(&config)
        .args(["-o", "json", "scan", "--page", LEAD_PAGE])
        .args(["--hints-out", hints_path.to_str().unwrap()])
        .assert()
        .success();

    let inventory = stdout_json(assert.get_output());
    assert_eq!(inventory["text_entries"].as_array().unwrap().len(), 4);
    assert_eq!(
        inventory["native_lists"]["State"]["options"],
        serde_json::json!(["Washington", "Washington DC", "Oregon"])
    );

    let hints: Value = serde_json::from_str(&fs::read_to_string(hints_path).unwrap()).unwrap();
    assert!(hints["State"].as_array().is_some());
}

#[test]
fn config_validate_accepts_the_embedded_mapping() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());

    let assert = formfill(&config)
        .args(["-o", "json", "config", "validate"])
        .assert()
        .success();

    let summary = stdout_json(assert.get_output());
    assert_eq!(summary["field_mapping"], "embedded");
    assert!(summary["text_fields"].as_u64().unwrap() > 0);
    assert_eq!(summary["warnings"].as_array().unwrap().len(), 0);
}

#[test]
fn serve_answers_one_line_per_request() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());

    let input = concat!(
        "{\"op\":\"context\"}\n",
        "{\"op\":\"fill\",\"record\":{\"FirstName\":\"Ada\",\"State\":\"OR\"}}\n",
        "{\"op\":\"launch\"}\n",
    );
    let assert = formfill(&config)
        .args(["serve", "--page", LEAD_PAGE])
        .write_stdin(input)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let responses: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["result"]["kind"], "lead-info");
    assert_eq!(responses[1]["ok"], true);
    assert_eq!(responses[1]["result"]["counts"]["dropdown"]["applied"], 1);
    assert_eq!(responses[2]["ok"], false);
}

#[test]
fn missing_backend_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(dir.path());

    formfill(&config).args(["context"]).assert().failure();
}

#[test]
fn missing_config_file_is_an_error() {
    let bin = assert_cmd::cargo::cargo_bin!("formfill");
    Command::new(bin)
        .args(["--config", "/nonexistent/formfill.yaml", "config", "show"])
        .assert()
        .failure();
}
