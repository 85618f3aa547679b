//! CLI integration tests
//!
//! Runs the `xlfill` and `xlfill-server` binaries with assert_cmd.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn xlfill() -> Command {
    let mut cmd = Command::cargo_bin("xlfill").unwrap();
    cmd.env_remove("XLFILL_TEMPLATES_DIR").env("NO_COLOR", "1");
    cmd
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    xlfill()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("xlfill"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    xlfill()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_fill_help() {
    xlfill()
        .args(["fill", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--text-field"));
}

#[test]
fn test_server_help() {
    Command::cargo_bin("xlfill-server")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--templates-dir"))
        .stdout(predicate::str::contains("--port"));
}

// ═══════════════════════════════════════════════════════════════════════════
// FILL
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_fill_by_name() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx", scalar_template);
    let data = dir.path().join("data.json");
    std::fs::write(
        &data,
        r#"{"client": "Acme", "total": 10, "issued": "2024-01-15", "author": {"name": "D"}}"#,
    )
    .unwrap();
    let output = dir.path().join("out.xlsx");

    xlfill()
        .args(["fill", "invoice", "--data"])
        .arg(&data)
        .arg("--output")
        .arg(&output)
        .arg("--templates-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Report generated"))
        .stdout(predicate::str::contains("warning").not());

    let filled = xlfill::excel::Workbook::open(&output).unwrap();
    assert_eq!(
        filled.cell_value("Sheet1", "B1"),
        Some(xlfill::excel::CellValue::Text("Acme".to_string()))
    );
}

#[test]
fn test_fill_by_path_shows_warnings() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path(), "invoice.xlsx", scalar_template);
    let data = dir.path().join("data.json");
    std::fs::write(&data, r#"{"client": "Acme"}"#).unwrap();

    xlfill()
        .arg("fill")
        .arg(&template)
        .arg("-d")
        .arg(&data)
        .arg("-o")
        .arg(dir.path().join("out.xlsx"))
        .assert()
        .success()
        .stdout(predicate::str::contains("3 warning(s)"))
        .stdout(predicate::str::contains("missing field 'author.name'"));
}

#[test]
fn test_fill_unknown_template_fails() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data.json");
    std::fs::write(&data, r#"{"client": "Acme"}"#).unwrap();

    xlfill()
        .args(["fill", "missing", "-d"])
        .arg(&data)
        .arg("-o")
        .arg(dir.path().join("out.xlsx"))
        .arg("-t")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template 'missing.xlsx' not found"));
}

#[test]
fn test_fill_bad_json_fails() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx", scalar_template);
    let data = dir.path().join("data.json");
    std::fs::write(&data, "{not json").unwrap();

    xlfill()
        .args(["fill", "invoice", "-d"])
        .arg(&data)
        .arg("-o")
        .arg(dir.path().join("out.xlsx"))
        .arg("-t")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CATALOGUE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_templates_lists_catalogue() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx", scalar_template);
    write_template(dir.path(), "lines.xlsx", line_items_template);

    xlfill()
        .args(["templates", "--verbose", "-t"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("invoice.xlsx"))
        .stdout(predicate::str::contains("Row group items"))
        .stdout(predicate::str::contains("2 template(s)"));
}

#[test]
fn test_inspect_json() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "lines.xlsx", line_items_template);

    let output = xlfill()
        .args(["inspect", "lines", "--json", "-t"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["name"], "lines");
    assert_eq!(info["placeholders"], serde_json::json!(["client"]));
}

// ═══════════════════════════════════════════════════════════════════════════
// TABLE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_table_command() {
    let dir = TempDir::new().unwrap();
    let rows = dir.path().join("rows.json");
    std::fs::write(&rows, r#"[{"Item": "Widget", "Amount": 2}, {"Item": "Gadget", "Amount": 3}]"#).unwrap();
    let output = dir.path().join("table.xlsx");

    xlfill()
        .arg("table")
        .arg(&rows)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows x 2 columns"));
    assert!(output.exists());
}
