//! Template catalogue and inspector tests

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use xlfill::core::scan;
use xlfill::excel::inspect;
use xlfill::templates::TemplateStore;
use xlfill::XlFillError;

// ═══════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_list_is_sorted_and_skips_lock_files() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "zeta.xlsx", scalar_template);
    write_template(dir.path(), "alpha.xlsx", scalar_template);
    std::fs::write(dir.path().join("~$alpha.xlsx"), b"lock").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a template").unwrap();
    std::fs::create_dir(dir.path().join("folder.xlsx")).unwrap();

    let store = TemplateStore::new(dir.path());
    let names: Vec<String> = store.list().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["alpha.xlsx", "zeta.xlsx"]);
}

#[test]
fn test_list_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let store = TemplateStore::new(dir.path().join("missing"));
    assert!(matches!(store.list(), Err(XlFillError::Io(_))));
}

#[test]
fn test_resolve_with_and_without_extension() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx", scalar_template);
    let store = TemplateStore::new(dir.path());

    let by_stem = store.resolve("invoice").unwrap();
    let by_name = store.resolve("invoice.xlsx").unwrap();
    assert_eq!(by_stem, by_name);
    assert_eq!(by_stem.stem(), "invoice");
    assert!(by_stem.size_bytes > 0);
}

#[test]
fn test_resolve_rejects_traversal_and_unknown_names() {
    let dir = TempDir::new().unwrap();
    let store = TemplateStore::new(dir.path());

    assert!(matches!(
        store.resolve("../etc/passwd"),
        Err(XlFillError::InvalidTemplateName(_))
    ));
    assert!(matches!(
        store.resolve("missing"),
        Err(XlFillError::TemplateNotFound(name)) if name == "missing.xlsx"
    ));
}

#[test]
fn test_resolved_template_loads_directly() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx", scalar_template);
    std::fs::write(dir.path().join("broken.xlsx"), b"not a zip").unwrap();
    let store = TemplateStore::new(dir.path());

    let template = store.resolve(" invoice ").unwrap();
    let workbook = template.load().unwrap();
    assert_eq!(workbook.source(), "invoice.xlsx");
    assert_eq!(workbook.sheet_names(), vec!["Sheet1"]);

    let broken = store.resolve("broken").unwrap();
    assert!(matches!(broken.load(), Err(XlFillError::TemplateCorrupt { .. })));
}

#[test]
fn test_corrupt_template_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.xlsx"), b"this is not a zip").unwrap();
    let store = TemplateStore::new(dir.path());

    let err = store.load_template("broken").unwrap_err();
    assert!(matches!(err, XlFillError::TemplateCorrupt { ref template, .. } if template == "broken.xlsx"));
}

#[test]
fn test_loaded_templates_are_independent() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx", scalar_template);
    let store = TemplateStore::new(dir.path());

    let first = store.load_template("invoice").unwrap();
    let filled = xlfill::core::fill(first, &json!({"client": "Acme"}), &Default::default()).unwrap();
    assert!(filled.workbook.cell_value("Sheet1", "B1").is_some());

    let second = store.load_template("invoice").unwrap();
    assert_eq!(
        second.cell_value("Sheet1", "B1"),
        Some(xlfill::excel::CellValue::Text("{{client}}".to_string()))
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// SCAN AND INSPECTOR
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_scan_lists_placeholders_and_groups() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "lines.xlsx", line_items_template);
    let workbook = TemplateStore::new(dir.path()).load_template("lines").unwrap();

    let template_scan = scan(&workbook).unwrap();
    assert_eq!(template_scan.placeholders, vec!["client"]);
    assert_eq!(template_scan.row_groups.len(), 1);

    let group = &template_scan.row_groups[0];
    assert_eq!(group.name, "items");
    assert_eq!(group.sheet, "Sheet1");
    assert_eq!((group.first_row, group.last_row), (2, 2));
    assert_eq!(group.fields, vec!["items.name", "items.qty"]);
}

#[test]
fn test_inspect_template_with_groups() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "line_items.xlsx", line_items_template);
    let template = TemplateStore::new(dir.path()).resolve("line_items").unwrap();

    let info = inspect(&template);
    assert_eq!(info.name, "line_items");
    assert_eq!(info.display_name, "Line Items");
    assert_eq!(info.filename, "line_items.xlsx");
    assert_eq!(info.sheets, vec!["Sheet1"]);
    assert_eq!(info.columns, vec!["Item", "Qty", "Line"]);
    assert_eq!(info.description, "Excel template with 0 table(s)");
    assert_eq!(
        info.sample_data,
        json!({
            "client": "Sample Value",
            "items": [{"name": "Sample Value", "qty": "Sample Value"}]
        })
    );
}

#[test]
fn test_inspect_template_with_table() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "sales.xlsx", table_template);
    let template = TemplateStore::new(dir.path()).resolve("sales").unwrap();

    let info = inspect(&template);
    assert_eq!(info.tables, vec!["Sales"]);
    assert_eq!(info.columns, vec!["Region", "Amount"]);
    assert_eq!(info.description, "Excel template with 1 table(s)");
    assert_eq!(info.row_groups[0].name, "rows");
}

#[test]
fn test_inspect_plain_header_template() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "cost_report.xlsx", |sheet| {
        sheet.write_string(0, 0, "Rule ID").unwrap();
        sheet.write_string(0, 1, "Cost Center").unwrap();
        sheet.write_string(0, 2, "Amount").unwrap();
    });
    let template = TemplateStore::new(dir.path()).resolve("cost_report").unwrap();

    let info = inspect(&template);
    assert!(info.placeholders.is_empty());
    assert_eq!(
        info.sample_data,
        json!({"Rule ID": "RULE001", "Cost Center": "Sample Group", "Amount": 1000.5})
    );
}

#[test]
fn test_inspect_corrupt_template_keeps_catalogue_entry() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("broken.xlsx"), b"garbage").unwrap();
    let template = TemplateStore::new(dir.path()).resolve("broken").unwrap();

    let info = inspect(&template);
    assert_eq!(info.name, "broken");
    assert!(info.sheets.is_empty());
    assert!(info.placeholders.is_empty());
    assert_eq!(info.sample_data, json!({}));
}
