use super::*;
use tempfile::TempDir;

fn write_template(dir: &Path, name: &str) -> PathBuf {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Client").unwrap();
    sheet.write_string(0, 1, "{{client}}").unwrap();
    let path = dir.join(name);
    workbook.save(&path).unwrap();
    path
}

// =========================================================================
// format_size Tests
// =========================================================================

#[test]
fn test_format_size() {
    assert_eq!(format_size(512), "512 B");
    assert_eq!(format_size(2048), "2.0 KB");
    assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
}

// =========================================================================
// locate_template Tests
// =========================================================================

#[test]
fn test_locate_template_by_path() {
    let dir = TempDir::new().unwrap();
    let path = write_template(dir.path(), "invoice.xlsx");

    let (store, name) = locate_template(path.to_str().unwrap(), Path::new("unused"));
    assert_eq!(store.root(), dir.path());
    assert_eq!(name, "invoice.xlsx");
}

#[test]
fn test_locate_template_by_name() {
    let (store, name) = locate_template("invoice", Path::new("/srv/templates"));
    assert_eq!(store.root(), Path::new("/srv/templates"));
    assert_eq!(name, "invoice");
}

// =========================================================================
// Command Tests
// =========================================================================

#[test]
fn test_fill_writes_output() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx");
    let data = dir.path().join("data.json");
    fs::write(&data, r#"{"client": "Acme"}"#).unwrap();
    let output = dir.path().join("out.xlsx");

    fill(
        "invoice".to_string(),
        data,
        output.clone(),
        dir.path().to_path_buf(),
        Vec::new(),
        false,
    )
    .unwrap();

    let workbook = crate::excel::Workbook::open(&output).unwrap();
    assert_eq!(
        workbook.cell_value("Sheet1", "B1"),
        Some(crate::excel::CellValue::Text("Acme".to_string()))
    );
}

#[test]
fn test_fill_rejects_non_object_data() {
    let dir = TempDir::new().unwrap();
    write_template(dir.path(), "invoice.xlsx");
    let data = dir.path().join("data.json");
    fs::write(&data, "[1, 2]").unwrap();

    let result = fill(
        "invoice".to_string(),
        data,
        dir.path().join("out.xlsx"),
        dir.path().to_path_buf(),
        Vec::new(),
        false,
    );
    assert!(matches!(result, Err(XlFillError::Validation(_))));
}

#[test]
fn test_fill_missing_template() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data.json");
    fs::write(&data, r#"{"client": "Acme"}"#).unwrap();

    let result = fill(
        "nope".to_string(),
        data,
        dir.path().join("out.xlsx"),
        dir.path().to_path_buf(),
        Vec::new(),
        false,
    );
    assert!(matches!(result, Err(XlFillError::TemplateNotFound(_))));
}

#[test]
fn test_table_requires_array() {
    let dir = TempDir::new().unwrap();
    let rows = dir.path().join("rows.json");
    fs::write(&rows, r#"{"a": 1}"#).unwrap();

    let result = table(rows, dir.path().join("out.xlsx"), None);
    assert!(matches!(result, Err(XlFillError::Validation(_))));
}

#[test]
fn test_table_writes_output() {
    let dir = TempDir::new().unwrap();
    let rows = dir.path().join("rows.json");
    fs::write(&rows, r#"[{"Item": "Widget", "Amount": 3}]"#).unwrap();
    let output = dir.path().join("table.xlsx");

    table(rows, output.clone(), Some("Items".to_string())).unwrap();
    assert!(output.exists());
}
