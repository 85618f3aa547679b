//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Table, TableColumn, Workbook, Worksheet};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Write a template built with rust_xlsxwriter into `dir`
pub fn write_template<F>(dir: &Path, name: &str, build: F) -> PathBuf
where
    F: FnOnce(&mut Worksheet),
{
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    build(sheet);
    let path = dir.join(name);
    workbook.save(&path).unwrap();
    path
}

/// `Client: {{client}}`, a styled `{{total}}`, an invoice date and a
/// `Notes` line mixing text with a placeholder
pub fn scalar_template(sheet: &mut Worksheet) {
    let money = Format::new().set_num_format("#,##0.00").set_bold();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    sheet.write_string(0, 0, "Client").unwrap();
    sheet.write_string(0, 1, "{{client}}").unwrap();
    sheet.write_string(1, 0, "Total").unwrap();
    sheet.write_string_with_format(1, 1, "{{total}}", &money).unwrap();
    sheet.write_string(2, 0, "Date").unwrap();
    sheet.write_string_with_format(2, 1, "{{ issued }}", &date).unwrap();
    sheet.write_string(3, 0, "Notes").unwrap();
    sheet.write_string(3, 1, "Prepared for {{client}} by {{author.name}}").unwrap();
}

/// Header in row 1, a one-row `items` group in row 2, a total formula in
/// row 3 and a merged footer in row 5
pub fn line_items_template(sheet: &mut Worksheet) {
    let header = Format::new().set_bold();
    let merged = Format::new().set_italic();
    sheet.write_string_with_format(0, 0, "Item", &header).unwrap();
    sheet.write_string_with_format(0, 1, "Qty", &header).unwrap();
    sheet.write_string_with_format(0, 2, "Line", &header).unwrap();
    sheet.write_string(1, 0, "{{#items}}{{items.name}}").unwrap();
    sheet.write_string(1, 1, "{{items.qty}}").unwrap();
    sheet.write_formula(1, 2, "=B2*2").unwrap();
    sheet.write_string(1, 3, "{{/items}}").unwrap();
    sheet.write_string(2, 0, "Total").unwrap();
    sheet.write_formula(2, 1, "=SUM(B2:B2)").unwrap();
    sheet
        .merge_range(4, 0, 4, 2, "Thank you, {{client}}", &merged)
        .unwrap();
}

/// Excel table `Sales` over A1:B2 whose data row is an `rows` group
pub fn table_template(sheet: &mut Worksheet) {
    sheet.write_string(1, 0, "{{#rows}}{{rows.region}}").unwrap();
    sheet.write_string(1, 1, "{{rows.amount}}{{/rows}}").unwrap();
    let columns = vec![
        TableColumn::new().set_header("Region"),
        TableColumn::new().set_header("Amount"),
    ];
    let table = Table::new().set_name("Sales").set_columns(&columns);
    sheet.add_table(0, 0, 1, 1, &table).unwrap();
}

/// A row group nested inside another
pub fn nested_template(sheet: &mut Worksheet) {
    sheet.write_string(0, 0, "{{title}}").unwrap();
    sheet.write_string(1, 0, "{{#outer}}").unwrap();
    sheet.write_string(2, 0, "{{#inner}}{{inner.x}}{{/inner}}").unwrap();
    sheet.write_string(3, 0, "{{/outer}}").unwrap();
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/></Relationships>"#;

const CALC_CHAIN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="B3" i="1"/></calcChain>"#;

/// A hand-written package around one worksheet body (the XML inside
/// `<worksheet>`), with a calculation chain. `date1904` sets the workbook
/// date system.
pub fn raw_xlsx(sheet_body: &str, date1904: bool) -> Vec<u8> {
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr{}/><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets><calcPr calcId="191029"/></workbook>"#,
        if date1904 { r#" date1904="1""# } else { "" }
    );
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}</worksheet>"#,
        sheet_body
    );

    let parts: [(&str, &str); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", &sheet),
        ("xl/calcChain.xml", CALC_CHAIN),
    ];

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A hand-written package with one worksheet per `(name, body)` pair and
/// the given `<definedName>` elements
pub fn raw_xlsx_sheets(sheets: &[(&str, &str)], defined_names: &str) -> Vec<u8> {
    let mut overrides = String::new();
    let mut rels = String::new();
    let mut entries = String::new();
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
        entries.push_str(&format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, name, n, n));
    }

    let mut parts = vec![
        (
            "[Content_Types].xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{}</Types>"#,
                overrides
            ),
        ),
        ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
        (
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><sheets>{}</sheets><definedNames>{}</definedNames><calcPr calcId="191029"/></workbook>"#,
                entries, defined_names
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                rels
            ),
        ),
    ];
    for (i, (_, body)) in sheets.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", i + 1),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}</worksheet>"#,
                body
            ),
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Inline-string cell
pub fn text_cell(reference: &str, text: &str) -> String {
    format!(
        r#"<c r="{}" s="1" t="inlineStr"><is><t>{}</t></is></c>"#,
        reference, text
    )
}

/// Text of one part of a serialized package
pub fn part_text(bytes: &[u8], name: &str) -> Option<String> {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    Some(text)
}
