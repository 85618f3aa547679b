//! Template inspection - header columns, tables, placeholders and a sample
//! payload for the catalogue

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::Workbook;
use crate::core::{scan, RowGroupInfo, TemplateScan};
use crate::error::{XlFillError, XlFillResult};
use crate::templates::Template;

/// Header cells read from row 1 when the template has no Excel table
const MAX_HEADER_COLUMNS: u32 = 20;

/// Catalogue entry for one template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    /// Template identifier (file stem)
    pub name: String,
    pub display_name: String,
    pub filename: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub description: String,
    pub sheets: Vec<String>,
    pub tables: Vec<String>,
    pub columns: Vec<String>,
    pub placeholders: Vec<String>,
    pub row_groups: Vec<RowGroupInfo>,
    pub sample_data: Value,
}

/// Header layout found by reading the template with calamine
#[derive(Debug, Default)]
struct Layout {
    sheets: Vec<String>,
    tables: Vec<String>,
    first_sheet_tables: usize,
    columns: Vec<String>,
}

/// Inspect a template. Analysis problems are logged and leave the
/// affected fields empty, so one odd file never hides the catalogue.
pub fn inspect(template: &Template) -> TemplateInfo {
    let layout = read_layout(&template.path, &template.name).unwrap_or_else(|e| {
        tracing::warn!("Could not analyze layout of {}: {}", template.name, e);
        Layout::default()
    });

    let template_scan = Workbook::open(&template.path)
        .and_then(|workbook| scan(&workbook))
        .unwrap_or_else(|e| {
            tracing::warn!("Could not scan placeholders of {}: {}", template.name, e);
            TemplateScan::default()
        });

    let sample_data = sample_payload(&template_scan, &layout.columns);
    let stem = template.stem().to_string();

    TemplateInfo {
        display_name: display_name(&stem),
        name: stem,
        filename: template.name.clone(),
        size_bytes: template.size_bytes,
        last_modified: template.last_modified,
        description: format!("Excel template with {} table(s)", layout.first_sheet_tables),
        sheets: layout.sheets,
        tables: layout.tables,
        columns: layout.columns,
        placeholders: template_scan.placeholders,
        row_groups: template_scan.row_groups,
        sample_data,
    }
}

fn read_layout(path: &Path, name: &str) -> XlFillResult<Layout> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| XlFillError::corrupt(name, e))?;
    workbook
        .load_tables()
        .map_err(|e| XlFillError::corrupt(name, e))?;

    let sheets = workbook.sheet_names();
    let tables: Vec<String> = workbook.table_names().into_iter().cloned().collect();
    let Some(first_sheet) = sheets.first().cloned() else {
        return Ok(Layout {
            sheets,
            tables,
            ..Layout::default()
        });
    };

    let first_sheet_tables: Vec<String> = workbook
        .table_names_in_sheet(&first_sheet)
        .into_iter()
        .cloned()
        .collect();

    let mut columns = Vec::new();
    if let Some(table_name) = first_sheet_tables.first() {
        // Header of the first table on the first sheet
        let table = workbook
            .table_by_name(table_name)
            .map_err(|e| XlFillError::corrupt(name, e))?;
        columns.extend(
            table
                .columns()
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        );
    } else {
        // Otherwise the leading non-empty cells of row 1
        let range = workbook
            .worksheet_range(&first_sheet)
            .map_err(|e| XlFillError::corrupt(name, e))?;
        for col in 0..MAX_HEADER_COLUMNS {
            match range.get_value((0, col)) {
                None | Some(Data::Empty) => break,
                Some(value) => {
                    let header = value.to_string().trim().to_string();
                    if header.is_empty() {
                        break;
                    }
                    columns.push(header);
                }
            }
        }
    }

    Ok(Layout {
        sheets,
        tables,
        first_sheet_tables: first_sheet_tables.len(),
        columns,
    })
}

/// `monthly_cost-report` → `Monthly Cost Report`
pub fn display_name(stem: &str) -> String {
    stem.replace(['_', '-'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Sample value chosen from a column or field name
pub fn sample_value(name: &str) -> Value {
    let lower = name.to_lowercase();
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if lower.contains("id") {
        json!("RULE001")
    } else if has_any(&["group", "center", "category", "type"]) {
        json!("Sample Group")
    } else if has_any(&["amount", "rate", "cost", "price", "total"]) {
        json!(1000.5)
    } else if has_any(&["diff", "variance", "delta"]) {
        json!(0.0)
    } else {
        json!("Sample Value")
    }
}

/// Starting payload for a template: one sample per placeholder and a
/// one-element list per row group, or the header columns when the template
/// has no placeholders
fn sample_payload(template_scan: &TemplateScan, columns: &[String]) -> Value {
    let mut payload = Map::new();

    if template_scan.placeholders.is_empty() && template_scan.row_groups.is_empty() {
        for column in columns {
            payload.insert(column.clone(), sample_value(column));
        }
        return Value::Object(payload);
    }

    for field in &template_scan.placeholders {
        payload.insert(field.clone(), sample_value(field));
    }
    for group in &template_scan.row_groups {
        let prefix = format!("{}.", group.name);
        let mut element = Map::new();
        let mut scalar = None;
        for field in &group.fields {
            if field == "." {
                scalar = Some(sample_value(&group.name));
                continue;
            }
            let local = field.strip_prefix(&prefix).unwrap_or(field);
            element.insert(local.to_string(), sample_value(local));
        }
        let item = match scalar {
            Some(value) if element.is_empty() => value,
            _ => Value::Object(element),
        };
        payload.insert(group.name.clone(), Value::Array(vec![item]));
    }
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("monthly_cost-report"), "Monthly Cost Report");
        assert_eq!(display_name("template-1"), "Template 1");
        assert_eq!(display_name("AB_CR_summary"), "Ab Cr Summary");
    }

    #[test]
    fn test_sample_value_heuristics() {
        assert_eq!(sample_value("Rule ID"), json!("RULE001"));
        assert_eq!(sample_value("Cost Center"), json!("Sample Group"));
        assert_eq!(sample_value("Total Amount"), json!(1000.5));
        assert_eq!(sample_value("Variance"), json!(0.0));
        assert_eq!(sample_value("Notes"), json!("Sample Value"));
    }

    #[test]
    fn test_sample_payload_from_scan() {
        let template_scan = TemplateScan {
            placeholders: vec!["client".into(), "total_amount".into()],
            row_groups: vec![RowGroupInfo {
                name: "lines".into(),
                sheet: "Invoice".into(),
                first_row: 5,
                last_row: 5,
                fields: vec!["lines.price".into(), "description".into()],
            }],
        };
        let payload = sample_payload(&template_scan, &[]);
        assert_eq!(
            payload,
            json!({
                "client": "Sample Value",
                "total_amount": 1000.5,
                "lines": [{"price": 1000.5, "description": "Sample Value"}]
            })
        );
    }

    #[test]
    fn test_sample_payload_falls_back_to_columns() {
        let payload = sample_payload(&TemplateScan::default(), &["Rule ID".into(), "Amount".into()]);
        assert_eq!(payload, json!({"Rule ID": "RULE001", "Amount": 1000.5}));
    }
}
