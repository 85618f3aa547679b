//! Row group detection and validation
//!
//! A row group spans from the row holding `{{#name}}` to the row holding the
//! matching `{{/name}}`. Groups are detected and checked on every sheet
//! before the workbook is touched, so an unsupported layout never leaves a
//! half-filled result behind.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::placeholder::{CellTemplate, Marker};
use crate::error::{XlFillError, XlFillResult};
use crate::excel::{CellRef, Workbook, Worksheet};

/// Rows `first..=last` repeated once per element of the list field `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowGroup {
    pub name: String,
    pub first: u32,
    pub last: u32,
}

impl RowGroup {
    pub fn height(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn contains(&self, row: u32) -> bool {
        row >= self.first && row <= self.last
    }
}

/// Placeholders and row groups found in a template
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateScan {
    /// Fields used outside any row group
    pub placeholders: Vec<String>,
    pub row_groups: Vec<RowGroupInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowGroupInfo {
    pub name: String,
    pub sheet: String,
    pub first_row: u32,
    pub last_row: u32,
    /// Fields used inside the group
    pub fields: Vec<String>,
}

/// Locate the row groups of one sheet, in row order
pub fn find_groups(sheet: &Worksheet, shared_strings: &[String]) -> XlFillResult<Vec<RowGroup>> {
    let mut markers: Vec<(CellRef, Marker)> = Vec::new();
    for row in &sheet.rows {
        for cell in &row.cells {
            let Some(template) = cell.text(shared_strings).and_then(CellTemplate::parse) else {
                continue;
            };
            for marker in template.markers {
                markers.push((CellRef::new(row.index, cell.col), marker));
            }
        }
    }

    let mut groups: Vec<RowGroup> = Vec::new();
    let mut matched_closes = HashSet::new();

    for (i, (at, marker)) in markers.iter().enumerate() {
        match marker {
            Marker::Open(name) => {
                let close = markers[i + 1..]
                    .iter()
                    .position(|(_, m)| matches!(m, Marker::Close(n) if n == name))
                    .map(|p| i + 1 + p);
                let last = match close {
                    Some(c) => {
                        if let Some((inner_at, Marker::Open(inner))) = markers[i + 1..c]
                            .iter()
                            .find(|(_, m)| matches!(m, Marker::Open(_)))
                        {
                            return Err(XlFillError::unsupported(
                                &sheet.name,
                                format!(
                                    "nested row group '{}' at {} inside '{}' opened at {}",
                                    inner, inner_at, name, at
                                ),
                            ));
                        }
                        matched_closes.insert(c);
                        markers[c].0.row
                    }
                    None => at.row,
                };
                groups.push(RowGroup {
                    name: name.clone(),
                    first: at.row,
                    last,
                });
            }
            Marker::Close(name) => {
                if matched_closes.contains(&i) {
                    continue;
                }
                let open = groups.iter().rev().find(|g| g.first <= at.row);
                let reason = match open {
                    Some(g) if g.name != *name => format!(
                        "close marker '{{{{/{}}}}}' at {} does not match open group '{}'",
                        name, at, g.name
                    ),
                    _ => format!("close marker '{{{{/{}}}}}' at {} has no open marker", name, at),
                };
                return Err(XlFillError::unsupported(&sheet.name, reason));
            }
        }
    }

    groups.sort_by_key(|g| g.first);
    for pair in groups.windows(2) {
        if pair[1].first <= pair[0].last {
            return Err(XlFillError::unsupported(
                &sheet.name,
                format!(
                    "row groups '{}' (rows {}-{}) and '{}' (rows {}-{}) overlap",
                    pair[0].name, pair[0].first, pair[0].last, pair[1].name, pair[1].first, pair[1].last
                ),
            ));
        }
    }
    Ok(groups)
}

/// Reject layouts a group cannot be repeated over: merged ranges crossing
/// the group boundary, shared formulas touching the group, and array
/// formulas that only partly cover it
pub fn validate_group(sheet: &Worksheet, group: &RowGroup) -> XlFillResult<()> {
    let describe = |what: String| {
        XlFillError::unsupported(
            &sheet.name,
            format!(
                "{} crosses row group '{}' (rows {}-{})",
                what, group.name, group.first, group.last
            ),
        )
    };

    for merge in &sheet.merges {
        if merge.intersects_rows(group.first, group.last)
            && !merge.contains_rows(group.first, group.last)
        {
            return Err(describe(format!("merged range {}", merge)));
        }
    }

    for (at, formula, range) in sheet.formula_ranges() {
        let in_group = group.contains(at.row);
        let touches = range.is_some_and(|r| r.intersects_rows(group.first, group.last));
        if formula.attr("t") == Some("shared") && (in_group || touches) {
            return Err(describe(format!("shared formula at {}", at)));
        }
        if let Some(range) = range {
            if touches && !range.contains_rows(group.first, group.last) {
                return Err(describe(format!("array formula range {}", range)));
            }
        }
    }
    Ok(())
}

/// Collect placeholders and row groups of every sheet, validating groups
pub fn scan(workbook: &Workbook) -> XlFillResult<TemplateScan> {
    let shared = workbook.shared_strings();
    let mut placeholders = BTreeSet::new();
    let mut row_groups = Vec::new();

    for sheet in workbook.sheets() {
        let groups = find_groups(sheet, shared)?;
        for group in &groups {
            validate_group(sheet, group)?;
        }
        let mut group_fields: Vec<BTreeSet<String>> = vec![BTreeSet::new(); groups.len()];

        for row in &sheet.rows {
            let owner = groups.iter().position(|g| g.contains(row.index));
            for cell in &row.cells {
                let Some(template) = cell.text(shared).and_then(CellTemplate::parse) else {
                    continue;
                };
                for field in template.fields() {
                    match owner {
                        Some(g) => {
                            group_fields[g].insert(field.to_string());
                        }
                        None => {
                            placeholders.insert(field.to_string());
                        }
                    }
                }
            }
        }

        for (group, fields) in groups.into_iter().zip(group_fields) {
            row_groups.push(RowGroupInfo {
                name: group.name,
                sheet: sheet.name.clone(),
                first_row: group.first,
                last_row: group.last,
                fields: fields.into_iter().collect(),
            });
        }
    }

    Ok(TemplateScan {
        placeholders: placeholders.into_iter().collect(),
        row_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &str) -> Worksheet {
        let xml = format!(
            r#"<worksheet><sheetData>{}</sheetData></worksheet>"#,
            rows
        );
        Worksheet::parse("Data", "xl/worksheets/sheet1.xml", xml.as_bytes()).unwrap()
    }

    fn text(cell: &str, value: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, cell, value)
    }

    fn row(index: u32, cells: &[String]) -> String {
        format!(r#"<row r="{}">{}</row>"#, index, cells.concat())
    }

    #[test]
    fn test_find_single_and_multi_row_groups() {
        let s = sheet(&[
            row(2, &[text("A2", "{{#items}}{{name}}"), text("B2", "{{qty}}")]),
            row(5, &[text("A5", "{{#lines}}{{desc}}")]),
            row(6, &[text("A6", "{{amount}}{{/lines}}")]),
        ]
        .concat());
        let groups = find_groups(&s, &[]).unwrap();
        assert_eq!(
            groups,
            vec![
                RowGroup { name: "items".into(), first: 2, last: 2 },
                RowGroup { name: "lines".into(), first: 5, last: 6 },
            ]
        );
    }

    #[test]
    fn test_nested_groups_are_rejected() {
        let s = sheet(&[
            row(2, &[text("A2", "{{#outer}}")]),
            row(3, &[text("A3", "{{#inner}}{{/inner}}")]),
            row(4, &[text("A4", "{{/outer}}")]),
        ]
        .concat());
        let err = find_groups(&s, &[]).unwrap_err();
        assert!(matches!(err, XlFillError::UnsupportedTemplateStructure { .. }));
        assert!(err.to_string().contains("nested row group 'inner'"));
    }

    #[test]
    fn test_unmatched_close_is_rejected() {
        let s = sheet(&row(3, &[text("A3", "{{/items}}")]));
        let err = find_groups(&s, &[]).unwrap_err();
        assert!(err.to_string().contains("has no open marker"));
    }

    #[test]
    fn test_merge_across_group_boundary_is_rejected() {
        let xml = format!(
            r#"<worksheet><sheetData>{}</sheetData><mergeCells count="1"><mergeCell ref="A2:A3"/></mergeCells></worksheet>"#,
            row(2, &[text("A2", "{{#items}}{{name}}")])
        );
        let s = Worksheet::parse("Data", "p", xml.as_bytes()).unwrap();
        let groups = find_groups(&s, &[]).unwrap();
        let err = validate_group(&s, &groups[0]).unwrap_err();
        assert!(err.to_string().contains("merged range A2:A3"));
    }

    #[test]
    fn test_shared_formula_in_group_is_rejected() {
        let xml = format!(
            r#"<worksheet><sheetData>{}</sheetData></worksheet>"#,
            row(
                2,
                &[
                    text("A2", "{{#items}}{{qty}}"),
                    r#"<c r="B2"><f t="shared" ref="B2:B4" si="0">A2*2</f></c>"#.to_string(),
                ]
            )
        );
        let s = Worksheet::parse("Data", "p", xml.as_bytes()).unwrap();
        let groups = find_groups(&s, &[]).unwrap();
        let err = validate_group(&s, &groups[0]).unwrap_err();
        assert!(err.to_string().contains("shared formula at B2"));
    }
}
