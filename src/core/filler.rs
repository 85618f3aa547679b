use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::placeholder::{CellTemplate, Segment};
use super::row_group::{find_groups, validate_group, RowGroup};
use super::value::{display, lookup, to_cell_value, Scope};
use crate::error::{XlFillError, XlFillResult};
use crate::excel::{copy_formula, Cell, CellRange, CellRef, CellValue, RowEdit, Workbook, MAX_ROWS};
use crate::templates::{TemplateStore, XLSX_CONTENT_TYPE};

/// Per-request fill options
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    /// Fields always written as text, even when the value looks like a
    /// number or a date
    pub text_fields: HashSet<String>,
}

impl FillOptions {
    pub fn with_text_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text_fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Non-fatal problem found while filling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillWarning {
    /// The payload has no value for a placeholder
    MissingField {
        field: String,
        sheet: String,
        cell: String,
    },
    /// An object or list was found where a single value was expected
    NonScalarValue {
        field: String,
        sheet: String,
        cell: String,
    },
}

impl FillWarning {
    pub fn field(&self) -> &str {
        match self {
            FillWarning::MissingField { field, .. } | FillWarning::NonScalarValue { field, .. } => {
                field
            }
        }
    }
}

impl fmt::Display for FillWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillWarning::MissingField { field, sheet, cell } => {
                write!(f, "missing field '{}' ({}!{})", field, sheet, cell)
            }
            FillWarning::NonScalarValue { field, sheet, cell } => {
                write!(f, "field '{}' is not a single value ({}!{})", field, sheet, cell)
            }
        }
    }
}

/// A filled workbook and the warnings raised while filling it
#[derive(Debug)]
pub struct FillOutcome {
    pub workbook: Workbook,
    pub warnings: Vec<FillWarning>,
}

/// Warnings, one per field and kind
#[derive(Default)]
struct Warnings {
    seen: HashSet<(bool, String)>,
    list: Vec<FillWarning>,
}

impl Warnings {
    fn push(&mut self, warning: FillWarning) {
        let key = (
            matches!(warning, FillWarning::MissingField { .. }),
            warning.field().to_string(),
        );
        if self.seen.insert(key) {
            self.list.push(warning);
        }
    }
}

struct FillContext<'a> {
    options: &'a FillOptions,
    shared_strings: Vec<String>,
    date1904: bool,
    warnings: Warnings,
}

/// Fill `workbook` with `data`.
///
/// Every sheet's row groups are located and validated before the first cell
/// is changed, so an unsupported template fails without partial output.
pub fn fill(mut workbook: Workbook, data: &Value, options: &FillOptions) -> XlFillResult<FillOutcome> {
    if !data.is_object() {
        return Err(XlFillError::Validation(
            "report data must be a JSON object".to_string(),
        ));
    }

    // Step 1: detect and validate every row group
    let shared_strings = workbook.shared_strings().to_vec();
    let mut plans: Vec<(usize, Vec<RowGroup>)> = Vec::new();
    for (index, sheet) in workbook.sheets().iter().enumerate() {
        let groups = find_groups(sheet, &shared_strings)?;
        let mut growth: i64 = 0;
        for group in &groups {
            validate_group(sheet, group)?;
            let copies = group_items(data, group).map_or(0, |items| items.len());
            growth += (copies as i64 - 1) * i64::from(group.height());
        }
        if i64::from(sheet.max_row()) + growth > i64::from(MAX_ROWS) {
            return Err(XlFillError::Validation(format!(
                "sheet '{}' would grow beyond {} rows",
                sheet.name, MAX_ROWS
            )));
        }
        plans.push((index, groups));
    }

    let mut ctx = FillContext {
        options,
        shared_strings,
        date1904: workbook.is_date1904(),
        warnings: Warnings::default(),
    };
    let scope = Scope::root(data);

    for (index, groups) in plans {
        // Step 2: scalar placeholders outside row groups
        if let Some(sheet) = workbook.sheet_mut(index) {
            let name = sheet.name.clone();
            for row in sheet.rows.iter_mut() {
                if groups.iter().any(|g| g.contains(row.index)) {
                    continue;
                }
                for cell in row.cells.iter_mut() {
                    let at = CellRef::new(row.index, cell.col);
                    substitute(cell, at, &name, &scope, &mut ctx);
                }
            }
        }

        // Step 3: expand groups bottom-up so earlier row numbers stay valid
        for group in groups.iter().rev() {
            expand_group(&mut workbook, index, group, data, &mut ctx)?;
        }
    }

    Ok(FillOutcome {
        workbook,
        warnings: ctx.warnings.list,
    })
}

/// Serialize a filled workbook to package bytes
pub fn serialize(workbook: &Workbook) -> XlFillResult<Vec<u8>> {
    workbook.to_bytes()
}

/// Elements of the group field; `None` when the payload lacks it
fn group_items<'a>(data: &'a Value, group: &RowGroup) -> Option<Vec<&'a Value>> {
    match lookup(data, &group.name)? {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Null => Some(Vec::new()),
        other => Some(vec![other]),
    }
}

fn expand_group(
    workbook: &mut Workbook,
    index: usize,
    group: &RowGroup,
    data: &Value,
    ctx: &mut FillContext<'_>,
) -> XlFillResult<()> {
    let Some(sheet_name) = workbook.sheets().get(index).map(|s| s.name.clone()) else {
        return Ok(());
    };

    let items = match group_items(data, group) {
        Some(items) => items,
        None => {
            ctx.warnings.push(FillWarning::MissingField {
                field: group.name.clone(),
                sheet: sheet_name.clone(),
                cell: format!("row {}", group.first),
            });
            Vec::new()
        }
    };
    let copies = u32::try_from(items.len())
        .map_err(|_| XlFillError::Validation(format!("list '{}' is too long", group.name)))?;
    let edit = RowEdit::new(group.first, group.last, copies);

    let (template_rows, group_merges) = match workbook.sheet_mut(index) {
        Some(sheet) => {
            let rows = sheet.take_rows(group.first, group.last);
            let (inside, outside): (Vec<CellRange>, Vec<CellRange>) = std::mem::take(&mut sheet.merges)
                .into_iter()
                .partition(|m| m.contains_rows(group.first, group.last));
            sheet.merges = outside;
            (rows, inside)
        }
        None => return Ok(()),
    };

    workbook.apply_row_edit(index, &edit)?;

    let mut new_rows = Vec::with_capacity(template_rows.len() * items.len());
    let mut new_merges = Vec::with_capacity(group_merges.len() * items.len());
    for (copy, item) in items.iter().enumerate() {
        let offset = copy as u32 * edit.height();
        let scope = Scope::element(data, &group.name, item);
        for template in &template_rows {
            let mut row = template.clone();
            row.index += offset;
            for cell in row.cells.iter_mut() {
                if let Some(formula) = cell.formula.as_mut() {
                    if !formula.text.is_empty() {
                        formula.text = copy_formula(&formula.text, &sheet_name, &edit, offset);
                    }
                    if let Some(slot) = formula.attrs.iter_mut().find(|(k, _)| k == "ref") {
                        if let Some(range) = CellRange::parse(&slot.1) {
                            slot.1 = range.offset_rows(offset).to_string();
                        }
                    }
                }
                let at = CellRef::new(row.index, cell.col);
                substitute(cell, at, &sheet_name, &scope, ctx);
            }
            new_rows.push(row);
        }
        new_merges.extend(group_merges.iter().map(|m| m.offset_rows(offset)));
    }

    if let Some(sheet) = workbook.sheet_mut(index) {
        sheet.insert_rows(new_rows);
        sheet.merges.extend(new_merges);
    }
    workbook.mark_recalc();
    Ok(())
}

/// Replace the placeholders of one cell. Only the value changes; the style
/// index stays as it is.
fn substitute(cell: &mut Cell, at: CellRef, sheet: &str, scope: &Scope<'_>, ctx: &mut FillContext<'_>) {
    let Some(template) = cell.text(&ctx.shared_strings).and_then(CellTemplate::parse) else {
        return;
    };

    if template.is_marker_only() {
        cell.set_value(CellValue::Empty);
        return;
    }

    let warn_missing = |ctx: &mut FillContext<'_>, field: &str| {
        ctx.warnings.push(FillWarning::MissingField {
            field: field.to_string(),
            sheet: sheet.to_string(),
            cell: at.to_string(),
        })
    };
    let warn_non_scalar = |ctx: &mut FillContext<'_>, field: &str| {
        ctx.warnings.push(FillWarning::NonScalarValue {
            field: field.to_string(),
            sheet: sheet.to_string(),
            cell: at.to_string(),
        })
    };

    if let Some(field) = template.whole_field() {
        let value = match scope.resolve(field) {
            None => {
                warn_missing(ctx, field);
                CellValue::Text(String::new())
            }
            Some(found) => {
                let as_text = ctx.options.text_fields.contains(field);
                match to_cell_value(found, as_text, ctx.date1904) {
                    Some(value) => value,
                    None => {
                        warn_non_scalar(ctx, field);
                        CellValue::Text(String::new())
                    }
                }
            }
        };
        cell.set_value(value);
        return;
    }

    let mut text = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Text(literal) => text.push_str(literal),
            Segment::Field(field) => match scope.resolve(field) {
                None => warn_missing(ctx, field),
                Some(found) => match display(found) {
                    Some(shown) => text.push_str(&shown),
                    None => warn_non_scalar(ctx, field),
                },
            },
        }
    }
    cell.set_value(CellValue::Text(text));
}

/// A generated report ready to be sent or saved
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub template: String,
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub warnings: Vec<FillWarning>,
}

impl GeneratedReport {
    /// Fields reported missing, in first-seen order
    pub fn missing_fields(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter(|w| matches!(w, FillWarning::MissingField { .. }))
            .map(FillWarning::field)
            .collect()
    }
}

/// Template lookup, fill and serialization in one call
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    store: TemplateStore,
}

impl TemplateEngine {
    pub fn new(store: TemplateStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn generate(
        &self,
        template_name: &str,
        data: &Value,
        options: &FillOptions,
    ) -> XlFillResult<GeneratedReport> {
        let template = self.store.resolve(template_name)?;
        let workbook = template.load()?;
        let outcome = fill(workbook, data, options)?;
        let bytes = serialize(&outcome.workbook)?;

        Ok(GeneratedReport {
            filename: report_filename(&template.name),
            template: template.name,
            content_type: XLSX_CONTENT_TYPE,
            bytes,
            warnings: outcome.warnings,
        })
    }
}

/// `<stem>_report_<YYYYmmdd_HHMMSS>.xlsx`
pub fn report_filename(template_name: &str) -> String {
    let stem = template_name
        .strip_suffix(".xlsx")
        .or_else(|| template_name.strip_suffix(".XLSX"))
        .unwrap_or(template_name);
    format!(
        "{}_report_{}.xlsx",
        stem,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}
