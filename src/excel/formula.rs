//! Row reference rewriting for cell, conditional-format, validation,
//! defined-name and chart formulas
//!
//! A row edit applies to one sheet. References qualified with that sheet's
//! name (`Data!B2`, `'My Data'!B2`) always follow it; unqualified references
//! follow it only in formulas that live on that sheet. String literals,
//! structured references (`[...]`), external and 3-D references and function
//! names are copied through unchanged.

use super::reference::{column_index_to_letter, column_letter_to_number, RowEdit, MAX_ROWS};

/// Sheet prefix of a reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    /// `Data!` or `'My Data'!`, with quote escapes removed
    Sheet(String),
    /// Another workbook (`[1]Data!`) or a sheet span (`Jan:Dec!`)
    External,
}

impl Qualifier {
    /// Sheet names compare case-insensitively
    pub fn is_sheet(&self, name: &str) -> bool {
        match self {
            Qualifier::Sheet(sheet) => sheet.to_lowercase() == name.to_lowercase(),
            Qualifier::External => false,
        }
    }
}

/// The sheet a row edit was applied to, as seen from one formula
#[derive(Debug, Clone, Copy)]
pub struct EditTarget<'a> {
    pub sheet: &'a str,
    /// The formula lives on `sheet`, so unqualified references point into it
    pub local: bool,
}

impl<'a> EditTarget<'a> {
    pub fn local(sheet: &'a str) -> Self {
        Self { sheet, local: true }
    }

    pub fn remote(sheet: &'a str) -> Self {
        Self { sheet, local: false }
    }

    fn matches(&self, qualifier: Option<&Qualifier>) -> bool {
        match qualifier {
            None => self.local,
            Some(q) => q.is_sheet(self.sheet),
        }
    }
}

/// One end of an A1 reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPoint {
    pub col: u32,
    pub col_absolute: bool,
    pub row: u32,
    pub row_absolute: bool,
}

impl RefPoint {
    fn render(&self, out: &mut String) {
        if self.col_absolute {
            out.push('$');
        }
        out.push_str(&column_index_to_letter(self.col - 1));
        if self.row_absolute {
            out.push('$');
        }
        out.push_str(&self.row.to_string());
    }

    fn with_row(self, row: u32) -> Self {
        Self { row, ..self }
    }
}

/// A cell (`B5`) or area (`B5:D9`) reference found in a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaRef {
    pub start: RefPoint,
    pub end: Option<RefPoint>,
}

/// Rewrite every A1 reference in `formula`.
///
/// `map` receives the reference's sheet qualifier (`None` when unqualified)
/// and returns the replacement, or `None` when the reference no longer
/// exists (rendered as `#REF!`). Unchanged references keep their original
/// text.
pub fn rewrite_references<F>(formula: &str, mut map: F) -> String
where
    F: FnMut(Option<&Qualifier>, AreaRef) -> Option<AreaRef>,
{
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len());
    let mut pending: Option<Qualifier> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                pending = None;
                i = copy_quoted(&chars, i, '"', &mut out);
            }
            '\'' => {
                let start = i;
                i = copy_quoted(&chars, i, '\'', &mut out);
                pending = None;
                if chars.get(i) == Some(&'!') && i >= start + 2 {
                    let inner: String = chars[start + 1..i - 1].iter().collect();
                    let inner = inner.replace("''", "'");
                    pending = Some(if inner.starts_with('[') || inner.contains(':') {
                        Qualifier::External
                    } else {
                        Qualifier::Sheet(inner)
                    });
                }
            }
            '[' => {
                pending = None;
                let mut depth = 0;
                while i < chars.len() {
                    let ch = chars[i];
                    out.push(ch);
                    i += 1;
                    if ch == '[' {
                        depth += 1;
                    } else if ch == ']' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
            }
            _ if is_name_char(c) => {
                let qualifier = if out.ends_with('!') {
                    Some(pending.take().unwrap_or(Qualifier::External))
                } else {
                    pending = None;
                    None
                };
                let boundary = i == 0 || !is_name_char(chars[i - 1]);
                match (boundary, parse_area(&chars, i)) {
                    (true, Some((area, next))) => {
                        match map(qualifier.as_ref(), area) {
                            Some(mapped) if mapped == area => {
                                out.extend(&chars[i..next]);
                            }
                            Some(mapped) => render_area(&mapped, &mut out),
                            None => out.push_str("#REF!"),
                        }
                        i = next;
                    }
                    _ => {
                        // Names, functions, numbers and sheet prefixes
                        let start = i;
                        while i < chars.len() && is_name_char(chars[i]) {
                            out.push(chars[i]);
                            i += 1;
                        }
                        if chars.get(i) == Some(&'!') {
                            let spans = start > 0 && matches!(chars[start - 1], ']' | ':' | '#');
                            pending = Some(if spans {
                                Qualifier::External
                            } else {
                                Qualifier::Sheet(chars[start..i].iter().collect())
                            });
                        }
                    }
                }
            }
            '!' => {
                out.push(c);
                i += 1;
            }
            _ => {
                pending = None;
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Apply a structural row edit made on `target.sheet`: references after the
/// block move, areas that reach into the block follow its new extent
pub fn shift_formula(formula: &str, target: EditTarget<'_>, edit: &RowEdit) -> String {
    rewrite_references(formula, |qualifier, area| {
        if !target.matches(qualifier) {
            return Some(area);
        }
        match area.end {
            None => edit.row(area.start.row).map(|row| AreaRef {
                start: area.start.with_row(row),
                end: None,
            }),
            Some(end) => edit.span(area.start.row, end.row).map(|(first, last)| AreaRef {
                start: area.start.with_row(first),
                end: Some(end.with_row(last)),
            }),
        }
    })
}

/// Rewrite a formula that lives inside a repeated block, for the copy placed
/// `offset` rows below the original.
///
/// References into the block behave like a fill-down (relative rows move by
/// `offset`, absolute rows stay); references outside it follow the edit.
pub fn copy_formula(formula: &str, sheet: &str, edit: &RowEdit, offset: u32) -> String {
    let target = EditTarget::local(sheet);
    let point = |p: RefPoint| -> Option<RefPoint> {
        if p.row >= edit.first && p.row <= edit.last {
            if p.row_absolute {
                Some(p)
            } else {
                Some(p.with_row(p.row + offset))
            }
        } else {
            edit.row(p.row).map(|row| p.with_row(row))
        }
    };
    rewrite_references(formula, |qualifier, area| {
        if !target.matches(qualifier) {
            return Some(area);
        }
        Some(AreaRef {
            start: point(area.start)?,
            end: match area.end {
                Some(end) => Some(point(end)?),
                None => None,
            },
        })
    })
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '$' || c == '\\'
}

fn copy_quoted(chars: &[char], start: usize, quote: char, out: &mut String) -> usize {
    out.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        out.push(chars[i]);
        if chars[i] == quote {
            // Doubled quote is an escaped quote
            if chars.get(i + 1) == Some(&quote) {
                out.push(quote);
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}

fn parse_point(chars: &[char], start: usize) -> Option<(RefPoint, usize)> {
    let mut i = start;
    let col_absolute = chars.get(i) == Some(&'$');
    if col_absolute {
        i += 1;
    }
    let col_start = i;
    while i < chars.len() && chars[i].is_ascii_uppercase() && i - col_start < 3 {
        i += 1;
    }
    let letters: String = chars[col_start..i].iter().collect();
    let col = column_letter_to_number(&letters)?;
    let row_absolute = chars.get(i) == Some(&'$');
    if row_absolute {
        i += 1;
    }
    let row_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i == row_start {
        return None;
    }
    let digits: String = chars[row_start..i].iter().collect();
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row > MAX_ROWS {
        return None;
    }
    Some((
        RefPoint {
            col,
            col_absolute,
            row,
            row_absolute,
        },
        i,
    ))
}

fn parse_area(chars: &[char], start: usize) -> Option<(AreaRef, usize)> {
    let (first, mut i) = parse_point(chars, start)?;
    let mut end = None;
    if chars.get(i) == Some(&':') {
        if let Some((second, next)) = parse_point(chars, i + 1) {
            end = Some(second);
            i = next;
        }
    }
    // `LOG10(`, `A1B`, `Sheet1!` and `R1.5` are not references
    if let Some(&next) = chars.get(i) {
        if is_name_char(next) || next == '(' || next == '!' {
            return None;
        }
    }
    Some((AreaRef { start: first, end }, i))
}

fn render_area(area: &AreaRef, out: &mut String) {
    area.start.render(out);
    if let Some(end) = &area.end {
        out.push(':');
        end.render(out);
    }
}
