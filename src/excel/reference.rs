//! A1-style cell references, ranges, and the row edits applied to them

use std::fmt;

/// Last row index Excel accepts (1-based)
pub const MAX_ROWS: u32 = 1_048_576;
/// Last column index Excel accepts (1-based, XFD)
pub const MAX_COLS: u32 = 16_384;

/// Convert a zero-based column index to an Excel column letter
///
/// Examples:
/// - 0 → A
/// - 25 → Z
/// - 26 → AA
pub fn column_index_to_letter(index: u32) -> String {
    let mut result = String::new();
    let mut idx = index;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Convert an Excel column letter (`A`, `AB`, ...) to a 1-based column number
pub fn column_letter_to_number(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut number: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        number = number * 26 + (c as u32 - 'A' as u32 + 1);
    }
    (number <= MAX_COLS).then_some(number)
}

/// A single cell position, 1-based on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse `B5` or `$B$5`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let bytes = text.as_bytes();
        let mut i = 0;
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let col_start = i;
        while i < bytes.len() && bytes[i].is_ascii_uppercase() {
            i += 1;
        }
        let col = column_letter_to_number(&text[col_start..i])?;
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let digits = &text[i..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let row: u32 = digits.parse().ok()?;
        if row == 0 || row > MAX_ROWS {
            return None;
        }
        Some(Self { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            column_index_to_letter(self.col.saturating_sub(1)),
            self.row
        )
    }
}

/// A rectangular block of cells (`A1:D5`); a single cell has `start == end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        Self { start, end }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.split_once(':') {
            Some((a, b)) => {
                let start = CellRef::parse(a)?;
                let end = CellRef::parse(b)?;
                Some(Self::new(
                    CellRef::new(start.row.min(end.row), start.col.min(end.col)),
                    CellRef::new(start.row.max(end.row), start.col.max(end.col)),
                ))
            }
            None => {
                let cell = CellRef::parse(text)?;
                Some(Self::new(cell, cell))
            }
        }
    }

    /// Parse a space separated reference list (`sqref`)
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.split_whitespace().filter_map(Self::parse).collect()
    }

    pub fn contains_rows(&self, first: u32, last: u32) -> bool {
        self.start.row >= first && self.end.row <= last
    }

    pub fn intersects_rows(&self, first: u32, last: u32) -> bool {
        self.start.row <= last && self.end.row >= first
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// Same columns, rows moved by `offset`
    pub fn offset_rows(&self, offset: u32) -> Self {
        Self::new(
            CellRef::new(self.start.row + offset, self.start.col),
            CellRef::new(self.end.row + offset, self.end.col),
        )
    }

    /// Apply a structural row edit; `None` when the range was deleted
    pub fn apply(&self, edit: &RowEdit) -> Option<Self> {
        let (first, last) = edit.span(self.start.row, self.end.row)?;
        Some(Self::new(
            CellRef::new(first, self.start.col),
            CellRef::new(last, self.end.col),
        ))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Replacement of rows `first..=last` by `copies` consecutive copies of them.
///
/// `copies == 1` leaves the sheet unchanged, `copies == 0` deletes the rows.
/// References after the block move by [`RowEdit::delta`]; ranges that reach
/// into the block grow (or shrink) with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEdit {
    pub first: u32,
    pub last: u32,
    pub copies: u32,
}

impl RowEdit {
    pub fn new(first: u32, last: u32, copies: u32) -> Self {
        Self {
            first,
            last,
            copies,
        }
    }

    pub fn height(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn delta(&self) -> i64 {
        (i64::from(self.copies) - 1) * i64::from(self.height())
    }

    /// Row of a single reference after the edit; `None` when it was deleted
    pub fn row(&self, row: u32) -> Option<u32> {
        if row < self.first {
            Some(row)
        } else if row > self.last {
            clamp_row(i64::from(row) + self.delta())
        } else if self.copies == 0 {
            None
        } else {
            Some(row)
        }
    }

    /// Rows of a range after the edit; `None` when nothing of it survives
    pub fn span(&self, start: u32, end: u32) -> Option<(u32, u32)> {
        let delta = self.delta();
        if self.copies == 0 {
            let height = i64::from(self.height());
            let new_start = if start < self.first {
                i64::from(start)
            } else if start > self.last {
                i64::from(start) - height
            } else {
                i64::from(self.first)
            };
            let new_end = if end < self.first {
                i64::from(end)
            } else if end > self.last {
                i64::from(end) - height
            } else {
                i64::from(self.first) - 1
            };
            if new_end < new_start {
                return None;
            }
            return Some((clamp_row(new_start)?, clamp_row(new_end)?));
        }

        let new_start = if start > self.last {
            i64::from(start) + delta
        } else {
            i64::from(start)
        };
        let new_end = if end >= self.first {
            i64::from(end) + delta
        } else {
            i64::from(end)
        };
        Some((clamp_row(new_start)?, clamp_row(new_end)?))
    }
}

fn clamp_row(row: i64) -> Option<u32> {
    if row < 1 {
        None
    } else {
        Some(u32::try_from(row).unwrap_or(u32::MAX))
    }
}
