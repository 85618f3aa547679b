//! Worksheet part model
//!
//! `sheetData` is parsed into rows and cells; merged ranges are lifted out so
//! they can be moved and duplicated. Every other element is kept as raw XML
//! events and written back unchanged unless a row edit touches one of its
//! references, including the x14 conditional formatting and data validation
//! kept in `extLst`.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::formula::{shift_formula, EditTarget};
use super::reference::{CellRange, CellRef, RowEdit, MAX_COLS, MAX_ROWS};
use crate::error::{XlFillError, XlFillResult};

/// A value written into a cell by the fill engine
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

/// `<f>` element of a cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormula {
    pub text: String,
    pub attrs: Vec<(String, String)>,
}

impl CellFormula {
    pub fn attr(&self, key: &str) -> Option<&str> {
        find_attr(&self.attrs, key)
    }
}

/// One `<c>` element. Attributes other than `r` are kept in document order so
/// the style index (`s`) survives untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub col: u32,
    attrs: Vec<(String, String)>,
    pub formula: Option<CellFormula>,
    pub value: Option<String>,
    pub inline_text: Option<String>,
}

impl Cell {
    pub fn new(col: u32) -> Self {
        Self {
            col,
            attrs: Vec::new(),
            formula: None,
            value: None,
            inline_text: None,
        }
    }

    pub fn style(&self) -> Option<&str> {
        find_attr(&self.attrs, "s")
    }

    pub fn cell_type(&self) -> Option<&str> {
        find_attr(&self.attrs, "t")
    }

    /// Text of a string cell; formula results are never reported
    pub fn text<'a>(&'a self, shared_strings: &'a [String]) -> Option<&'a str> {
        if self.formula.is_some() {
            return None;
        }
        match self.cell_type() {
            Some("s") => {
                let index: usize = self.value.as_deref()?.trim().parse().ok()?;
                shared_strings.get(index).map(String::as_str)
            }
            Some("inlineStr") => self.inline_text.as_deref(),
            _ => None,
        }
    }

    /// Typed view of the stored value
    pub fn read_value(&self, shared_strings: &[String]) -> CellValue {
        match self.cell_type() {
            Some("s") | Some("inlineStr") => self
                .text(shared_strings)
                .map(|t| CellValue::Text(t.to_string()))
                .unwrap_or(CellValue::Empty),
            Some("str") | Some("e") => self
                .value
                .clone()
                .map(CellValue::Text)
                .unwrap_or(CellValue::Empty),
            Some("b") => CellValue::Bool(self.value.as_deref() == Some("1")),
            _ => match self.value.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => raw
                    .parse::<f64>()
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
                _ => CellValue::Empty,
            },
        }
    }

    /// Replace the value, keeping the style and every other attribute
    pub fn set_value(&mut self, value: CellValue) {
        self.formula = None;
        self.inline_text = None;
        self.value = None;
        match value {
            CellValue::Empty => self.remove_attr("t"),
            CellValue::Text(text) => {
                self.set_attr("t", "inlineStr");
                self.inline_text = Some(text);
            }
            CellValue::Number(n) => {
                self.remove_attr("t");
                self.value = Some(format_number(n));
            }
            CellValue::Bool(b) => {
                self.set_attr("t", "b");
                self.value = Some(if b { "1" } else { "0" }.to_string());
            }
        }
    }

    fn set_attr(&mut self, key: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    fn remove_attr(&mut self, key: &str) {
        self.attrs.retain(|(k, _)| k != key);
    }
}

/// One `<row>` element
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: u32,
    attrs: Vec<(String, String)>,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            attrs: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.iter().find(|c| c.col == col)
    }
}

/// A parsed worksheet part
#[derive(Debug, Clone)]
pub struct Worksheet {
    pub name: String,
    pub part: String,
    head: Vec<Event<'static>>,
    pub rows: Vec<Row>,
    tail: Vec<Event<'static>>,
    merge_slot: Option<usize>,
    pub merges: Vec<CellRange>,
    /// Relationship ids of `<tablePart>` elements
    pub table_rel_ids: Vec<String>,
}

impl Worksheet {
    pub fn parse(name: &str, part: &str, xml: &[u8]) -> XlFillResult<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);

        let mut sheet = Worksheet {
            name: name.to_string(),
            part: part.to_string(),
            head: Vec::new(),
            rows: Vec::new(),
            tail: Vec::new(),
            merge_slot: None,
            merges: Vec::new(),
            table_rel_ids: Vec::new(),
        };

        #[derive(PartialEq)]
        enum Phase {
            Head,
            Data,
            Tail,
        }
        #[derive(PartialEq)]
        enum Text {
            None,
            Formula,
            Value,
            Inline,
        }

        let mut phase = Phase::Head;
        let mut in_merges = false;
        let mut row: Option<Row> = None;
        let mut cell: Option<Cell> = None;
        let mut text = Text::None;
        let mut in_phonetic = false;
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let empty = matches!(event, Event::Empty(_));
            match phase {
                Phase::Head => match event {
                    Event::Start(e) if e.name().as_ref() == b"sheetData" => {
                        sheet.head.push(Event::Start(e.into_owned()));
                        phase = Phase::Data;
                    }
                    Event::Empty(e) if e.name().as_ref() == b"sheetData" => {
                        sheet.head.push(Event::Start(e.into_owned()));
                        sheet.tail.push(Event::End(BytesEnd::new("sheetData")));
                        phase = Phase::Tail;
                    }
                    Event::Eof => {
                        return Err(XlFillError::Validation(format!(
                            "worksheet '{}' has no sheetData",
                            name
                        )))
                    }
                    other => sheet.head.push(other.into_owned()),
                },
                Phase::Data => match event {
                    Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"row" => {
                        let mut attrs = read_attrs(&e)?;
                        let index = take_attr(&mut attrs, "r")
                            .and_then(|r| r.parse().ok())
                            .unwrap_or_else(|| sheet.rows.last().map_or(1, |r| r.index + 1));
                        let parsed = Row {
                            index,
                            attrs,
                            cells: Vec::new(),
                        };
                        if empty {
                            sheet.rows.push(parsed);
                        } else {
                            row = Some(parsed);
                        }
                    }
                    Event::End(e) if e.name().as_ref() == b"row" => {
                        if let Some(done) = row.take() {
                            sheet.rows.push(done);
                        }
                    }
                    Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"c" => {
                        let mut attrs = read_attrs(&e)?;
                        let current = row.as_ref().map_or(0, |r| r.cells.last().map_or(0, |c| c.col));
                        let col = take_attr(&mut attrs, "r")
                            .and_then(|r| CellRef::parse(&r))
                            .map_or(current + 1, |r| r.col);
                        let parsed = Cell {
                            col,
                            attrs,
                            formula: None,
                            value: None,
                            inline_text: None,
                        };
                        if empty {
                            if let Some(r) = row.as_mut() {
                                r.cells.push(parsed);
                            }
                        } else {
                            cell = Some(parsed);
                        }
                    }
                    Event::End(e) if e.name().as_ref() == b"c" => {
                        if let (Some(r), Some(done)) = (row.as_mut(), cell.take()) {
                            r.cells.push(done);
                        }
                        text = Text::None;
                    }
                    Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"f" => {
                        if let Some(c) = cell.as_mut() {
                            c.formula = Some(CellFormula {
                                text: String::new(),
                                attrs: read_attrs(&e)?,
                            });
                        }
                        if !empty {
                            text = Text::Formula;
                        }
                    }
                    Event::Start(e) if e.name().as_ref() == b"v" => text = Text::Value,
                    Event::Start(e) if e.name().as_ref() == b"is" => {
                        if let Some(c) = cell.as_mut() {
                            c.inline_text = Some(String::new());
                        }
                    }
                    Event::Start(e) if e.name().as_ref() == b"rPh" => in_phonetic = true,
                    Event::End(e) if e.name().as_ref() == b"rPh" => in_phonetic = false,
                    Event::Start(e) if e.name().as_ref() == b"t" => {
                        if !in_phonetic {
                            text = Text::Inline;
                        }
                    }
                    Event::End(e)
                        if matches!(e.name().as_ref(), b"f" | b"v" | b"t") =>
                    {
                        text = Text::None;
                    }
                    Event::Text(t) => {
                        if let Some(c) = cell.as_mut() {
                            let content = t.unescape()?;
                            match text {
                                Text::Formula => {
                                    if let Some(f) = c.formula.as_mut() {
                                        f.text.push_str(&content);
                                    }
                                }
                                Text::Value => {
                                    c.value.get_or_insert_with(String::new).push_str(&content)
                                }
                                Text::Inline => c
                                    .inline_text
                                    .get_or_insert_with(String::new)
                                    .push_str(&content),
                                Text::None => {}
                            }
                        }
                    }
                    Event::End(e) if e.name().as_ref() == b"sheetData" => {
                        sheet.tail.push(Event::End(e.into_owned()));
                        phase = Phase::Tail;
                    }
                    Event::Eof => {
                        return Err(XlFillError::Validation(format!(
                            "worksheet '{}' ends inside sheetData",
                            name
                        )))
                    }
                    _ => {}
                },
                Phase::Tail => match event {
                    Event::Start(e) if e.name().as_ref() == b"mergeCells" => {
                        sheet.merge_slot = Some(sheet.tail.len());
                        in_merges = true;
                    }
                    Event::Empty(e) if e.name().as_ref() == b"mergeCells" => {
                        sheet.merge_slot = Some(sheet.tail.len());
                    }
                    Event::End(e) if e.name().as_ref() == b"mergeCells" => in_merges = false,
                    Event::Start(e) | Event::Empty(e) if in_merges => {
                        if e.name().as_ref() == b"mergeCell" {
                            let attrs = read_attrs(&e)?;
                            if let Some(range) = find_attr(&attrs, "ref").and_then(CellRange::parse)
                            {
                                sheet.merges.push(range);
                            }
                        }
                    }
                    _ if in_merges => {}
                    Event::Eof => break,
                    other => {
                        if let Event::Empty(e) | Event::Start(e) = &other {
                            if e.name().as_ref() == b"tablePart" {
                                let attrs = read_attrs(e)?;
                                if let Some(id) = find_attr(&attrs, "r:id") {
                                    sheet.table_rel_ids.push(id.to_string());
                                }
                            }
                        }
                        sheet.tail.push(other.into_owned());
                    }
                },
            }
            buf.clear();
        }

        sheet.rows.sort_by_key(|r| r.index);
        Ok(sheet)
    }

    pub fn row(&self, index: u32) -> Option<&Row> {
        self.rows.iter().find(|r| r.index == index)
    }

    pub fn cell(&self, reference: CellRef) -> Option<&Cell> {
        self.row(reference.row)?.cell(reference.col)
    }

    pub fn cell_mut(&mut self, reference: CellRef) -> Option<&mut Cell> {
        self.rows
            .iter_mut()
            .find(|r| r.index == reference.row)?
            .cells
            .iter_mut()
            .find(|c| c.col == reference.col)
    }

    pub fn max_row(&self) -> u32 {
        self.rows.last().map_or(0, |r| r.index)
    }

    /// All formula ranges (`ref` attribute of shared and array formulas)
    pub fn formula_ranges(&self) -> Vec<(CellRef, &CellFormula, Option<CellRange>)> {
        let mut found = Vec::new();
        for row in &self.rows {
            for cell in &row.cells {
                if let Some(f) = &cell.formula {
                    found.push((
                        CellRef::new(row.index, cell.col),
                        f,
                        f.attr("ref").and_then(CellRange::parse),
                    ));
                }
            }
        }
        found
    }

    /// Remove the rows `first..=last` and return them
    pub fn take_rows(&mut self, first: u32, last: u32) -> Vec<Row> {
        let (taken, kept): (Vec<Row>, Vec<Row>) = std::mem::take(&mut self.rows)
            .into_iter()
            .partition(|r| r.index >= first && r.index <= last);
        self.rows = kept;
        taken
    }

    /// Insert rows, keeping the row list ordered by index
    pub fn insert_rows(&mut self, rows: Vec<Row>) {
        self.rows.extend(rows);
        self.rows.sort_by_key(|r| r.index);
    }

    /// Apply a structural row edit made on sheet `edited`.
    ///
    /// On that sheet every row, cell formula, merged range and sheet-level
    /// reference outside the edited block moves; the caller removes the
    /// block's rows (and its own merges) beforehand. On any other sheet only
    /// formulas that name `edited` change.
    pub fn apply_row_edit(&mut self, edited: &str, edit: &RowEdit) -> XlFillResult<()> {
        let local = self.name == edited;
        let target = EditTarget { sheet: edited, local };

        for row in &mut self.rows {
            if local {
                if let Some(index) = edit.row(row.index) {
                    row.index = index;
                }
            }
            for cell in &mut row.cells {
                if let Some(f) = cell.formula.as_mut() {
                    if !f.text.is_empty() {
                        f.text = shift_formula(&f.text, target, edit);
                    }
                    if local {
                        shift_attr_range(&mut f.attrs, "ref", edit);
                    }
                }
            }
        }

        if local {
            self.merges = self.merges.iter().filter_map(|m| m.apply(edit)).collect();
        }
        self.head = rewrite_events(std::mem::take(&mut self.head), target, edit)?;
        self.tail = rewrite_events(std::mem::take(&mut self.tail), target, edit)?;
        Ok(())
    }

    /// Check the invariants Excel relies on before the sheet is written
    pub fn validate(&self) -> XlFillResult<()> {
        let fail = |location: String, reason: &str| XlFillError::Serialization {
            sheet: self.name.clone(),
            location,
            reason: reason.to_string(),
        };

        let mut previous_row = 0;
        for row in &self.rows {
            if row.index == 0 || row.index > MAX_ROWS {
                return Err(fail(format!("row {}", row.index), "row outside sheet limits"));
            }
            if row.index <= previous_row {
                return Err(fail(
                    format!("row {}", row.index),
                    "rows out of order or duplicated",
                ));
            }
            previous_row = row.index;

            let mut previous_col = 0;
            for cell in &row.cells {
                let at = CellRef::new(row.index, cell.col).to_string();
                if cell.col == 0 || cell.col > MAX_COLS {
                    return Err(fail(at, "column outside sheet limits"));
                }
                if cell.col <= previous_col {
                    return Err(fail(at, "cells out of order or duplicated"));
                }
                previous_col = cell.col;
            }
        }

        for (i, merge) in self.merges.iter().enumerate() {
            if merge.end.row > MAX_ROWS {
                return Err(fail(merge.to_string(), "merged range outside sheet limits"));
            }
            if let Some(other) = self.merges[i + 1..].iter().find(|m| m.overlaps(merge)) {
                return Err(fail(
                    format!("{} / {}", merge, other),
                    "merged ranges overlap",
                ));
            }
        }
        Ok(())
    }

    /// Serialize the worksheet part
    pub fn to_xml(&self) -> XlFillResult<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        for event in &self.head {
            writer.write_event(event.clone())?;
        }
        for row in &self.rows {
            write_row(&mut writer, row)?;
        }
        for (i, event) in self.tail.iter().enumerate() {
            if self.merge_slot == Some(i) {
                write_merges(&mut writer, &self.merges)?;
            }
            writer.write_event(event.clone())?;
        }
        if self.merge_slot == Some(self.tail.len()) {
            write_merges(&mut writer, &self.merges)?;
        }

        Ok(writer.into_inner().into_inner())
    }
}

fn write_row<W: std::io::Write>(writer: &mut Writer<W>, row: &Row) -> XlFillResult<()> {
    let mut start = BytesStart::new("row");
    let index = row.index.to_string();
    start.push_attribute(("r", index.as_str()));
    for (k, v) in &row.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if row.cells.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for cell in &row.cells {
        write_cell(writer, row.index, cell)?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_cell<W: std::io::Write>(writer: &mut Writer<W>, row: u32, cell: &Cell) -> XlFillResult<()> {
    let mut start = BytesStart::new("c");
    let reference = CellRef::new(row, cell.col).to_string();
    start.push_attribute(("r", reference.as_str()));
    for (k, v) in &cell.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if cell.formula.is_none() && cell.value.is_none() && cell.inline_text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;

    if let Some(formula) = &cell.formula {
        let mut f = BytesStart::new("f");
        for (k, v) in &formula.attrs {
            f.push_attribute((k.as_str(), v.as_str()));
        }
        if formula.text.is_empty() {
            writer.write_event(Event::Empty(f))?;
        } else {
            writer.write_event(Event::Start(f))?;
            writer.write_event(Event::Text(BytesText::new(&formula.text)))?;
            writer.write_event(Event::End(BytesEnd::new("f")))?;
        }
    }
    if let Some(value) = &cell.value {
        writer.write_event(Event::Start(BytesStart::new("v")))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("v")))?;
    }
    if let Some(text) = &cell.inline_text {
        writer.write_event(Event::Start(BytesStart::new("is")))?;
        let mut t = BytesStart::new("t");
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            t.push_attribute(("xml:space", "preserve"));
        }
        writer.write_event(Event::Start(t))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesEnd::new("t")))?;
        writer.write_event(Event::End(BytesEnd::new("is")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_merges<W: std::io::Write>(writer: &mut Writer<W>, merges: &[CellRange]) -> XlFillResult<()> {
    if merges.is_empty() {
        return Ok(());
    }
    let mut start = BytesStart::new("mergeCells");
    let count = merges.len().to_string();
    start.push_attribute(("count", count.as_str()));
    writer.write_event(Event::Start(start))?;
    for merge in merges {
        let mut cell = BytesStart::new("mergeCell");
        let reference = merge.to_string();
        cell.push_attribute(("ref", reference.as_str()));
        writer.write_event(Event::Empty(cell))?;
    }
    writer.write_event(Event::End(BytesEnd::new("mergeCells")))?;
    Ok(())
}

/// Elements outside `sheetData` whose attributes hold cell references
const RANGE_ATTRS: &[(&[u8], &str)] = &[
    (b"dimension", "ref"),
    (b"conditionalFormatting", "sqref"),
    (b"dataValidation", "sqref"),
    (b"hyperlink", "ref"),
    (b"autoFilter", "ref"),
    (b"protectedRange", "sqref"),
];

/// Elements whose text content is a formula (`xm:f` inside `extLst`)
const FORMULA_ELEMENTS: &[&[u8]] = &[b"formula", b"formula1", b"formula2", b"f"];

/// `extLst` elements whose range is the text of a trailing `xm:sqref`, and
/// whether each one is a wrapper around a list of them
const EXT_BLOCKS: &[(&[u8], bool)] = &[
    (b"conditionalFormatting", false),
    (b"dataValidation", false),
    (b"conditionalFormattings", true),
    (b"dataValidations", true),
];

/// An open `extLst` block, dropped at its end tag when its whole range was
/// deleted (or, for a wrapper, when no child survived)
struct ExtBlock {
    start: usize,
    wrapper: bool,
    dead: bool,
    kept: usize,
}

fn ext_block(start: &BytesStart<'_>) -> Option<bool> {
    if !start.name().as_ref().contains(&b':') {
        return None;
    }
    let local = start.local_name();
    EXT_BLOCKS
        .iter()
        .find(|(name, _)| *name == local.as_ref())
        .map(|(_, wrapper)| *wrapper)
}

fn is_ext_block_end(end: &BytesEnd<'_>) -> bool {
    end.name().as_ref().contains(&b':')
        && EXT_BLOCKS
            .iter()
            .any(|(name, _)| *name == end.local_name().as_ref())
}

fn rewrite_events(
    events: Vec<Event<'static>>,
    target: EditTarget<'_>,
    edit: &RowEdit,
) -> XlFillResult<Vec<Event<'static>>> {
    let mut out = Vec::with_capacity(events.len());
    let mut in_formula = false;
    let mut in_sqref = false;
    let mut skip_depth = 0usize;
    let mut blocks: Vec<ExtBlock> = Vec::new();

    for event in events {
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(e) => {
                let e = if target.local {
                    match rewrite_start(e, edit)? {
                        Some(e) => e,
                        None => {
                            skip_depth = 1;
                            continue;
                        }
                    }
                } else {
                    e
                };
                in_formula = FORMULA_ELEMENTS.contains(&e.local_name().as_ref());
                in_sqref = target.local
                    && e.name().as_ref().contains(&b':')
                    && e.local_name().as_ref() == b"sqref";
                if target.local {
                    if let Some(wrapper) = ext_block(&e) {
                        blocks.push(ExtBlock {
                            start: out.len(),
                            wrapper,
                            dead: false,
                            kept: 0,
                        });
                    }
                }
                out.push(Event::Start(e));
            }
            Event::Empty(e) => {
                if !target.local {
                    out.push(Event::Empty(e));
                } else if let Some(e) = rewrite_start(e, edit)? {
                    out.push(Event::Empty(e));
                }
            }
            Event::End(e) => {
                in_formula = false;
                in_sqref = false;
                if target.local && is_ext_block_end(&e) {
                    if let Some(block) = blocks.pop() {
                        if block.dead || (block.wrapper && block.kept == 0) {
                            out.truncate(block.start);
                            continue;
                        }
                        if let Some(parent) = blocks.last_mut() {
                            parent.kept += 1;
                        }
                    }
                }
                out.push(Event::End(e));
            }
            Event::Text(t) if in_formula => {
                let shifted = shift_formula(&t.unescape()?, target, edit);
                out.push(Event::Text(BytesText::new(&shifted).into_owned()));
            }
            Event::Text(t) if in_sqref => {
                let ranges = CellRange::parse_list(&t.unescape()?);
                let shifted: Vec<String> = ranges
                    .iter()
                    .filter_map(|r| r.apply(edit))
                    .map(|r| r.to_string())
                    .collect();
                if shifted.is_empty() {
                    if !ranges.is_empty() {
                        if let Some(block) = blocks.last_mut() {
                            block.dead = true;
                        }
                    }
                    out.push(Event::Text(t));
                } else {
                    out.push(Event::Text(BytesText::new(&shifted.join(" ")).into_owned()));
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Shift the reference attribute of `start`; `None` drops an element whose
/// whole range was deleted
fn rewrite_start(
    start: BytesStart<'static>,
    edit: &RowEdit,
) -> XlFillResult<Option<BytesStart<'static>>> {
    let Some((_, key)) = RANGE_ATTRS
        .iter()
        .find(|(name, _)| *name == start.name().as_ref())
    else {
        return Ok(Some(start));
    };

    let mut attrs = read_attrs(&start)?;
    if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == key) {
        let shifted: Vec<String> = CellRange::parse_list(&slot.1)
            .iter()
            .filter_map(|r| r.apply(edit))
            .map(|r| r.to_string())
            .collect();
        if shifted.is_empty() && !CellRange::parse_list(&slot.1).is_empty() {
            return Ok(None);
        }
        if !shifted.is_empty() {
            slot.1 = shifted.join(" ");
        }
    }

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    for (k, v) in &attrs {
        rebuilt.push_attribute((k.as_str(), v.as_str()));
    }
    Ok(Some(rebuilt))
}

fn shift_attr_range(attrs: &mut [(String, String)], key: &str, edit: &RowEdit) {
    if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == key) {
        if let Some(shifted) = CellRange::parse(&slot.1).and_then(|r| r.apply(edit)) {
            slot.1 = shifted.to_string();
        }
    }
}

pub(crate) fn read_attrs(start: &BytesStart<'_>) -> XlFillResult<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

pub(crate) fn find_attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn take_attr(attrs: &mut Vec<(String, String)>, key: &str) -> Option<String> {
    let pos = attrs.iter().position(|(k, _)| k == key)?;
    Some(attrs.remove(pos).1)
}

/// Shortest decimal form Excel reads back as the same double
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
