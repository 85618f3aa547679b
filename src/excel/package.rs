//! In-memory spreadsheet package
//!
//! The archive is held as an ordered list of parts. Worksheets and table
//! parts are parsed into editable models; every other part (styles, themes,
//! drawings, shared strings, doc props) is written back byte-for-byte.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::formula::{shift_formula, EditTarget};
use super::reference::{CellRange, CellRef, RowEdit};
use super::sheet::{find_attr, read_attrs, CellValue, Worksheet};
use crate::error::{XlFillError, XlFillResult};

const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
const REL_WORKSHEET: &str = "/worksheet";
const REL_SHARED_STRINGS: &str = "/sharedStrings";
const REL_TABLE: &str = "/table";
const REL_CALC_CHAIN: &str = "/calcChain";
const CHART_PREFIX: &str = "xl/charts/chart";

/// Elements that follow `calcPr` in the workbook schema
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

/// An Excel table (`xl/tables/tableN.xml`) anchored on a worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub sheet: String,
    pub part: String,
    pub range: CellRange,
    original: CellRange,
    pub header_rows: u32,
    pub totals_rows: u32,
}

impl Table {
    /// Follow a row edit on the owning sheet. A table never shrinks below
    /// its header, one data row and its totals row.
    pub fn apply_row_edit(&mut self, edit: &RowEdit) {
        let (start, mut end) = edit
            .span(self.range.start.row, self.range.end.row)
            .unwrap_or((edit.first, edit.first));
        let min_rows = self.header_rows + self.totals_rows + 1;
        if end + 1 < start + min_rows {
            end = start + min_rows - 1;
        }
        self.range = CellRange::new(
            CellRef::new(start, self.range.start.col),
            CellRef::new(end, self.range.end.col),
        );
    }

    fn is_modified(&self) -> bool {
        self.range != self.original
    }
}

/// A loaded template workbook
#[derive(Debug, Clone)]
pub struct Workbook {
    source: String,
    parts: Vec<Part>,
    workbook_part: String,
    workbook_rels_part: String,
    shared_strings: Vec<String>,
    sheets: Vec<Worksheet>,
    tables: Vec<Table>,
    date1904: bool,
    recalc: bool,
    /// Row edits in the order they were made, replayed over defined names
    /// and chart series when the package is written
    row_edits: Vec<(String, RowEdit)>,
}

impl Workbook {
    /// Read a workbook from disk
    pub fn open(path: &Path) -> XlFillResult<Self> {
        let bytes = std::fs::read(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(&source, &bytes)
    }

    /// Parse a workbook from package bytes. `source` names it in errors.
    pub fn from_bytes(source: &str, bytes: &[u8]) -> XlFillResult<Self> {
        Self::load(source, bytes).map_err(|e| match e {
            XlFillError::TemplateCorrupt { .. } => e,
            other => XlFillError::corrupt(source, other),
        })
    }

    fn load(source: &str, bytes: &[u8]) -> XlFillResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)?;
            parts.push(Part {
                name: file.name().to_string(),
                data,
            });
        }
        let lookup: HashMap<&str, &[u8]> = parts
            .iter()
            .map(|p| (p.name.as_str(), p.data.as_slice()))
            .collect();

        let root_rels = lookup
            .get("_rels/.rels")
            .map(|data| parse_rels(data))
            .transpose()?
            .unwrap_or_default();
        let workbook_part = root_rels
            .iter()
            .find(|r| r.rel_type.ends_with(REL_OFFICE_DOCUMENT))
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| "xl/workbook.xml".to_string());
        let workbook_xml = lookup
            .get(workbook_part.as_str())
            .ok_or_else(|| XlFillError::corrupt(source, format!("missing {}", workbook_part)))?;

        let workbook_rels_part = rels_part_for(&workbook_part);
        let workbook_rels = match lookup.get(workbook_rels_part.as_str()) {
            Some(data) => parse_rels(data)?,
            None => Vec::new(),
        };
        let (sheet_entries, date1904) = parse_workbook(workbook_xml)?;

        let shared_strings_part = workbook_rels
            .iter()
            .find(|r| r.rel_type.ends_with(REL_SHARED_STRINGS))
            .map(|r| resolve_target(&workbook_part, &r.target))
            .unwrap_or_else(|| "xl/sharedStrings.xml".to_string());
        let shared_strings = match lookup.get(shared_strings_part.as_str()) {
            Some(data) => parse_shared_strings(data)?,
            None => Vec::new(),
        };

        let mut sheets = Vec::new();
        let mut tables = Vec::new();
        for (name, rel_id) in sheet_entries {
            let Some(rel) = workbook_rels
                .iter()
                .find(|r| r.id == rel_id && r.rel_type.ends_with(REL_WORKSHEET))
            else {
                // Chartsheets and dialog sheets are carried through untouched
                continue;
            };
            let part = resolve_target(&workbook_part, &rel.target);
            let data = lookup
                .get(part.as_str())
                .ok_or_else(|| XlFillError::corrupt(source, format!("missing {}", part)))?;
            let sheet = Worksheet::parse(&name, &part, data)?;

            if !sheet.table_rel_ids.is_empty() {
                let sheet_rels = match lookup.get(rels_part_for(&part).as_str()) {
                    Some(data) => parse_rels(data)?,
                    None => Vec::new(),
                };
                for id in &sheet.table_rel_ids {
                    let Some(rel) = sheet_rels
                        .iter()
                        .find(|r| &r.id == id && r.rel_type.ends_with(REL_TABLE) && !r.external)
                    else {
                        continue;
                    };
                    let table_part = resolve_target(&part, &rel.target);
                    if let Some(data) = lookup.get(table_part.as_str()) {
                        tables.push(parse_table(&name, &table_part, data)?);
                    }
                }
            }
            sheets.push(sheet);
        }

        Ok(Self {
            source: source.to_string(),
            parts,
            workbook_part,
            workbook_rels_part,
            shared_strings,
            sheets,
            tables,
            date1904,
            recalc: false,
            row_edits: Vec::new(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub(crate) fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    pub fn shared_strings(&self) -> &[String] {
        &self.shared_strings
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn is_date1904(&self) -> bool {
        self.date1904
    }

    /// True once the workbook must be recalculated when opened
    pub fn needs_recalc(&self) -> bool {
        self.recalc
    }

    pub(crate) fn mark_recalc(&mut self) {
        self.recalc = true;
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Read a cell by sheet name and A1 reference
    pub fn cell_value(&self, sheet: &str, reference: &str) -> Option<CellValue> {
        let reference = CellRef::parse(reference)?;
        let cell = self.sheet(sheet)?.cell(reference)?;
        Some(cell.read_value(&self.shared_strings))
    }

    /// Formula text of a cell, if it has one
    pub fn cell_formula(&self, sheet: &str, reference: &str) -> Option<&str> {
        let reference = CellRef::parse(reference)?;
        let cell = self.sheet(sheet)?.cell(reference)?;
        cell.formula.as_ref().map(|f| f.text.as_str())
    }

    /// Shift everything on sheet `index` for a row edit, including the
    /// ranges of tables anchored there, and every reference to that sheet
    /// from other sheets, defined names and charts
    pub(crate) fn apply_row_edit(&mut self, index: usize, edit: &RowEdit) -> XlFillResult<()> {
        let Some(name) = self.sheets.get(index).map(|s| s.name.clone()) else {
            return Ok(());
        };
        for sheet in self.sheets.iter_mut() {
            sheet.apply_row_edit(&name, edit)?;
        }
        for table in self.tables.iter_mut().filter(|t| t.sheet == name) {
            table.apply_row_edit(edit);
        }
        self.row_edits.push((name, *edit));
        Ok(())
    }

    /// Validate and write the package. Parts keep their original order and
    /// a fixed timestamp so identical input gives identical bytes.
    pub fn to_bytes(&self) -> XlFillResult<Vec<u8>> {
        for sheet in &self.sheets {
            sheet.validate()?;
        }

        let calc_chain_part = if self.recalc {
            self.calc_chain_part()?
        } else {
            None
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for part in &self.parts {
            if calc_chain_part.as_deref() == Some(part.name.as_str()) {
                continue;
            }
            let data = self.encode_part(part, calc_chain_part.as_deref())?;
            writer.start_file(part.name.as_str(), options)?;
            writer.write_all(data.as_deref().unwrap_or(part.data.as_slice()))?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// New content for a part, or `None` to copy it unchanged
    fn encode_part(&self, part: &Part, calc_chain: Option<&str>) -> XlFillResult<Option<Vec<u8>>> {
        if let Some(sheet) = self.sheets.iter().find(|s| s.part == part.name) {
            return sheet.to_xml().map(Some);
        }
        if let Some(table) = self
            .tables
            .iter()
            .find(|t| t.part == part.name && t.is_modified())
        {
            return rewrite_table(&part.data, table).map(Some);
        }
        if let Some(calc_chain) = calc_chain {
            if part.name == "[Content_Types].xml" {
                let target = format!("/{}", calc_chain);
                return remove_elements(&part.data, |name, attrs| {
                    name == b"Override" && find_attr(attrs, "PartName") == Some(target.as_str())
                })
                .map(Some);
            }
            if part.name == self.workbook_rels_part {
                return remove_elements(&part.data, |name, attrs| {
                    name == b"Relationship"
                        && find_attr(attrs, "Type").is_some_and(|t| t.ends_with(REL_CALC_CHAIN))
                })
                .map(Some);
            }
        }
        if part.name == self.workbook_part {
            let mut data = None;
            if !self.row_edits.is_empty() {
                data = Some(shift_formula_text(&part.data, b"definedName", &self.row_edits)?);
            }
            if self.recalc {
                data = Some(force_full_calc(data.as_deref().unwrap_or(part.data.as_slice()))?);
            }
            return Ok(data);
        }
        if !self.row_edits.is_empty()
            && part.name.starts_with(CHART_PREFIX)
            && part.name.ends_with(".xml")
        {
            return shift_formula_text(&part.data, b"f", &self.row_edits).map(Some);
        }
        Ok(None)
    }

    fn calc_chain_part(&self) -> XlFillResult<Option<String>> {
        let Some(data) = self.part(&self.workbook_rels_part) else {
            return Ok(None);
        };
        Ok(parse_rels(data)?
            .into_iter()
            .find(|r| r.rel_type.ends_with(REL_CALC_CHAIN))
            .map(|r| resolve_target(&self.workbook_part, &r.target))
            .filter(|name| self.part(name).is_some()))
    }
}

fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns it
fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn parse_rels(xml: &[u8]) -> XlFillResult<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rels = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let attrs = read_attrs(&e)?;
                rels.push(Relationship {
                    id: find_attr(&attrs, "Id").unwrap_or_default().to_string(),
                    rel_type: find_attr(&attrs, "Type").unwrap_or_default().to_string(),
                    target: find_attr(&attrs, "Target").unwrap_or_default().to_string(),
                    external: find_attr(&attrs, "TargetMode") == Some("External"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Sheet (name, relationship id) pairs in tab order, and the date system
fn parse_workbook(xml: &[u8]) -> XlFillResult<(Vec<(String, String)>, bool)> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut date1904 = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let attrs = read_attrs(&e)?;
                    let name = find_attr(&attrs, "name").unwrap_or_default().to_string();
                    let rel_id = attrs
                        .iter()
                        .find(|(k, _)| k == "r:id" || k.ends_with(":id"))
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default();
                    sheets.push((name, rel_id));
                }
                b"workbookPr" => {
                    let attrs = read_attrs(&e)?;
                    date1904 = matches!(find_attr(&attrs, "date1904"), Some("1") | Some("true"));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok((sheets, date1904))
}

fn parse_shared_strings(xml: &[u8]) -> XlFillResult<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn parse_table(sheet: &str, part: &str, xml: &[u8]) -> XlFillResult<Table> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"table" => {
                let attrs = read_attrs(&e)?;
                let range = find_attr(&attrs, "ref")
                    .and_then(CellRange::parse)
                    .ok_or_else(|| XlFillError::Validation(format!("table {} has no ref", part)))?;
                let count = |key: &str, default: u32| {
                    find_attr(&attrs, key)
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(default)
                };
                return Ok(Table {
                    name: find_attr(&attrs, "displayName")
                        .or_else(|| find_attr(&attrs, "name"))
                        .unwrap_or_default()
                        .to_string(),
                    sheet: sheet.to_string(),
                    part: part.to_string(),
                    range,
                    original: range,
                    header_rows: count("headerRowCount", 1),
                    totals_rows: count("totalsRowCount", 0),
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Err(XlFillError::Validation(format!("{} is not a table part", part)))
}

/// Copy `xml`, passing each start/empty element through `edit`
fn rewrite_elements<F>(xml: &[u8], mut edit: F) -> XlFillResult<Vec<u8>>
where
    F: FnMut(BytesStart<'_>) -> XlFillResult<BytesStart<'static>>,
{
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => writer.write_event(Event::Start(edit(e)?))?,
            Event::Empty(e) => writer.write_event(Event::Empty(edit(e)?))?,
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner().into_inner())
}

fn rewrite_table(xml: &[u8], table: &Table) -> XlFillResult<Vec<u8>> {
    let start_delta = i64::from(table.range.start.row) - i64::from(table.original.start.row);
    let end_delta = i64::from(table.range.end.row) - i64::from(table.original.end.row);
    let shift = |row: u32, delta: i64| u32::try_from((i64::from(row) + delta).max(1)).unwrap_or(1);

    rewrite_elements(xml, |start| {
        let name = start.local_name().as_ref().to_vec();
        if !matches!(name.as_slice(), b"table" | b"autoFilter" | b"sortState") {
            return Ok(start.into_owned());
        }
        let mut attrs = read_attrs(&start)?;
        if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == "ref") {
            if let Some(range) = CellRange::parse(&slot.1) {
                let moved = if name == b"table" {
                    table.range
                } else {
                    CellRange::new(
                        CellRef::new(shift(range.start.row, start_delta), range.start.col),
                        CellRef::new(shift(range.end.row, end_delta), range.end.col),
                    )
                };
                slot.1 = moved.to_string();
            }
        }
        Ok(rebuild(&start, &attrs))
    })
}

fn rebuild(start: &BytesStart<'_>, attrs: &[(String, String)]) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut rebuilt = BytesStart::new(name);
    for (k, v) in attrs {
        rebuilt.push_attribute((k.as_str(), v.as_str()));
    }
    rebuilt
}

/// Drop every element for which `predicate(local_name, attrs)` holds
fn remove_elements<F>(xml: &[u8], predicate: F) -> XlFillResult<Vec<u8>>
where
    F: Fn(&[u8], &[(String, String)]) -> bool,
{
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;
    loop {
        let event = reader.read_event_into(&mut buf)?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
            continue;
        }
        let dropped = match &event {
            Event::Start(e) | Event::Empty(e) => predicate(e.local_name().as_ref(), &read_attrs(e)?),
            _ => false,
        };
        match event {
            Event::Eof => break,
            Event::Start(_) if dropped => skip_depth = 1,
            _ if dropped => {}
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner().into_inner())
}

/// Replay `edits` over the text of every `element` (defined names in the
/// workbook part, series formulas in charts). Only references qualified
/// with the edited sheet's name can point into it from there.
fn shift_formula_text(
    xml: &[u8],
    element: &[u8],
    edits: &[(String, RowEdit)],
) -> XlFillResult<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut inside = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                inside = e.local_name().as_ref() == element;
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                inside = false;
                writer.write_event(Event::End(e))?;
            }
            Event::Text(t) if inside => {
                let mut text = t.unescape()?.into_owned();
                for (sheet, edit) in edits {
                    text = shift_formula(&text, EditTarget::remote(sheet), edit);
                }
                writer.write_event(Event::Text(BytesText::new(&text)))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner().into_inner())
}

/// Set `calcPr fullCalcOnLoad="1"`, inserting the element when absent
fn force_full_calc(xml: &[u8]) -> XlFillResult<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut done = false;

    let calc_pr = |existing: Option<&BytesStart<'_>>| -> XlFillResult<BytesStart<'static>> {
        let mut attrs = match existing {
            Some(e) => read_attrs(e)?,
            None => Vec::new(),
        };
        attrs.retain(|(k, _)| k != "fullCalcOnLoad");
        attrs.push(("fullCalcOnLoad".to_string(), "1".to_string()));
        let mut start = BytesStart::new("calcPr");
        for (k, v) in &attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        Ok(start)
    };

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(event, Event::Empty(_));
        match event {
            Event::Empty(e) if !done && e.local_name().as_ref() == b"calcPr" => {
                writer.write_event(Event::Empty(calc_pr(Some(&e))?))?;
                done = true;
            }
            Event::Start(e) if !done && e.local_name().as_ref() == b"calcPr" => {
                writer.write_event(Event::Start(calc_pr(Some(&e))?))?;
                done = true;
            }
            Event::Start(e) | Event::Empty(e)
                if !done && AFTER_CALC_PR.contains(&e.local_name().as_ref()) =>
            {
                writer.write_event(Event::Empty(calc_pr(None)?))?;
                done = true;
                if empty {
                    writer.write_event(Event::Empty(e))?;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::End(e) if !done && e.local_name().as_ref() == b"workbook" => {
                writer.write_event(Event::Empty(calc_pr(None)?))?;
                done = true;
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner().into_inner())
}
