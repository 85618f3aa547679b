//! Spreadsheet package handling
//!
//! - `package` / `sheet`: style-preserving read and write of `.xlsx` templates
//! - `reference` / `formula`: A1 references and row-shift rewriting
//! - `inspector`: template catalogue metadata (calamine)
//! - `table_report`: fresh formatted reports from row data (rust_xlsxwriter)

mod formula;
mod inspector;
mod package;
mod reference;
mod sheet;
mod table_report;

pub use formula::{
    copy_formula, rewrite_references, shift_formula, AreaRef, EditTarget, Qualifier, RefPoint,
};
pub use inspector::{display_name, inspect, sample_value, TemplateInfo};
pub use package::{Table, Workbook};
pub use reference::{
    column_index_to_letter, column_letter_to_number, CellRange, CellRef, RowEdit, MAX_COLS,
    MAX_ROWS,
};
pub use sheet::{Cell, CellFormula, CellValue, Row, Worksheet};
pub use table_report::TableReport;
