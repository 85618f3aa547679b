//! Table report writer - builds a fresh formatted workbook from row objects
//! when no template is involved

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use serde_json::{Map, Value};

use crate::error::{XlFillError, XlFillResult};

const HEADER_BACKGROUND: u32 = 0x366092;
const TOTALS_BACKGROUND: u32 = 0xE7E6E6;
const COLUMN_WIDTH: f64 = 15.0;

/// A single-sheet report: header row, one row per object, totals row
#[derive(Debug, Clone)]
pub struct TableReport {
    sheet_name: String,
    headers: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl TableReport {
    /// Columns come from the keys of the first row, in payload order
    pub fn from_rows(rows: &[Value]) -> XlFillResult<Self> {
        if rows.is_empty() {
            return Err(XlFillError::Validation(
                "table report needs at least one row".to_string(),
            ));
        }

        let mut objects = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row {
                Value::Object(map) => objects.push(map.clone()),
                _ => {
                    return Err(XlFillError::Validation(format!(
                        "row {} is not a JSON object",
                        i + 1
                    )))
                }
            }
        }
        let headers = objects[0].keys().cloned().collect();

        Ok(Self {
            sheet_name: "Report".to_string(),
            headers,
            rows: objects,
        })
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Sums of the numeric columns, skipping identifier columns (`...id`)
    pub fn totals(&self) -> Vec<(String, f64)> {
        self.headers
            .iter()
            .filter(|h| !h.to_lowercase().ends_with("id"))
            .filter_map(|header| {
                let mut seen = false;
                let sum = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(header).and_then(Value::as_f64))
                    .inspect(|_| seen = true)
                    .sum::<f64>();
                seen.then(|| (header.clone(), sum))
            })
            .collect()
    }

    /// Render the report to xlsx bytes
    pub fn to_bytes(&self) -> XlFillResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&self.sheet_name)
            .map_err(|e| XlFillError::Report(format!("Failed to set worksheet name: {}", e)))?;

        let border = Format::new().set_border(FormatBorder::Thin);
        let header_format = border
            .clone()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_BACKGROUND))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let data_format = border
            .clone()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter);
        let totals_format = border
            .set_bold()
            .set_background_color(Color::RGB(TOTALS_BACKGROUND));

        // Header row
        for (col, header) in self.headers.iter().enumerate() {
            let col = column(col)?;
            worksheet
                .write_string_with_format(0, col, header, &header_format)
                .map_err(|e| XlFillError::Report(format!("Failed to write header: {}", e)))?;
            worksheet
                .set_column_width(col, COLUMN_WIDTH)
                .map_err(|e| XlFillError::Report(format!("Failed to set column width: {}", e)))?;
        }

        // Data rows
        for (i, row) in self.rows.iter().enumerate() {
            let excel_row = u32::try_from(i + 1)
                .map_err(|_| XlFillError::Validation("too many rows".to_string()))?;
            for (col, header) in self.headers.iter().enumerate() {
                let value = row.get(header).unwrap_or(&Value::Null);
                write_value(worksheet, excel_row, column(col)?, value, &data_format)?;
            }
        }

        // Totals row
        let totals_row = u32::try_from(self.rows.len() + 1)
            .map_err(|_| XlFillError::Validation("too many rows".to_string()))?;
        let totals = self.totals();
        for (col, header) in self.headers.iter().enumerate() {
            let col_index = column(col)?;
            let result = if col == 0 {
                worksheet
                    .write_string_with_format(totals_row, col_index, "Total", &totals_format)
                    .map(|_| ())
            } else if let Some((_, sum)) = totals.iter().find(|(name, _)| name == header) {
                worksheet
                    .write_number_with_format(totals_row, col_index, *sum, &totals_format)
                    .map(|_| ())
            } else {
                worksheet
                    .write_blank(totals_row, col_index, &totals_format)
                    .map(|_| ())
            };
            result.map_err(|e| XlFillError::Report(format!("Failed to write totals: {}", e)))?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| XlFillError::Report(format!("Failed to save report: {}", e)))
    }
}

fn column(index: usize) -> XlFillResult<u16> {
    u16::try_from(index).map_err(|_| XlFillError::Validation("too many columns".to_string()))
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: &Format,
) -> XlFillResult<()> {
    let result = match value {
        Value::Null => worksheet.write_blank(row, col, format),
        Value::Bool(b) => worksheet.write_boolean_with_format(row, col, *b, format),
        Value::Number(n) => match n.as_f64() {
            Some(number) => worksheet.write_number_with_format(row, col, number, format),
            None => worksheet.write_string_with_format(row, col, n.to_string(), format),
        },
        Value::String(s) => worksheet.write_string_with_format(row, col, s, format),
        other => worksheet.write_string_with_format(row, col, other.to_string(), format),
    };
    result
        .map(|_| ())
        .map_err(|e| XlFillError::Report(format!("Failed to write cell: {}", e)))
}
