#![cfg(not(tarpaulin_include))]

use crate::cell::CellValue;
use crate::sheet::Sheet;

#[cfg(feature = "xlsx")]
use crate::error::{HeatError, Result};
#[cfg(feature = "xlsx")]
use crate::spreadsheet::Spreadsheet;

/// Convert a sheet to CSV format
///
/// Exports the used range of the sheet. Fields holding commas, quotes or
/// newlines are quoted, and formulas are written as their source text.
///
/// # Arguments
/// * `sheet` - Reference to the sheet to convert
///
/// # Returns
/// * `String` - CSV content, one line per row
///
/// # Examples
/// ```
/// use vcoc::sheet::Sheet;
/// use vcoc::downloader::to_csv;
///
/// let mut sheet = Sheet::new("Event 1", 1, 2);
/// sheet.set(1, 1, "Lee, Ann");
/// sheet.set(1, 2, "30.00");
/// assert_eq!(to_csv(&sheet), "\"Lee, Ann\",30.00\n");
/// ```
pub fn to_csv(sheet: &Sheet) -> String {
    let mut csv_content = String::new();

    for row in sheet.data_values() {
        let line: Vec<String> = row.iter().map(csv_field).collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn csv_field(value: &CellValue) -> String {
    let value = value.to_string();
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value
    }
}

/// Convert the workbook to XLSX format
///
/// Every sheet becomes a worksheet of the same name. Status and tie
/// colors, bold summary headings, heat lines and table borders are carried
/// over so the exported heat sheets print the way they look on screen.
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes
#[cfg(feature = "xlsx")]
pub fn to_xlsx(book: &Spreadsheet) -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let export = |e: rust_xlsxwriter::XlsxError| HeatError::Export(e.to_string());
    let mut workbook = Workbook::new();

    for sheet in &book.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name()).map_err(export)?;

        for r in 1..=sheet.max_rows() {
            for c in 1..=sheet.max_columns() {
                let Some(cell) = sheet.cell(r, c) else { continue };
                let format = xlsx_format(cell);
                let (row, col) = (r - 1, (c - 1) as u16);
                match (&cell.value, &format) {
                    (CellValue::Empty, None) => {}
                    (CellValue::Empty, Some(f)) => {
                        worksheet.write_blank(row, col, f).map_err(export)?;
                    }
                    (CellValue::Text(s), Some(f)) => {
                        worksheet.write_string_with_format(row, col, s, f).map_err(export)?;
                    }
                    (CellValue::Text(s), None) => {
                        worksheet.write_string(row, col, s).map_err(export)?;
                    }
                    (CellValue::Number(n), Some(f)) => {
                        worksheet.write_number_with_format(row, col, *n, f).map_err(export)?;
                    }
                    (CellValue::Number(n), None) => {
                        worksheet.write_number(row, col, *n).map_err(export)?;
                    }
                    (CellValue::Formula(s), Some(f)) => {
                        worksheet
                            .write_formula_with_format(row, col, s.as_str(), f)
                            .map_err(export)?;
                    }
                    (CellValue::Formula(s), None) => {
                        worksheet.write_formula(row, col, s.as_str()).map_err(export)?;
                    }
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(export)
}

#[cfg(feature = "xlsx")]
fn xlsx_format(cell: &crate::cell::Cell) -> Option<rust_xlsxwriter::Format> {
    use crate::cell::Border;
    use rust_xlsxwriter::{Color, Format, FormatBorder};

    if cell.background.is_none() && !cell.bold && cell.border == Border::None {
        return None;
    }

    let mut format = Format::new();
    if let Some(hex) = cell.background.as_deref() {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if let Ok(rgb) = u32::from_str_radix(digits, 16) {
            format = format.set_background_color(Color::RGB(rgb));
        }
    }
    if cell.bold {
        format = format.set_bold();
    }
    format = match cell.border {
        Border::None => format,
        Border::Bottom => format.set_border_bottom(FormatBorder::Thin),
        Border::All => format.set_border(FormatBorder::Thin),
    };
    Some(format)
}
