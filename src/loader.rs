#![cfg(not(tarpaulin_include))]

use crate::cell::CellValue;
use crate::error::{HeatError, Result};
use crate::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load one sheet from a CSV file
///
/// Whole numbers become numbers, `=...` fields stay formulas and everything
/// else (including decimal times such as `30.00`) is kept as text.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
/// * `name` - Name given to the resulting sheet
///
/// # Examples
/// ```no_run
/// use vcoc::loader::from_csv;
///
/// match from_csv("event3.csv", "Event 3") {
///     Ok(sheet) => println!("Loaded {} rows", sheet.last_row()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>, name: &str) -> Result<Sheet> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;

    if lines.is_empty() {
        return Err(HeatError::Import("CSV file is empty".into()));
    }

    let rows: Vec<Vec<CellValue>> = lines
        .iter()
        .map(|line| parse_csv_row(line).iter().map(|f| CellValue::parse(f)).collect())
        .collect();
    Ok(Sheet::from_rows(name, rows))
}

/// Load every sheet of an Excel workbook (xlsx, xls, xlsb or ods)
///
/// Cached formula results are read as values. Fractional numbers are kept
/// as text so recorded times keep their decimal point.
#[cfg(feature = "xlsx")]
pub fn from_excel(filepath: impl AsRef<Path>) -> Result<Vec<Sheet>> {
    use calamine::{Data, Reader, open_workbook_auto};

    let mut workbook = open_workbook_auto(filepath.as_ref())
        .map_err(|e| HeatError::Import(format!("Failed to open Excel file: {}", e)))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(HeatError::Import("No sheets found in Excel file".into()));
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in &names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| HeatError::Import(format!("Failed to read sheet '{}': {}", name, e)))?;
        let (row0, col0) = range.start().unwrap_or((0, 0));

        let mut sheet = Sheet::new(name.as_str(), 0, 0);
        for (r, row) in range.rows().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let value = match cell {
                    Data::Empty => continue,
                    Data::Int(i) => CellValue::Number(*i as f64),
                    Data::Float(f) if f.fract() == 0.0 => CellValue::Number(*f),
                    Data::Float(f) => CellValue::Text(f.to_string()),
                    Data::String(s) => CellValue::parse(s),
                    Data::Bool(b) => CellValue::Text(b.to_string().to_uppercase()),
                    other => CellValue::Text(other.to_string()),
                };
                sheet.set(row0 + r as u32 + 1, col0 + c as u32 + 1, value);
            }
        }
        sheets.push(sheet);
    }
    Ok(sheets)
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // escaped quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// Detect file type and import it into the workbook
///
/// A CSV file becomes one sheet named after the file stem; an Excel file
/// contributes all of its sheets. Sheets with a name already in the
/// workbook replace it.
///
/// # Returns
/// * `Result<String>` - The name of the last imported sheet
pub fn import_file(book: &mut Spreadsheet, filepath: impl AsRef<Path>) -> Result<String> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let sheets = match extension.as_deref() {
        Some("csv") => {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Sheet1")
                .to_string();
            vec![from_csv(path, &name)?]
        }
        #[cfg(feature = "xlsx")]
        Some("xlsx") | Some("xls") | Some("xlsb") | Some("ods") => from_excel(path)?,
        #[cfg(not(feature = "xlsx"))]
        Some("xlsx") | Some("xls") | Some("xlsb") | Some("ods") => {
            return Err(HeatError::Import(
                "Excel support requires the 'xlsx' feature".into(),
            ));
        }
        Some(ext) => {
            return Err(HeatError::Import(format!("Unsupported file extension: {}", ext)));
        }
        None => return Err(HeatError::Import("File has no extension".into())),
    };

    let mut last = String::new();
    for sheet in sheets {
        info!("imported sheet '{}' ({} rows)", sheet.name(), sheet.last_row());
        last = sheet.name().to_string();
        book.add_sheet(sheet);
    }
    Ok(last)
}
