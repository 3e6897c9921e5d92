use serde::{Deserialize, Serialize};
use std::fmt;

/// Loosely typed cell content, the way a spreadsheet host hands it over.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// Formula source including the leading `=`.
    Formula(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Parses raw user input: whole numbers become numbers, `=...` a formula,
    /// blank input an empty cell, anything else text.
    ///
    /// Decimal input such as `30.00` stays text so a recorded time keeps its
    /// written precision.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if trimmed.starts_with('=') {
            return CellValue::Formula(trimmed.to_string());
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return CellValue::Number(n as f64);
        }
        CellValue::Text(raw.to_string())
    }

    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Formula(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum Border {
    #[default]
    None,
    /// Heat divider drawn under a row.
    Bottom,
    /// Boxed cell, used by the summary tables.
    All,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub background: Option<String>,
    pub bold: bool,
    pub border: Border,
}

impl Cell {
    pub fn create(value: CellValue) -> Self {
        Cell {
            value,
            ..Cell::default()
        }
    }

    /// Drops the content but keeps formatting, like "clear contents".
    pub fn clear_content(&mut self) {
        self.value = CellValue::Empty;
    }
}
