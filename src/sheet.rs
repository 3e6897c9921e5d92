use crate::cell::{Border, Cell, CellValue};
use crate::error::{HeatError, Result};
use serde::{Deserialize, Serialize};

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// A single grid of cells, addressed 1-indexed by (row, column).
///
/// Cells are stored row-major in one vector, so `(r, c)` lives at
/// `(r - 1) * cols + (c - 1)`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Sheet {
    name: String,
    rows: u32,
    cols: u32,
    cells: Vec<Cell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: u32, cols: u32) -> Self {
        Sheet {
            name: name.into(),
            rows,
            cols,
            cells: vec![Cell::default(); rows as usize * cols as usize],
        }
    }

    /// Builds a sheet from row-major values; ragged rows are padded with empties.
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut sheet = Sheet::new(name, rows.len() as u32, width);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                sheet.set(r as u32 + 1, c as u32 + 1, value);
            }
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn max_rows(&self) -> u32 {
        self.rows
    }

    pub fn max_columns(&self) -> u32 {
        self.cols
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        if row == 0 || col == 0 || row > self.rows || col > self.cols {
            return None;
        }
        Some((row - 1) as usize * self.cols as usize + (col - 1) as usize)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.index(row, col).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.ensure_rows(row);
        self.ensure_columns(col);
        let index = (row - 1) as usize * self.cols as usize + (col - 1) as usize;
        &mut self.cells[index]
    }

    /// Value at (row, col); anything outside the grid reads as empty.
    pub fn get(&self, row: u32, col: u32) -> &CellValue {
        self.cell(row, col).map_or(&EMPTY_VALUE, |c| &c.value)
    }

    /// Writes a value, growing the grid when the target lies outside it.
    pub fn set(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        if row == 0 || col == 0 {
            return;
        }
        self.cell_mut(row, col).value = value.into();
    }

    pub fn get_a1(&self, address: &str) -> Result<&CellValue> {
        let (row, col) = Self::parse_cell_name(address)
            .ok_or_else(|| HeatError::InvalidAddress(address.to_string()))?;
        Ok(self.get(row, col))
    }

    pub fn set_a1(&mut self, address: &str, value: impl Into<CellValue>) -> Result<()> {
        let (row, col) = Self::parse_cell_name(address)
            .ok_or_else(|| HeatError::InvalidAddress(address.to_string()))?;
        self.set(row, col, value);
        Ok(())
    }

    pub fn background(&self, row: u32, col: u32) -> Option<&str> {
        self.cell(row, col).and_then(|c| c.background.as_deref())
    }

    /// Last row holding any content, 0 for an empty sheet.
    pub fn last_row(&self) -> u32 {
        (1..=self.rows)
            .rev()
            .find(|&r| (1..=self.cols).any(|c| *self.get(r, c) != CellValue::Empty))
            .unwrap_or(0)
    }

    /// Last column holding any content, 0 for an empty sheet.
    pub fn last_column(&self) -> u32 {
        (1..=self.cols)
            .rev()
            .find(|&c| (1..=self.rows).any(|r| *self.get(r, c) != CellValue::Empty))
            .unwrap_or(0)
    }

    pub fn row_values(&self, row: u32) -> Vec<CellValue> {
        (1..=self.last_column())
            .map(|c| self.get(row, c).clone())
            .collect()
    }

    /// The used range, `last_row` rows by `last_column` columns.
    pub fn data_values(&self) -> Vec<Vec<CellValue>> {
        let last_col = self.last_column();
        (1..=self.last_row())
            .map(|r| (1..=last_col).map(|c| self.get(r, c).clone()).collect())
            .collect()
    }

    pub fn ensure_rows(&mut self, rows: u32) {
        if rows > self.rows {
            self.cells
                .resize((rows as usize) * self.cols as usize, Cell::default());
            self.rows = rows;
        }
    }

    pub fn ensure_columns(&mut self, cols: u32) {
        if cols <= self.cols {
            return;
        }
        let mut cells = Vec::with_capacity(self.rows as usize * cols as usize);
        for r in 0..self.rows as usize {
            let start = r * self.cols as usize;
            cells.extend_from_slice(&self.cells[start..start + self.cols as usize]);
            cells.extend(std::iter::repeat_n(
                Cell::default(),
                (cols - self.cols) as usize,
            ));
        }
        self.cells = cells;
        self.cols = cols;
    }

    /// Inserts `count` blank rows below `after` (0 inserts at the top).
    pub fn insert_rows_after(&mut self, after: u32, count: u32) {
        let after = after.min(self.rows);
        let at = after as usize * self.cols as usize;
        let blank = std::iter::repeat_n(Cell::default(), count as usize * self.cols as usize);
        self.cells.splice(at..at, blank);
        self.rows += count;
    }

    pub fn delete_row(&mut self, row: u32) {
        if row == 0 || row > self.rows {
            return;
        }
        let start = (row - 1) as usize * self.cols as usize;
        self.cells.drain(start..start + self.cols as usize);
        self.rows -= 1;
    }

    /// Clears the content (not formatting) of every row from `from_row` down.
    pub fn clear_contents(&mut self, from_row: u32) {
        for r in from_row.max(1)..=self.rows {
            for c in 1..=self.cols {
                self.cell_mut(r, c).clear_content();
            }
        }
    }

    /// Writes a rectangular block with its top-left corner at (row, col).
    pub fn set_values(&mut self, row: u32, col: u32, block: &[Vec<CellValue>]) {
        for (dr, values) in block.iter().enumerate() {
            for (dc, value) in values.iter().enumerate() {
                self.set(row + dr as u32, col + dc as u32, value.clone());
            }
        }
    }

    pub fn set_background(&mut self, row: u32, col: u32, color: Option<&str>) {
        if row == 0 || col == 0 {
            return;
        }
        self.cell_mut(row, col).background = color.map(str::to_string);
    }

    pub fn set_range_background(
        &mut self,
        (row, col): (u32, u32),
        (num_rows, num_cols): (u32, u32),
        color: Option<&str>,
    ) {
        for r in row..row + num_rows {
            for c in col..col + num_cols {
                self.set_background(r, c, color);
            }
        }
    }

    /// Colors columns 1..=last_column of a row; `None` clears the color.
    pub fn set_row_background(&mut self, row: u32, color: Option<&str>) {
        let width = self.last_column().max(1);
        self.set_range_background((row, 1), (1, width), color);
    }

    pub fn set_bold(&mut self, row: u32, col: u32, num_cols: u32) {
        for c in col..col + num_cols {
            self.cell_mut(row, c).bold = true;
        }
    }

    pub fn set_border(
        &mut self,
        (row, col): (u32, u32),
        (num_rows, num_cols): (u32, u32),
        border: Border,
    ) {
        for r in row..row + num_rows {
            for c in col..col + num_cols {
                self.cell_mut(r, c).border = border;
            }
        }
    }

    pub fn clear_borders(&mut self) {
        for cell in &mut self.cells {
            cell.border = Border::None;
        }
    }

    /// Drops all content and formatting, keeping the grid size.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::default();
        }
    }

    pub fn col_to_letter(col: u32) -> String {
        let mut col = col;
        let mut result = String::new();
        while col > 0 {
            col -= 1;
            result.push(((col % 26) as u8 + b'A') as char);
            col /= 26;
        }
        result.chars().rev().collect()
    }

    pub fn letter_to_col(letters: &str) -> u32 {
        letters
            .chars()
            .fold(0, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
    }

    pub fn get_cell_name(row: u32, col: u32) -> String {
        format!("{}{}", Self::col_to_letter(col), row)
    }

    /// Parses an A1-style address into (row, col).
    pub fn parse_cell_name(cell_name: &str) -> Option<(u32, u32)> {
        let mut letters = String::new();
        let mut digits = String::new();

        for c in cell_name.trim().chars() {
            if c.is_ascii_alphabetic() {
                if !digits.is_empty() {
                    return None;
                }
                letters.push(c);
            } else if c.is_ascii_digit() {
                digits.push(c);
            } else {
                return None;
            }
        }

        if letters.is_empty() || digits.is_empty() {
            return None;
        }

        let row = digits.parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }
        Some((row, Self::letter_to_col(&letters)))
    }

    /// Parses `B3:B1000` into its two corners.
    pub fn parse_range(range: &str) -> Option<((u32, u32), (u32, u32))> {
        let (start, end) = range.split_once(':')?;
        Some((Self::parse_cell_name(start)?, Self::parse_cell_name(end)?))
    }

    /// Counts non-blank cells inside an A1 range, like `COUNTA`.
    pub fn count_non_blank(&self, range: &str) -> Result<usize> {
        let ((r1, c1), (r2, c2)) =
            Self::parse_range(range).ok_or_else(|| HeatError::InvalidAddress(range.to_string()))?;
        let mut count = 0;
        for r in r1..=r2.min(self.rows) {
            for c in c1..=c2.min(self.cols) {
                if !self.get(r, c).is_blank() {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip_through_names() {
        assert_eq!(Sheet::col_to_letter(1), "A");
        assert_eq!(Sheet::col_to_letter(27), "AA");
        assert_eq!(Sheet::col_to_letter(37), "AK");
        assert_eq!(Sheet::letter_to_col("K"), 11);
        assert_eq!(Sheet::parse_cell_name("K4"), Some((4, 11)));
        assert_eq!(Sheet::parse_cell_name("4K"), None);
        assert_eq!(Sheet::parse_cell_name("A0"), None);
    }

    #[test]
    fn growing_columns_keeps_existing_cells_in_place() {
        let mut sheet = Sheet::new("s", 2, 2);
        sheet.set(1, 2, "b1");
        sheet.set(2, 1, "a2");
        sheet.ensure_columns(5);
        assert_eq!(sheet.get(1, 2), &CellValue::text("b1"));
        assert_eq!(sheet.get(2, 1), &CellValue::text("a2"));
        assert_eq!(sheet.max_columns(), 5);
    }

    #[test]
    fn inserting_and_deleting_rows_shifts_content() {
        let mut sheet = Sheet::from_rows(
            "s",
            vec![vec!["a".into()], vec!["b".into()], vec!["c".into()]],
        );
        sheet.insert_rows_after(1, 2);
        assert_eq!(sheet.max_rows(), 5);
        assert_eq!(sheet.get(4, 1), &CellValue::text("b"));
        sheet.delete_row(2);
        sheet.delete_row(2);
        assert_eq!(sheet.get(2, 1), &CellValue::text("b"));
        assert_eq!(sheet.last_row(), 3);
    }
}
