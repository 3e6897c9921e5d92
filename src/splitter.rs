use crate::cell::CellValue;
use crate::config::{Config, SplitConfig};
use crate::error::Result;
use crate::lock::SheetLocks;
use crate::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use log::{info, warn};
use parking_lot::Mutex;
use serde::Serialize;

/// Expands rows whose flagged columns hold comma-separated lists into one
/// row per list position.
#[derive(Clone, Debug)]
pub struct RowSplitter {
    config: SplitConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitReport {
    pub data_rows_before: usize,
    pub data_rows_after: usize,
    /// Source rows that were expanded into more than one row.
    pub rows_split: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum SplitOutcome {
    Completed(SplitReport),
    /// Another split held the sheet for longer than the lock timeout.
    LockTimeout { waited_ms: u128 },
}

impl RowSplitter {
    pub fn new(config: &Config) -> Self {
        RowSplitter {
            config: config.split.clone(),
        }
    }

    /// Items of a flagged cell, or `None` when the cell is not a real list.
    fn list_items(value: &CellValue) -> Option<Vec<String>> {
        let text = value.as_text()?;
        if !text.contains(',') {
            return None;
        }
        let parts: Vec<String> = text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (parts.len() > 1).then_some(parts)
    }

    /// Expands one data row. A row with no list cells comes back unchanged.
    pub fn split_row(&self, row: &[CellValue]) -> Vec<Vec<CellValue>> {
        let splits: Vec<(usize, Vec<String>)> = self
            .config
            .columns
            .iter()
            .filter_map(|&col| {
                let offset = col.checked_sub(1)? as usize;
                let items = Self::list_items(row.get(offset)?)?;
                Some((offset, items))
            })
            .collect();

        let max_splits = match splits.iter().map(|(_, items)| items.len()).max() {
            Some(n) => n,
            None => return vec![row.to_vec()],
        };

        (0..max_splits)
            .map(|i| {
                let mut new_row = row.to_vec();
                for (offset, items) in &splits {
                    // shorter lists repeat their last item
                    let item = items.get(i).or_else(|| items.last());
                    if let Some(item) = item {
                        new_row[*offset] = CellValue::Text(item.clone());
                    }
                }
                new_row
            })
            .collect()
    }

    /// Expands every data row below the header. The header is never read or written.
    pub fn split_rows(&self, data_rows: &[Vec<CellValue>]) -> (Vec<Vec<CellValue>>, usize) {
        let mut rows_split = 0;
        let mut out = Vec::with_capacity(data_rows.len());
        for row in data_rows {
            let expanded = self.split_row(row);
            if expanded.len() > 1 {
                rows_split += 1;
            }
            out.extend(expanded);
        }
        (out, rows_split)
    }

    fn read_data_rows(&self, sheet: &Sheet) -> Vec<Vec<CellValue>> {
        sheet
            .data_values()
            .into_iter()
            .skip(self.config.header_rows as usize)
            .collect()
    }

    fn write_data_rows(&self, sheet: &mut Sheet, old_rows: usize, rows: &[Vec<CellValue>]) {
        let first_data_row = self.config.header_rows + 1;
        let last_row = self.config.header_rows + old_rows as u32;
        if rows.len() > old_rows {
            sheet.insert_rows_after(last_row, (rows.len() - old_rows) as u32);
        }
        sheet.clear_contents(first_data_row);
        sheet.set_values(first_data_row, 1, rows);
    }

    /// Splits a sheet the caller already holds exclusively.
    pub fn split(&self, sheet: &mut Sheet) -> SplitReport {
        let data_rows = self.read_data_rows(sheet);
        if data_rows.is_empty() {
            info!("'{}' has no data rows yet", sheet.name());
            return SplitReport::default();
        }

        let (new_rows, rows_split) = self.split_rows(&data_rows);
        if rows_split > 0 {
            self.write_data_rows(sheet, data_rows.len(), &new_rows);
        }

        info!(
            "split '{}': {} data rows -> {} ({} expanded)",
            sheet.name(),
            data_rows.len(),
            new_rows.len(),
            rows_split
        );
        SplitReport {
            data_rows_before: data_rows.len(),
            data_rows_after: new_rows.len(),
            rows_split,
        }
    }

    /// Splits a sheet of a shared workbook under the per-sheet lock.
    ///
    /// The workbook mutex is held from the read through the write, so a row
    /// appended by another caller can never land between the two and be
    /// overwritten.
    pub fn split_exclusive(
        &self,
        book: &Mutex<Spreadsheet>,
        locks: &SheetLocks,
        sheet_name: &str,
    ) -> Result<SplitOutcome> {
        let timeout = self.config.lock_timeout();
        let outcome = locks.run_exclusive(sheet_name, timeout, || -> Result<SplitReport> {
            let mut book = book.lock();
            Ok(self.split(book.sheet_mut(sheet_name)?))
        });

        match outcome {
            Ok(report) => report.map(SplitOutcome::Completed),
            Err(timed_out) => {
                warn!(
                    "split of '{}' skipped: lock busy for {:?}",
                    sheet_name, timed_out.waited
                );
                Ok(SplitOutcome::LockTimeout {
                    waited_ms: timed_out.waited.as_millis(),
                })
            }
        }
    }
}
