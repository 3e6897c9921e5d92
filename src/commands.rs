//! Operator commands, the actions a clerk triggers from the menu.
//!
//! Every command runs against an explicit [`Selection`] and comes back as a
//! [`Reply`]: failures are logged and turned into an alert message instead of
//! being propagated.

use crate::announce;
use crate::cell::{Border, CellValue};
use crate::config::Config;
use crate::error::{HeatError, Result};
use crate::events;
use crate::job::{JobScheduler, JobStore};
use crate::lock::SheetLocks;
use crate::ranker::RankAssigner;
use crate::sheet::Sheet;
use crate::splitter::{RowSplitter, SplitOutcome, SplitReport};
use crate::spreadsheet::Spreadsheet;
use crate::status::Status;
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    RerankSwimmers,
    ScratchSwimmer,
    IntentToScratch { last_event: String },
    UnscratchSwimmer,
    ProtectSwimmer,
    MarkTop { places: u32 },
    DrawHeatLine,
    RemoveAllHeatLines,
    SplitEvents,
    CleanupImportedSheet { event_number: Option<String> },
    BreakOutByEvent { lanes: i64 },
    DeleteAllExceptSource,
    UpdateAllSummaryTables { lanes: i64 },
    AnnouncedTime { time: String },
    ShowVersion,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::RerankSwimmers => "rerankSwimmers",
            Command::ScratchSwimmer => "scratchSwimmer",
            Command::IntentToScratch { .. } => "intentToScratch",
            Command::UnscratchSwimmer => "unscratchSwimmer",
            Command::ProtectSwimmer => "protectSwimmer",
            Command::MarkTop { .. } => "markTop",
            Command::DrawHeatLine => "drawHeatLine",
            Command::RemoveAllHeatLines => "removeAllHeatLines",
            Command::SplitEvents => "splitEvents",
            Command::CleanupImportedSheet { .. } => "cleanupImportedSheet",
            Command::BreakOutByEvent { .. } => "breakOutByEvent",
            Command::DeleteAllExceptSource => "deleteAllExceptSource",
            Command::UpdateAllSummaryTables { .. } => "updateAllSummaryTables",
            Command::AnnouncedTime { .. } => "announcedTime",
            Command::ShowVersion => "showVersion",
        }
    }
}

/// The active sheet and the row the cursor is on.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Selection {
    pub sheet: String,
    #[serde(default)]
    pub row: u32,
}

impl Selection {
    pub fn new(sheet: impl Into<String>, row: u32) -> Self {
        Selection {
            sheet: sheet.into(),
            row,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "message")]
pub enum Reply {
    Done(String),
    Alert(String),
}

pub struct CommandRunner<'a> {
    config: &'a Config,
    locks: &'a SheetLocks,
    store: &'a dyn JobStore,
    ranker: RankAssigner,
    splitter: RowSplitter,
}

impl<'a> CommandRunner<'a> {
    pub fn new(config: &'a Config, locks: &'a SheetLocks, store: &'a dyn JobStore) -> Result<Self> {
        Ok(CommandRunner {
            config,
            locks,
            store,
            ranker: RankAssigner::new(config)?,
            splitter: RowSplitter::new(config),
        })
    }

    /// Runs a command and reports the outcome the way the menu shows it.
    pub fn execute(
        &self,
        book: &Mutex<Spreadsheet>,
        command: &Command,
        selection: &Selection,
    ) -> Reply {
        match self.run(book, command, selection) {
            Ok(message) => {
                info!("{} on '{}': {}", command.name(), selection.sheet, message);
                Reply::Done(message)
            }
            Err(e) => {
                error!("[{}] Error: {}", command.name(), e);
                Reply::Alert(format!("[{}] Error: {}", command.name(), e))
            }
        }
    }

    pub fn run(
        &self,
        book: &Mutex<Spreadsheet>,
        command: &Command,
        selection: &Selection,
    ) -> Result<String> {
        match command {
            Command::SplitEvents => {
                let outcome = self.splitter.split_exclusive(book, self.locks, &selection.sheet)?;
                Ok(describe_split(&outcome))
            }
            Command::CleanupImportedSheet { event_number } => {
                self.cleanup_exclusive(book, &selection.sheet, event_number.as_deref())
            }
            Command::BreakOutByEvent { lanes } => {
                let placed = events::break_out_by_event(&mut book.lock(), *lanes, self.config)?;
                Ok(format!("{} event sheets created", placed.len()))
            }
            Command::DeleteAllExceptSource => {
                let deleted = events::delete_all_except_source(&mut book.lock(), self.config)?;
                Ok(format!("{} sheets deleted", deleted.len()))
            }
            Command::UpdateAllSummaryTables { lanes } => {
                let updated =
                    JobScheduler::new(self.config, self.store).drive(&mut book.lock(), *lanes)?;
                Ok(format!("{} summary tables updated", updated))
            }
            Command::ShowVersion => Ok(version()),
            _ => {
                let mut book = book.lock();
                let sheet = book.sheet_mut(&selection.sheet)?;
                self.run_on_sheet(sheet, command, selection.row)
            }
        }
    }

    fn run_on_sheet(&self, sheet: &mut Sheet, command: &Command, row: u32) -> Result<String> {
        match command {
            Command::RerankSwimmers => {
                let report = self.ranker.rerank(sheet)?;
                Ok(format!(
                    "{} ranked, {} ties, {} excluded",
                    report.ranked, report.tie_groups, report.excluded
                ))
            }
            Command::ScratchSwimmer => self.scratch_swimmer(sheet, row).map(|_| "scratched".into()),
            Command::IntentToScratch { last_event } => self
                .intent_to_scratch(sheet, row, last_event)
                .map(|_| "intent to scratch recorded".into()),
            Command::UnscratchSwimmer => {
                self.unscratch_swimmer(sheet, row).map(|_| "unscratched".into())
            }
            Command::ProtectSwimmer => {
                self.protect_swimmer(sheet, row).map(|_| "protected".into())
            }
            Command::MarkTop { places } => self
                .mark_top(sheet, row, *places)
                .map(|_| format!("Top {}", places)),
            Command::DrawHeatLine => {
                self.draw_heat_line(sheet, row).map(|_| "heat line drawn".into())
            }
            Command::RemoveAllHeatLines => {
                sheet.clear_borders();
                Ok("heat lines removed".into())
            }
            Command::AnnouncedTime { time } => {
                let closes =
                    announce::write_announcement(sheet, &self.config.announce_anchor, time)?;
                Ok(format!("closes at {}", closes))
            }
            // workbook-level commands are handled in `run`
            _ => Ok(String::new()),
        }
    }

    fn selected_row(sheet: &Sheet, row: u32) -> Result<u32> {
        if row == 0 || row > sheet.last_row() {
            return Err(HeatError::InvalidSelection { row });
        }
        Ok(row)
    }

    fn is_event_sheet(&self, sheet: &Sheet) -> bool {
        self.ranker.accepts(sheet.name())
    }

    /// Colors the row and writes `label` into its status cell.
    ///
    /// On an event sheet the status column belongs to the row's results
    /// section; on a break-out sheet it is the entry status column.
    fn mark(&self, sheet: &mut Sheet, row: u32, status: Status, label: &str) -> Result<()> {
        let (status_col, width) = if self.is_event_sheet(sheet) {
            let section = self.ranker.section_for_row(sheet, row)?;
            let col = section.columns.status as u32 + 1;
            (col, sheet.last_column().max(col))
        } else {
            let col = self.config.marks.entry_status_column;
            sheet.ensure_columns(col);
            (col, col)
        };
        sheet.set_range_background((row, 1), (1, width), status.color(&self.config.palette));
        sheet.set(row, status_col, label);
        Ok(())
    }

    fn clear_rank_cells(&self, sheet: &mut Sheet, row: u32) {
        for col in 1..=self.config.marks.cleared_columns {
            sheet.set(row, col, CellValue::Empty);
        }
    }

    fn rerank_if_event(&self, sheet: &mut Sheet) -> Result<()> {
        if self.is_event_sheet(sheet) {
            self.ranker.rerank(sheet)?;
        }
        Ok(())
    }

    /// On an event sheet the rank cells are cleared and the sheet reranked;
    /// a break-out sheet only gets the color and a `Scratch` entry status.
    pub fn scratch_swimmer(&self, sheet: &mut Sheet, row: u32) -> Result<()> {
        let row = Self::selected_row(sheet, row)?;
        if !self.is_event_sheet(sheet) {
            return self.mark(sheet, row, Status::Scratch, "Scratch");
        }
        self.clear_rank_cells(sheet, row);
        self.mark(sheet, row, Status::Scratch, Status::Scratch.label())?;
        self.ranker.rerank(sheet).map(|_| ())
    }

    pub fn intent_to_scratch(&self, sheet: &mut Sheet, row: u32, last_event: &str) -> Result<()> {
        let last_event = last_event.trim();
        if last_event.is_empty() || last_event.parse::<f64>().is_err() {
            return Err(HeatError::InvalidEventNumber(last_event.to_string()));
        }
        let row = Self::selected_row(sheet, row)?;
        self.mark(sheet, row, Status::IntentToScratch, &format!("Intent {}", last_event))
    }

    pub fn unscratch_swimmer(&self, sheet: &mut Sheet, row: u32) -> Result<()> {
        let row = Self::selected_row(sheet, row)?;
        if !self.is_event_sheet(sheet) {
            return self.mark(sheet, row, Status::Normal, "");
        }
        self.clear_rank_cells(sheet, row);
        self.mark(sheet, row, Status::Normal, "")?;
        self.ranker.rerank(sheet).map(|_| ())
    }

    pub fn protect_swimmer(&self, sheet: &mut Sheet, row: u32) -> Result<()> {
        let row = Self::selected_row(sheet, row)?;
        self.mark(sheet, row, Status::Protected, Status::Protected.label())?;
        self.rerank_if_event(sheet)
    }

    pub fn mark_top(&self, sheet: &mut Sheet, row: u32, places: u32) -> Result<()> {
        let row = Self::selected_row(sheet, row)?;
        let col = self.config.marks.entry_status_column;
        sheet.ensure_columns(col);
        sheet.set_range_background((row, 1), (1, col), Some(self.config.palette.top.as_str()));
        sheet.set(row, col, format!("Top {}", places));
        Ok(())
    }

    pub fn draw_heat_line(&self, sheet: &mut Sheet, row: u32) -> Result<()> {
        let row = Self::selected_row(sheet, row)?;
        let width = sheet.last_column().max(1);
        sheet.set_border((row, 1), (1, width), Border::Bottom);
        Ok(())
    }

    /// Tidies a freshly imported results sheet and ranks it.
    ///
    /// The title row and blank rows are deleted, heat lines removed, list
    /// cells split, then every section is reranked.
    pub fn cleanup_sheet(&self, sheet: &mut Sheet) -> Result<String> {
        if sheet.last_row() == 0 {
            info!("'{}' is empty; no action taken", sheet.name());
            return Ok("sheet is empty".into());
        }
        if self.config.cleanup.drop_title_row {
            sheet.delete_row(1);
        }

        let width = sheet.last_column();
        let blank: Vec<u32> = (1..=sheet.last_row())
            .filter(|&r| (1..=width).all(|c| sheet.get(r, c).is_blank()))
            .collect();
        for &row in blank.iter().rev() {
            sheet.delete_row(row);
        }
        info!("deleted {} empty rows from '{}'", blank.len(), sheet.name());

        sheet.clear_borders();
        let split = if self.config.cleanup.split_multi_values {
            self.splitter.split(sheet)
        } else {
            SplitReport::default()
        };
        let report = self.ranker.rerank(sheet)?;
        Ok(format!(
            "{} blank rows removed, {} rows split, {} ranked",
            blank.len(),
            split.rows_split,
            report.ranked
        ))
    }

    fn cleanup_exclusive(
        &self,
        book: &Mutex<Spreadsheet>,
        sheet_name: &str,
        event_number: Option<&str>,
    ) -> Result<String> {
        let timeout = self.config.split.lock_timeout();
        let outcome = self.locks.run_exclusive(sheet_name, timeout, || -> Result<String> {
            let mut book = book.lock();
            let name = match event_number.map(str::trim) {
                Some(n) if n.parse::<u32>().is_err() => {
                    return Err(HeatError::InvalidEventNumber(n.to_string()));
                }
                Some(n) => {
                    let renamed = format!("Event {}", n);
                    book.rename_sheet(sheet_name, &renamed)?;
                    renamed
                }
                None => sheet_name.to_string(),
            };
            self.cleanup_sheet(book.sheet_mut(&name)?)
        });
        outcome.unwrap_or_else(|timed_out| {
            warn!("cleanup of '{}' skipped: lock busy for {:?}", sheet_name, timed_out.waited);
            Ok(format!("'{}' is busy, try again", sheet_name))
        })
    }
}

fn describe_split(outcome: &SplitOutcome) -> String {
    match outcome {
        SplitOutcome::Completed(report) => format!(
            "{} rows split, {} data rows now",
            report.rows_split, report.data_rows_after
        ),
        SplitOutcome::LockTimeout { waited_ms } => {
            format!("sheet busy for {} ms, split skipped", waited_ms)
        }
    }
}

pub fn version() -> String {
    format!(
        "Virtual Clerk of Course (VCoC)\n\nVersion: {}\n{}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION")
    )
}
