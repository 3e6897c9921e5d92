/*!
# Virtual Clerk of Course

Heat-sheet tooling for youth swim meets, built in Rust.

## Overview

A meet runs from a handful of shared spreadsheets: a form-response sheet
that entries arrive in, a source sheet listing every event, one sheet per
event for seeding, and the results sheets that standings are read from.
This crate performs the clerk's edits on those sheets: it splits multi-valued
form responses into one row per entry, reranks results with ties and
status exclusions, and writes the heat summary block beside each event.

## Architecture

### Sheet model
- **cell**: `CellValue` (empty, text, number, formula) plus background, bold and border
- **sheet**: 1-indexed grid with A1 addressing, row insert/delete and range formatting
- **spreadsheet**: an ordered, named collection of sheets (the workbook)

### Operations
- **splitter**: Row Splitter. Comma lists in columns G–J become one row per item,
  run under a per-sheet lock (**lock**) so overlapping submissions cannot interleave
- **ranker**: Rank Assigner. Reranks every `Preliminaries` section of an
  `Event N` sheet; equal times share a `*` rank and the tie color, scratched,
  disqualified and no-show rows are skipped and colored by **status**
- **summary**: Summary Table Placer. Lanes, entered, scratched and seeded
  counts with heat formulas anchored at J4
- **events**: break the source sheet out into one sheet per event
- **job**: resumable refresh of every summary table, sliced by a time budget
- **commands**: the clerk's menu, each command turning failures into an alert
- **announce**: announced and closing time (30 minutes later) block

### Surfaces
- **mailer**: form submission handling and the confirmation e-mail
- **saving**: gzip + bincode persistence (`.bin.gz`)
- **loader** / **downloader**: CSV and Excel import, CSV and colored XLSX export
- **app**: axum endpoints for the form webhook and commands (feature `web`)

## Configuration

Every component takes a [`config::Config`] at construction. The defaults
match the meet's printed heat sheets; a JSON file may override any field.

## REST API Endpoints (feature `web`)

- `POST /api/forms/{sheet}/submit` - Records a form response, splits it and e-mails a confirmation
- `POST /api/commands` - Runs a clerk command against a selection
- `GET /api/sheets` - Lists the sheet names
- `GET /api/sheets/{name}` - Returns the used cells of a sheet
- `POST /api/save` - Persists the workbook
- `GET /api/export` - Downloads the workbook as XLSX
*/

pub mod announce;
pub mod cell;
pub mod commands;
pub mod config;
pub mod downloader;
pub mod error;
pub mod events;
pub mod job;
pub mod loader;
pub mod lock;
pub mod mailer;
pub mod ranker;
pub mod saving;
pub mod sheet;
pub mod splitter;
pub mod spreadsheet;
pub mod status;
pub mod summary;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use cell::{Border, Cell, CellValue};
pub use commands::{Command, CommandRunner, Reply, Selection};
pub use config::Config;
pub use error::{HeatError, Result};
pub use lock::SheetLocks;
pub use ranker::{RankAssigner, RankReport};
pub use sheet::Sheet;
pub use splitter::{RowSplitter, SplitOutcome, SplitReport};
pub use spreadsheet::Spreadsheet;
pub use status::Status;
pub use summary::{SummaryReport, SummaryTablePlacer};
