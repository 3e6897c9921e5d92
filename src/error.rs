use thiserror::Error;

/// Every failure the heat-sheet operations can report.
///
/// Precondition failures are meant to be shown to the operator as an alert;
/// lock contention never reaches this type (see [`crate::splitter::SplitOutcome`]).
#[derive(Debug, Error)]
pub enum HeatError {
    #[error("Active sheet '{name}' is not an 'Event' sheet! Please select a sheet named 'Event X'.")]
    NotEventSheet { name: String },

    #[error("No '{marker}' row found in the active sheet!")]
    MissingMarker { marker: String },

    #[error("No valid time column found after 'Preliminaries' at row {row}")]
    TimeColumnNotFound { row: u32 },

    #[error("Time column {column} found after row {row} has no paired status column")]
    UnmappedTimeColumn { column: usize, row: u32 },

    #[error("Invalid numLanes: {0}. Must be between 1 and 16.")]
    InvalidLaneCount(i64),

    #[error("Sheet \"{0}\" not found.")]
    SheetNotFound(String),

    #[error("A sheet named \"{0}\" already exists.")]
    SheetExists(String),

    #[error("No valid events found in \"{sheet}\"! Expected rows in Column A starting with \"Event \" followed by a number.")]
    NoEventsFound { sheet: String },

    #[error("Too many sheets ({0}). A spreadsheet supports up to 200 tabs.")]
    TooManySheets(usize),

    #[error("No sheets found to update (excluding the source sheet).")]
    NothingToUpdate,

    #[error("Selected row {row} is beyond the last used row.")]
    InvalidSelection { row: u32 },

    #[error("Row {row} is not inside a results section.")]
    RowOutsideSection { row: u32 },

    #[error("Please enter a valid number (got '{0}').")]
    InvalidEventNumber(String),

    #[error("Invalid time format: '{0}'")]
    InvalidTime(String),

    #[error("Invalid cell address: '{0}'")]
    InvalidAddress(String),

    #[error("Invalid or missing email address: '{0}'")]
    InvalidEmail(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Invalid file name: '{0}'. Give a bare name without directories.")]
    InvalidFileName(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid sheet name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Encode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, HeatError>;
