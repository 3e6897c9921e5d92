//! Immutable configuration handed to every component at construction.
//!
//! Defaults reproduce the layout of the meet's heat sheets; a JSON file can
//! override any subset of fields.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub source_sheet_name: String,
    pub palette: Palette,
    pub rank: RankLayout,
    pub split: SplitConfig,
    pub summary: SummaryLayout,
    pub job: JobConfig,
    pub marks: MarkConfig,
    /// Top-left cell of the announced/closing time block.
    pub announce_anchor: String,
    pub cleanup: CleanupConfig,
    pub mail: MailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_sheet_name: "Sheet1".to_string(),
            palette: Palette::default(),
            rank: RankLayout::default(),
            split: SplitConfig::default(),
            summary: SummaryLayout::default(),
            job: JobConfig::default(),
            marks: MarkConfig::default(),
            announce_anchor: "AK1".to_string(),
            cleanup: CleanupConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Row background colors. These must match the printed heat sheets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Palette {
    pub scratch: String,
    pub intent: String,
    pub protected: String,
    pub dq: String,
    pub ns: String,
    pub dfs: String,
    pub tie: String,
    pub top: String,
    pub circle: String,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            scratch: "#FFFF00".to_string(),   // yellow
            intent: "#00FFFF".to_string(),    // cyan
            protected: "#9ACD32".to_string(), // yellow-green
            dq: "#FFC0CB".to_string(),        // pink, DQ and DNF
            ns: "#90EE90".to_string(),        // light green
            dfs: "#FFA500".to_string(),       // orange
            tie: "#FF66FF".to_string(),       // magenta
            top: "#B7E1CD".to_string(),
            circle: "#92D050".to_string(),
        }
    }
}

/// How the time and status columns of a results section are found.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ColumnDetection {
    /// Scan the rows after the marker right-to-left for a value containing a
    /// decimal point and pair it through `time_status_pairs`.
    Heuristic,
    /// Zero-based offsets used for every section.
    Explicit { time: usize, status: usize },
}

/// Zero-based offset of a time column and the status column that goes with it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnPair {
    pub time: usize,
    pub status: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RankLayout {
    pub marker: String,
    /// Sheets the ranker accepts, matched against the whole name.
    pub sheet_name_pattern: String,
    /// Zero-based offset of the rank column.
    pub rank_column: usize,
    /// How many rows after a marker are probed for a time value.
    pub probe_rows: u32,
    pub detection: ColumnDetection,
    pub time_status_pairs: Vec<ColumnPair>,
}

impl Default for RankLayout {
    fn default() -> Self {
        RankLayout {
            marker: "Preliminaries".to_string(),
            sheet_name_pattern: r"^Event \d+$".to_string(),
            rank_column: 0,
            probe_rows: 2,
            detection: ColumnDetection::Heuristic,
            time_status_pairs: vec![
                ColumnPair { time: 40, status: 47 },
                ColumnPair { time: 25, status: 33 },
                ColumnPair { time: 35, status: 43 },
            ],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    pub header_rows: u32,
    /// 1-indexed columns whose comma lists are split (G, H, I, J).
    pub columns: Vec<u32>,
    pub lock_timeout_ms: u64,
    /// Pause before splitting a sheet that a form submission just wrote to.
    pub settle_delay_ms: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            header_rows: 1,
            columns: vec![7, 8, 9, 10],
            lock_timeout_ms: 30_000,
            settle_delay_ms: 2_000,
        }
    }
}

impl SplitConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummaryLayout {
    pub start_row: u32,
    pub start_column: u32,
    pub circle_row: u32,
    pub timed_final_row: u32,
    pub min_swimmers_per_heat: u32,
    pub max_lanes: u32,
    pub entered_range: String,
    pub scratch_range: String,
}

impl Default for SummaryLayout {
    fn default() -> Self {
        SummaryLayout {
            start_row: 4,
            start_column: 10,
            circle_row: 15,
            timed_final_row: 21,
            min_swimmers_per_heat: 3,
            max_lanes: 16,
            entered_range: "B3:B1000".to_string(),
            scratch_range: "H3:H1000".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobConfig {
    pub slice_budget_ms: u64,
    pub max_sheets: usize,
    pub store_dir: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            slice_budget_ms: 300_000,
            max_sheets: 200,
            store_dir: ".vcoc-jobs".to_string(),
        }
    }
}

impl JobConfig {
    pub fn slice_budget(&self) -> Duration {
        Duration::from_millis(self.slice_budget_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkConfig {
    /// Leading columns cleared when a swimmer is scratched or unscratched.
    pub cleared_columns: u32,
    /// Status column of break-out sheets (H).
    pub entry_status_column: u32,
}

impl Default for MarkConfig {
    fn default() -> Self {
        MarkConfig {
            cleared_columns: 2,
            entry_status_column: 8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanupConfig {
    pub drop_title_row: bool,
    pub split_multi_values: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            drop_title_row: true,
            split_multi_values: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub from: String,
    pub subject: String,
    /// Title of the form question that carries the respondent's address.
    pub email_question: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        MailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 465,
            username: String::new(),
            from: "Clerk of Course <clerk@localhost>".to_string(),
            subject: "Your Form Submission Responses".to_string(),
            email_question: "Email".to_string(),
        }
    }
}
