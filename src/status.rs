use crate::cell::CellValue;
use crate::config::Palette;
use serde::{Deserialize, Serialize};

/// Standing of one entry row. Only `Normal` rows are ranked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Normal,
    Scratch,
    IntentToScratch,
    Protected,
    Dq,
    Dnf,
    Ns,
    Dfs,
}

impl Status {
    /// Classifies a row from its time cell and its status cell.
    ///
    /// Result codes written in place of a time win over the status column.
    pub fn classify(time: &CellValue, status: &CellValue) -> Status {
        if let Some(from_time) = Self::from_code(&normalize(time)) {
            return from_time;
        }
        let status = normalize(status);
        if status == "SCR" || status == "SCRATCH" {
            Status::Scratch
        } else if status.starts_with("INTENT") {
            Status::IntentToScratch
        } else if status.starts_with("PROTECTED") {
            Status::Protected
        } else {
            Self::from_code(&status).unwrap_or(Status::Normal)
        }
    }

    fn from_code(code: &str) -> Option<Status> {
        match code {
            "DQ" => Some(Status::Dq),
            "DNF" => Some(Status::Dnf),
            "NS" => Some(Status::Ns),
            "DFS" => Some(Status::Dfs),
            _ => None,
        }
    }

    pub fn is_excluded(self) -> bool {
        self != Status::Normal
    }

    /// Background color for this status; `Normal` has none.
    pub fn color(self, palette: &Palette) -> Option<&str> {
        match self {
            Status::Normal => None,
            Status::Scratch => Some(palette.scratch.as_str()),
            Status::IntentToScratch => Some(palette.intent.as_str()),
            Status::Protected => Some(palette.protected.as_str()),
            Status::Dq | Status::Dnf => Some(palette.dq.as_str()),
            Status::Ns => Some(palette.ns.as_str()),
            Status::Dfs => Some(palette.dfs.as_str()),
        }
    }

    /// Text written into the status column when an operator marks a row.
    pub fn label(self) -> &'static str {
        match self {
            Status::Normal => "",
            Status::Scratch => "Scr",
            Status::IntentToScratch => "Intent",
            Status::Protected => "Protected",
            Status::Dq => "DQ",
            Status::Dnf => "DNF",
            Status::Ns => "NS",
            Status::Dfs => "DFS",
        }
    }
}

fn normalize(value: &CellValue) -> String {
    value.to_string().trim().to_uppercase()
}
