use crate::error::{HeatError, Result};
use crate::sheet::Sheet;
use chrono::{Duration, NaiveTime};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;

lazy_static! {
    static ref CLOCK_TIME: Regex = Regex::new(r"(?i)^\s*(\d{1,2}):(\d{2})\s*(AM|PM)\s*$").unwrap();
}

/// Minutes between the announcement and the close of check-in.
pub const CLOSING_MINUTES: i64 = 30;

/// Parses `h:mm AM` / `h:mm PM` text.
pub fn parse_clock(text: &str) -> Result<NaiveTime> {
    let invalid = || HeatError::InvalidTime(text.to_string());
    let caps = CLOCK_TIME.captures(text).ok_or_else(invalid)?;

    let hour: u32 = caps[1].parse().map_err(|_| invalid())?;
    let minute: u32 = caps[2].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }
    let pm = caps[3].eq_ignore_ascii_case("PM");
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour24, minute, 0).ok_or_else(invalid)
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Time check-in closes for an event announced at `announced`.
pub fn closing_time(announced: &str) -> Result<String> {
    let time = parse_clock(announced)?;
    // NaiveTime addition wraps past midnight
    Ok(format_clock(time + Duration::minutes(CLOSING_MINUTES)))
}

/// Writes the announced/read/closes block with its top-left corner at `anchor`.
pub fn write_announcement(sheet: &mut Sheet, anchor: &str, announced: &str) -> Result<String> {
    let closes = closing_time(announced)?;
    let (row, col) = Sheet::parse_cell_name(anchor)
        .ok_or_else(|| HeatError::InvalidAddress(anchor.to_string()))?;

    let read = format_clock(parse_clock(announced)?);
    sheet.set_values(
        row,
        col,
        &[
            vec!["Announced:".into(), "Time".into()],
            vec!["Read:".into(), read.clone().into()],
            vec!["Closes:".into(), closes.clone().into()],
        ],
    );
    sheet.set_bold(row, col, 2);
    info!("'{}': announced {}, closes {}", sheet.name(), read, closes);
    Ok(closes)
}
