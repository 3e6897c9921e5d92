//! Splits a meet-wide entry list into one sheet per event.

use crate::cell::CellValue;
use crate::config::Config;
use crate::error::{HeatError, Result};
use crate::spreadsheet::Spreadsheet;
use crate::summary::{SummaryReport, SummaryTablePlacer};
use lazy_static::lazy_static;
use log::{error, info};
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref EVENT_HEADING: Regex = Regex::new(r"(?i)^Event\s*(\d+)\b").unwrap();
}

/// Rows of the source sheet belonging to one event, heading row first.
#[derive(Clone, Debug, PartialEq)]
pub struct EventGroup {
    /// Normalised heading, e.g. `Event 12`.
    pub name: String,
    pub number: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Groups the used range into events.
///
/// Blank rows are dropped and rows before the first heading are ignored.
/// A repeated event number drops only the heading row; the rows under it
/// stay with the event before it.
pub fn parse_events(data: &[Vec<CellValue>]) -> Vec<EventGroup> {
    let mut events: Vec<EventGroup> = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<EventGroup> = None;

    for (i, row) in data.iter().enumerate() {
        if row.iter().all(CellValue::is_blank) {
            continue;
        }

        let first = row.first().map(|v| v.to_string()).unwrap_or_default();
        if let Some(caps) = EVENT_HEADING.captures(first.trim()) {
            let number = caps[1].to_string();
            if !seen.insert(number.clone()) {
                info!("skipping duplicate event at row {}: {}", i + 1, first.trim());
                continue;
            }
            if let Some(done) = current.take() {
                events.push(done);
            }
            current = Some(EventGroup {
                name: format!("Event {}", number),
                number,
                rows: vec![row.clone()],
            });
            continue;
        }

        if let Some(event) = current.as_mut() {
            event.rows.push(row.clone());
        }
    }

    events.extend(current);
    events
}

fn padded_width(rows: &[Vec<CellValue>]) -> usize {
    rows.iter()
        .map(|row| {
            row.iter()
                .rposition(|v| !v.is_blank())
                .map_or(0, |i| i + 1)
        })
        .max()
        .unwrap_or(0)
}

/// Writes every event of the source sheet into its own sheet, named by the
/// event number, and places a summary table on each.
pub fn break_out_by_event(
    book: &mut Spreadsheet,
    num_lanes: i64,
    config: &Config,
) -> Result<Vec<(String, SummaryReport)>> {
    let placer = SummaryTablePlacer::new(config);
    placer.validate_lanes(num_lanes)?;

    let source = book.sheet(&config.source_sheet_name).inspect_err(|_| {
        error!("source sheet '{}' not found", config.source_sheet_name);
    })?;
    let events = parse_events(&source.data_values());
    if events.is_empty() {
        error!("no events in '{}'", config.source_sheet_name);
        return Err(HeatError::NoEventsFound {
            sheet: config.source_sheet_name.clone(),
        });
    }

    let mut placed = Vec::with_capacity(events.len());
    for event in events {
        let width = padded_width(&event.rows);
        let rows: Vec<Vec<CellValue>> = event
            .rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        let sheet = book.insert_sheet(&event.number);
        sheet.clear();
        sheet.ensure_columns(6.max(width as u32));
        sheet.set_values(1, 1, &rows);

        let report = placer.place(sheet, num_lanes)?;
        info!("{} -> sheet '{}' ({} rows)", event.name, event.number, rows.len());
        placed.push((event.number, report));
    }

    info!("broke out {} events", placed.len());
    Ok(placed)
}

/// Deletes every sheet but the source sheet, returning the deleted names.
pub fn delete_all_except_source(book: &mut Spreadsheet, config: &Config) -> Result<Vec<String>> {
    let source = &config.source_sheet_name;
    if book.position(source).is_none() {
        error!("source sheet '{}' not found", source);
        return Err(HeatError::SheetNotFound(source.clone()));
    }
    if book.sheets.len() <= 1 {
        info!("only '{}' exists, nothing to delete", source);
        return Ok(Vec::new());
    }

    let doomed: Vec<String> = book
        .sheet_names()
        .into_iter()
        .filter(|name| name != source)
        .collect();
    for name in &doomed {
        book.delete_sheet(name)?;
    }
    info!("deleted {} sheets", doomed.len());
    Ok(doomed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::parse(c)).collect()
    }

    #[test]
    fn headings_are_normalised_and_duplicates_skipped() {
        let data = vec![
            row(&["Meet title"]),
            row(&["event   3 Girls 50 Free"]),
            row(&["", "Ann", "10"]),
            row(&["", "", ""]),
            row(&["Event 4 Boys 50 Free"]),
            row(&["", "Bob", "11"]),
            row(&["Event 3 again"]),
            row(&["", "Cal", "12"]),
        ];
        let events = parse_events(&data);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "Event 3");
        assert_eq!(events[0].rows.len(), 2);
        assert_eq!(events[1].number, "4");
        assert_eq!(events[1].rows.len(), 3);
    }

    #[test]
    fn width_ignores_trailing_blanks() {
        let rows = vec![row(&["a", "", "c", ""]), row(&["a"])];
        assert_eq!(padded_width(&rows), 3);
    }
}
