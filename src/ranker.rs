use crate::cell::CellValue;
use crate::config::{ColumnDetection, ColumnPair, Config, Palette, RankLayout};
use crate::error::{HeatError, Result};
use crate::sheet::Sheet;
use crate::status::Status;
use log::{error, info};
use regex::Regex;
use serde::Serialize;

static EMPTY_VALUE: CellValue = CellValue::Empty;

fn value_at(values: &[CellValue], offset: usize) -> &CellValue {
    values.get(offset).unwrap_or(&EMPTY_VALUE)
}

/// A run of entry rows following one marker row.
///
/// Row numbers are 1-indexed sheet rows; `end_row` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Section {
    pub marker_row: u32,
    pub first_row: u32,
    pub end_row: u32,
    /// Zero-based offsets of the time and status columns.
    pub columns: ColumnPair,
}

impl Section {
    pub fn contains(&self, row: u32) -> bool {
        row >= self.first_row && row < self.end_row
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RankReport {
    pub sections: usize,
    pub ranked: usize,
    pub tie_groups: usize,
    pub excluded: usize,
}

/// Recomputes standings for every results section of an event sheet.
pub struct RankAssigner {
    layout: RankLayout,
    palette: Palette,
    sheet_name: Regex,
}

struct Pass<'a> {
    sheet: &'a mut Sheet,
    rank_col: u32,
    width: u32,
    report: RankReport,
}

impl RankAssigner {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(RankAssigner {
            layout: config.rank.clone(),
            palette: config.palette.clone(),
            sheet_name: Regex::new(&config.rank.sheet_name_pattern)?,
        })
    }

    pub fn accepts(&self, sheet_name: &str) -> bool {
        self.sheet_name.is_match(sheet_name)
    }

    fn is_marker(&self, row: &[CellValue]) -> bool {
        matches!(row.first(), Some(CellValue::Text(t)) if *t == self.layout.marker)
    }

    /// Finds the time column by scanning the probe rows right-to-left for a
    /// value with a decimal point.
    ///
    /// Any decimal-bearing cell qualifies, so an unrelated number in the
    /// probe rows can misdirect it; configure `ColumnDetection::Explicit`
    /// when the layout is known.
    fn detect_columns(&self, data: &[Vec<CellValue>], marker_idx: usize) -> Result<ColumnPair> {
        let marker_row = marker_idx as u32 + 1;
        if let ColumnDetection::Explicit { time, status } = self.layout.detection {
            return Ok(ColumnPair { time, status });
        }

        let probes = data
            .iter()
            .skip(marker_idx + 1)
            .take(self.layout.probe_rows as usize)
            .take_while(|row| !self.is_marker(row));

        for row in probes {
            let found = row
                .iter()
                .enumerate()
                .rev()
                .find(|(_, value)| !value.is_blank() && value.to_string().contains('.'));
            if let Some((time, _)) = found {
                return self
                    .layout
                    .time_status_pairs
                    .iter()
                    .find(|pair| pair.time == time)
                    .copied()
                    .ok_or(HeatError::UnmappedTimeColumn {
                        column: time,
                        row: marker_row,
                    });
            }
        }
        Err(HeatError::TimeColumnNotFound { row: marker_row })
    }

    /// Locates every section of the used range; fails before anything is written.
    pub fn sections(&self, data: &[Vec<CellValue>]) -> Result<Vec<Section>> {
        let markers: Vec<usize> = data
            .iter()
            .enumerate()
            .filter(|(_, row)| self.is_marker(row))
            .map(|(i, _)| i)
            .collect();

        if markers.is_empty() {
            return Err(HeatError::MissingMarker {
                marker: self.layout.marker.clone(),
            });
        }

        let mut sections = Vec::with_capacity(markers.len());
        for (n, &marker_idx) in markers.iter().enumerate() {
            let end_idx = markers.get(n + 1).copied().unwrap_or(data.len());
            sections.push(Section {
                marker_row: marker_idx as u32 + 1,
                first_row: marker_idx as u32 + 2,
                end_row: end_idx as u32 + 1,
                columns: self.detect_columns(data, marker_idx)?,
            });
        }
        Ok(sections)
    }

    /// The section holding `row`, used when marking a single swimmer.
    pub fn section_for_row(&self, sheet: &Sheet, row: u32) -> Result<Section> {
        self.sections(&sheet.data_values())?
            .into_iter()
            .find(|s| s.contains(row))
            .ok_or(HeatError::RowOutsideSection { row })
    }

    /// Reranks every section of an `Event <n>` sheet in place.
    pub fn rerank(&self, sheet: &mut Sheet) -> Result<RankReport> {
        if !self.accepts(sheet.name()) {
            error!("rerank refused for sheet '{}'", sheet.name());
            return Err(HeatError::NotEventSheet {
                name: sheet.name().to_string(),
            });
        }

        let data = sheet.data_values();
        let sections = self.sections(&data)?;
        let width = sheet.last_column().max(1);

        let mut pass = Pass {
            sheet,
            rank_col: self.layout.rank_column as u32 + 1,
            width,
            report: RankReport::default(),
        };

        for section in &sections {
            self.rank_section(&mut pass, &data, section);
        }
        pass.report.sections = sections.len();

        info!(
            "reranked '{}': {} sections, {} ranked, {} tie groups, {} excluded",
            pass.sheet.name(),
            pass.report.sections,
            pass.report.ranked,
            pass.report.tie_groups,
            pass.report.excluded
        );
        Ok(pass.report)
    }

    fn rank_section(&self, pass: &mut Pass<'_>, data: &[Vec<CellValue>], section: &Section) {
        let mut current_rank = 1;
        let mut last_time: Option<String> = None;
        let mut tied_rows: Vec<u32> = Vec::new();

        for row in section.first_row..section.end_row {
            let values = &data[(row - 1) as usize];
            let time = value_at(values, section.columns.time);
            let status = Status::classify(time, value_at(values, section.columns.status));

            if time.is_blank() || status.is_excluded() {
                if !value_at(values, self.layout.rank_column).is_blank() {
                    pass.sheet.set(row, pass.rank_col, CellValue::Empty);
                }
                if let Some(color) = status.color(&self.palette) {
                    pass.sheet
                        .set_range_background((row, 1), (1, pass.width), Some(color));
                }
                if status.is_excluded() {
                    pass.report.excluded += 1;
                }
                continue;
            }

            let key = time.to_string().trim().to_string();
            if last_time.as_deref() == Some(key.as_str()) {
                tied_rows.push(row);
            } else {
                current_rank = self.flush(pass, &tied_rows, current_rank);
                tied_rows = vec![row];
            }
            last_time = Some(key);
        }

        self.flush(pass, &tied_rows, current_rank);
    }

    /// Writes the pending group and returns the next free rank.
    fn flush(&self, pass: &mut Pass<'_>, rows: &[u32], rank: u32) -> u32 {
        match rows {
            [] => rank,
            [row] => {
                pass.sheet.set(*row, pass.rank_col, rank);
                pass.sheet
                    .set_range_background((*row, 1), (1, pass.width), None);
                pass.report.ranked += 1;
                rank + 1
            }
            tied => {
                for &row in tied {
                    pass.sheet
                        .set(row, pass.rank_col, CellValue::Text(format!("*{}", rank)));
                    pass.sheet.set_range_background(
                        (row, 1),
                        (1, pass.width),
                        Some(self.palette.tie.as_str()),
                    );
                }
                pass.report.ranked += tied.len();
                pass.report.tie_groups += 1;
                rank + tied.len() as u32
            }
        }
    }
}
