//! Heat summary block written beside each event's entries.
//!
//! Nothing is computed here: the block is formula text that the spreadsheet
//! host evaluates when it renders the sheet.

use crate::cell::{Border, CellValue};
use crate::config::{Config, SummaryLayout};
use crate::error::{HeatError, Result};
use crate::sheet::Sheet;
use log::{info, warn};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub lanes: u32,
    pub entered: usize,
    pub scratches: usize,
    pub seeded: usize,
}

pub struct SummaryTablePlacer {
    layout: SummaryLayout,
}

/// One cell of the block, 1-indexed.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}

impl SummaryTablePlacer {
    pub fn new(config: &Config) -> Self {
        SummaryTablePlacer {
            layout: config.summary.clone(),
        }
    }

    pub fn validate_lanes(&self, num_lanes: i64) -> Result<u32> {
        if num_lanes < 1 || num_lanes > self.layout.max_lanes as i64 {
            return Err(HeatError::InvalidLaneCount(num_lanes));
        }
        Ok(num_lanes as u32)
    }

    fn label_col(&self) -> u32 {
        self.layout.start_column
    }

    fn value_col(&self) -> u32 {
        self.layout.start_column + 1
    }

    /// Address of the value cell `offset` rows below the anchor.
    fn k(&self, offset: u32) -> String {
        Sheet::get_cell_name(self.layout.start_row + offset, self.value_col())
    }

    fn j(&self, offset: u32) -> String {
        Sheet::get_cell_name(self.layout.start_row + offset, self.label_col())
    }

    /// Every cell of the block, in write order, for `lanes` lanes.
    pub fn block(&self, lanes: u32) -> Vec<Placement> {
        let l = &self.layout;
        let min = l.min_swimmers_per_heat;

        let lanes_cell = self.k(0);
        let remainder = self.j(1);
        let seeded = self.k(4);
        let heats = self.k(6);
        let circle_heats = Sheet::get_cell_name(l.circle_row + 1, self.value_col());
        let circle_heat1 = Sheet::get_cell_name(l.circle_row + 2, self.value_col());
        let circle_heat2 = Sheet::get_cell_name(l.circle_row + 3, self.value_col());

        let heats_formula = format!(
            "=(IF({s}/{n}<1,0,ROUNDUP({s}/{n},0)))",
            s = seeded,
            n = lanes_cell
        );
        let full_formula = format!(
            "=IF(AND({r}<{min},{r}>0),{h}-2,IF({r}=0,{h},IF({h}-1<0,0,{h}-1)))",
            r = remainder,
            h = heats
        );
        let one_at_formula = format!(
            "=IF(AND({r}<{min},{r}>0),{n}-({min}-{r}),IF({r}=0,\"-\",{r}))",
            r = remainder,
            n = lanes_cell
        );
        let one_at_label = format!("=IF({r}<{min},\"1 @\",\"-\")", r = remainder);
        let partial_formula = format!(
            "=IF(AND({r}<{min},{r}>0),{min},\"-\")",
            r = remainder
        );

        let text = |s: &str| {
            if s.is_empty() {
                CellValue::Empty
            } else if s.starts_with('=') {
                CellValue::Formula(s.to_string())
            } else {
                CellValue::text(s)
            }
        };

        let main: Vec<(CellValue, CellValue)> = vec![
            (text("Lanes"), CellValue::from(lanes)),
            (text(&format!("=MOD({},{})", seeded, lanes_cell)), CellValue::Empty),
            (text("Entered"), text(&format!("=COUNTA({})", l.entered_range))),
            (text("Scratches"), text(&format!("=COUNTA({})", l.scratch_range))),
            (text("Seeded"), text(&format!("=IFERROR({}-{},0)", self.k(2), self.k(3)))),
            (CellValue::Empty, CellValue::Empty),
            (text("HEATS"), text(&heats_formula)),
            (text("FULL"), text(&full_formula)),
            (text("1 @"), text(&one_at_formula)),
            (text(&one_at_label), text(&partial_formula)),
            (CellValue::Empty, CellValue::Empty),
        ];

        let circle: Vec<(CellValue, CellValue)> = vec![
            (text("Circle Seed"), CellValue::Empty),
            (
                text("HEATS"),
                text(&format!(
                    "=IF(AND({s}<{n}*3,{s}>{n}*2),3,ROUNDUP({s}/{n},0))",
                    s = seeded,
                    n = lanes_cell
                )),
            ),
            (
                text("Heat 1"),
                text(&format!("=ROUNDUP({}/{},0)", seeded, circle_heats)),
            ),
            (
                text("Heat 2"),
                text(&format!(
                    "=IF({h}=1,0,ROUND(({s}-L36-0.5)/({h}),0))",
                    h = circle_heats,
                    s = seeded
                )),
            ),
            (
                text("Heat 3"),
                text(&format!(
                    "=ROUNDDOWN(({}-{}-{}),0)",
                    seeded, circle_heat1, circle_heat2
                )),
            ),
            (CellValue::Empty, CellValue::Empty),
        ];

        let timed_final: Vec<(CellValue, CellValue)> = vec![
            (text("Timed Final"), CellValue::Empty),
            (text("HEATS"), text(&heats_formula)),
            (text("FULL"), text(&full_formula)),
            (text("1@"), text(&one_at_formula)),
            (text(&one_at_label), text(&partial_formula)),
        ];

        let mut placements = Vec::new();
        for (start, table) in [
            (l.start_row, main),
            (l.circle_row, circle),
            (l.timed_final_row, timed_final),
        ] {
            for (i, (label, value)) in table.into_iter().enumerate() {
                let row = start + i as u32;
                placements.push(Placement {
                    row,
                    col: self.label_col(),
                    value: label,
                });
                placements.push(Placement {
                    row,
                    col: self.value_col(),
                    value,
                });
            }
        }
        placements
    }

    /// Writes the block into `sheet` and reports the counts it summarizes.
    pub fn place(&self, sheet: &mut Sheet, num_lanes: i64) -> Result<SummaryReport> {
        let lanes = self.validate_lanes(num_lanes)?;
        let l = &self.layout;

        let entered = sheet.count_non_blank(&l.entered_range)?;
        let scratches = sheet.count_non_blank(&l.scratch_range)?;
        let seeded = entered.saturating_sub(scratches);

        match sheet.get(l.start_row, self.value_col()).as_number() {
            Some(existing) if existing > 0.0 && existing as u32 != lanes => {
                info!(
                    "'{}' had {} lanes in {}, replacing with {}",
                    sheet.name(),
                    existing,
                    self.k(0),
                    lanes
                );
            }
            Some(existing) if existing <= 0.0 => {
                warn!("invalid number of lanes in {}: {}", self.k(0), existing);
            }
            _ => {}
        }

        sheet.ensure_columns(6.max(self.value_col()));
        for p in self.block(lanes) {
            sheet.set(p.row, p.col, p.value);
        }

        for row in [l.start_row, l.start_row + 6, l.circle_row, l.timed_final_row] {
            sheet.set_bold(row, self.label_col(), 2);
        }
        for (row, rows) in [
            (l.start_row, 5),
            (l.start_row + 6, 4),
            (l.circle_row, 5),
            (l.timed_final_row, 5),
        ] {
            sheet.set_border((row, self.label_col()), (rows, 2), Border::All);
        }

        info!(
            "summary table on '{}': {} lanes, {} entered, {} scratched, {} seeded",
            sheet.name(),
            lanes,
            entered,
            scratches,
            seeded
        );
        Ok(SummaryReport {
            lanes,
            entered,
            scratches,
            seeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula_at(block: &[Placement], address: &str) -> String {
        let (row, col) = Sheet::parse_cell_name(address).unwrap();
        block
            .iter()
            .find(|p| p.row == row && p.col == col)
            .map(|p| p.value.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn block_matches_the_heat_sheet_layout() {
        let placer = SummaryTablePlacer::new(&Config::default());
        let block = placer.block(8);

        assert_eq!(formula_at(&block, "K4"), "8");
        assert_eq!(formula_at(&block, "J5"), "=MOD(K8,K4)");
        assert_eq!(formula_at(&block, "K6"), "=COUNTA(B3:B1000)");
        assert_eq!(formula_at(&block, "K7"), "=COUNTA(H3:H1000)");
        assert_eq!(formula_at(&block, "K8"), "=IFERROR(K6-K7,0)");
        assert_eq!(formula_at(&block, "K10"), "=(IF(K8/K4<1,0,ROUNDUP(K8/K4,0)))");
        assert_eq!(
            formula_at(&block, "K11"),
            "=IF(AND(J5<3,J5>0),K10-2,IF(J5=0,K10,IF(K10-1<0,0,K10-1)))"
        );
        assert_eq!(
            formula_at(&block, "K12"),
            "=IF(AND(J5<3,J5>0),K4-(3-J5),IF(J5=0,\"-\",J5))"
        );
        assert_eq!(formula_at(&block, "J13"), "=IF(J5<3,\"1 @\",\"-\")");
        assert_eq!(formula_at(&block, "K13"), "=IF(AND(J5<3,J5>0),3,\"-\")");
        assert_eq!(formula_at(&block, "J15"), "Circle Seed");
        assert_eq!(formula_at(&block, "K16"), "=IF(AND(K8<K4*3,K8>K4*2),3,ROUNDUP(K8/K4,0))");
        assert_eq!(formula_at(&block, "K17"), "=ROUNDUP(K8/K16,0)");
        assert_eq!(formula_at(&block, "K18"), "=IF(K16=1,0,ROUND((K8-L36-0.5)/(K16),0))");
        assert_eq!(formula_at(&block, "K19"), "=ROUNDDOWN((K8-K17-K18),0)");
        assert_eq!(formula_at(&block, "J21"), "Timed Final");
        assert_eq!(formula_at(&block, "K22"), "=(IF(K8/K4<1,0,ROUNDUP(K8/K4,0)))");
        assert_eq!(formula_at(&block, "J25"), "=IF(J5<3,\"1 @\",\"-\")");
        assert_eq!(formula_at(&block, "K25"), "=IF(AND(J5<3,J5>0),3,\"-\")");
    }

    #[test]
    fn block_is_deterministic() {
        let placer = SummaryTablePlacer::new(&Config::default());
        assert_eq!(placer.block(6), placer.block(6));
        assert_eq!(placer.block(6).len(), 2 * 22);
    }
}
