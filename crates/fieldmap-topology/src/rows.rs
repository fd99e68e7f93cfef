//! Row assembly from row codes.
//!
//! Two labeling schemes are supported. With [`RowLabeling::RowNumber`] every
//! row code carries its row number and the two codes of a row share it; the
//! planting direction comes from a [`RowDirectionTable`]. With
//! [`RowLabeling::PassName`] the codes carry a pass number, a start/end
//! marker (`St`/`En` at characters 3..5) and a side (`L`/`R`, last
//! character); the direction follows from which code the planter met first.

use std::collections::BTreeMap;

use fieldmap_core::{orient_pair, Code, PairOrder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::builder::TopologyReport;
use crate::error::TopologyError;
use crate::topology::{FieldPass, Row, RowDirection, RowId};

/// How row codes are labeled in the field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLabeling {
    #[default]
    RowNumber,
    PassName,
}

/// Inclusive range of row numbers planted as one section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSection {
    pub first: u32,
    pub last: u32,
}

/// Up/back assignment for row-number labeling.
///
/// Inside each section, rows repeat with period `stride`; the first half of
/// every period runs up, the second half runs back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowDirectionTable {
    pub sections: Vec<RowSection>,
    pub stride: u32,
}

impl Default for RowDirectionTable {
    fn default() -> Self {
        Self {
            sections: vec![
                RowSection { first: 1, last: 22 },
                RowSection { first: 23, last: 58 },
            ],
            stride: 4,
        }
    }
}

impl RowDirectionTable {
    pub fn direction(&self, row: u32) -> Option<RowDirection> {
        if self.stride == 0 {
            return None;
        }
        let section = self
            .sections
            .iter()
            .find(|s| row >= s.first && row <= s.last)?;
        let offset = (row - section.first) % self.stride;
        if offset < self.stride / 2 {
            Some(RowDirection::Up)
        } else {
            Some(RowDirection::Back)
        }
    }
}

/// Settings shared by both labeling schemes.
#[derive(Clone, Debug)]
pub(crate) struct RowAssembly<'a> {
    pub field_direction_deg: f64,
    pub tolerance_deg: f64,
    pub table: &'a RowDirectionTable,
}

/// Rows and passes in arena order.
#[derive(Debug, Default)]
pub(crate) struct AssembledRows {
    pub rows: Vec<Row>,
    pub passes: Vec<FieldPass>,
}

/// Order two codes along the field direction.
pub(crate) fn orient_codes(
    a: Code,
    b: Code,
    field_direction_deg: f64,
    tolerance_deg: f64,
) -> Result<(Code, Code, PairOrder), TopologyError> {
    match orient_pair(
        a.position.xy(),
        b.position.xy(),
        field_direction_deg,
        tolerance_deg,
    ) {
        Some(PairOrder::AsGiven) => Ok((a, b, PairOrder::AsGiven)),
        Some(PairOrder::Swapped) => Ok((b, a, PairOrder::Swapped)),
        None => Err(TopologyError::Orientation {
            first: a.name,
            second: b.name,
        }),
    }
}

/// Row-number labeling: two codes per number, directions from the table,
/// passes are consecutive pairs of rows.
pub(crate) fn assemble_by_row_number(
    codes: Vec<Code>,
    cfg: &RowAssembly<'_>,
    report: &mut TopologyReport,
) -> AssembledRows {
    let mut by_number: BTreeMap<u32, Vec<Code>> = BTreeMap::new();
    for code in codes {
        match code.row {
            Some(n) => by_number.entry(n).or_default().push(code),
            None => warn!("row code '{}' carries no row number", code.name),
        }
    }
    if let (Some(first), Some(last)) = (by_number.keys().next(), by_number.keys().next_back()) {
        let missing: Vec<u32> = (*first..=*last)
            .filter(|n| !by_number.contains_key(n))
            .collect();
        info!("found rows {first} to {last}");
        if !missing.is_empty() {
            info!("missing row numbers {missing:?}");
        }
    }

    let mut rows = Vec::new();
    for (number, codes) in by_number {
        let count = codes.len();
        let Ok([a, b]) = <[Code; 2]>::try_from(codes) else {
            report.record(&TopologyError::RowCodeCount { row: number, count });
            continue;
        };
        let (start, end, _) = match orient_codes(a, b, cfg.field_direction_deg, cfg.tolerance_deg)
        {
            Ok(oriented) => oriented,
            Err(err) => {
                report.record(&err);
                continue;
            }
        };
        let Some(direction) = cfg.table.direction(number) else {
            report.record(&TopologyError::UncoveredRow { row: number });
            continue;
        };
        rows.push(Row {
            number,
            pass: 0,
            start,
            end,
            direction,
            segments: Vec::new(),
        });
    }

    let mut passes = Vec::with_capacity(rows.len().div_ceil(2));
    for (i, chunk) in (0..rows.len()).collect::<Vec<_>>().chunks(2).enumerate() {
        let number = i as u32 + 1;
        for &r in chunk {
            rows[r].pass = number;
        }
        passes.push(FieldPass {
            number,
            rows: chunk.iter().copied().map(RowId).collect(),
        });
    }

    AssembledRows { rows, passes }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassEnd {
    Start,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
}

fn pass_end(name: &str) -> Option<PassEnd> {
    match name.get(3..5)?.to_ascii_lowercase().as_str() {
        "st" => Some(PassEnd::Start),
        "en" => Some(PassEnd::End),
        _ => None,
    }
}

fn side(name: &str) -> Option<Side> {
    match name.chars().last()?.to_ascii_lowercase() {
        'l' => Some(Side::Left),
        'r' => Some(Side::Right),
        _ => None,
    }
}

/// Pair the codes sharing one pass number and side into `(pass start, pass end)`.
fn pair_pass_codes(pass: u32, codes: Vec<Code>) -> Result<Option<(Code, Code)>, TopologyError> {
    let count = codes.len();
    let names = || {
        codes
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    if pass == 0 {
        return Err(TopologyError::Pairing {
            pass,
            reason: format!("pass numbers start at 1: {}", names()),
        });
    }
    if count > 2 {
        return Err(TopologyError::Pairing {
            pass,
            reason: format!("multiple matches among codes {}", names()),
        });
    }
    let Ok([a, b]) = <[Code; 2]>::try_from(codes) else {
        return Ok(None);
    };
    match (pass_end(&a.name), pass_end(&b.name)) {
        (Some(PassEnd::Start), Some(PassEnd::End)) => Ok(Some((a, b))),
        (Some(PassEnd::End), Some(PassEnd::Start)) => Ok(Some((b, a))),
        (Some(x), Some(y)) if x == y => Err(TopologyError::Pairing {
            pass,
            reason: format!("duplicate pass codes {} and {}", a.name, b.name),
        }),
        _ => Err(TopologyError::Pairing {
            pass,
            reason: format!(
                "bad pass code format, expected one 'St' and one 'En': {} and {}",
                a.name, b.name
            ),
        }),
    }
}

/// Pass-name labeling: pair codes by pass and side, infer direction and
/// convert pass numbers to row numbers.
pub(crate) fn assemble_by_pass_name(
    codes: Vec<Code>,
    cfg: &RowAssembly<'_>,
    report: &mut TopologyReport,
) -> AssembledRows {
    let mut keyed: BTreeMap<(u32, Side), Vec<Code>> = BTreeMap::new();
    for code in codes {
        match (code.row, side(&code.name)) {
            (Some(pass), Some(s)) => keyed.entry((pass, s)).or_default().push(code),
            _ => {
                warn!("row code '{}' is not a pass code", code.name);
                report.unpaired_codes += 1;
            }
        }
    }

    let mut by_pass: BTreeMap<u32, Vec<Row>> = BTreeMap::new();
    for ((pass, s), codes) in keyed {
        let (pass_start, pass_end) = match pair_pass_codes(pass, codes) {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                warn!("couldn't find a match for pass {pass} side {s:?}");
                report.unpaired_codes += 1;
                continue;
            }
            Err(err) => {
                report.record(&err);
                continue;
            }
        };
        let (mut start, mut end, order) = match orient_codes(
            pass_start,
            pass_end,
            cfg.field_direction_deg,
            cfg.tolerance_deg,
        ) {
            Ok(oriented) => oriented,
            Err(err) => {
                report.record(&err);
                continue;
            }
        };
        let direction = match order {
            PairOrder::AsGiven => RowDirection::Up,
            PairOrder::Swapped => RowDirection::Back,
        };
        let shifted = matches!(
            (s, direction),
            (Side::Right, RowDirection::Up) | (Side::Left, RowDirection::Back)
        );
        let number = 2 * pass - 1 + u32::from(shifted);
        start.row = Some(number);
        end.row = Some(number);
        debug!("pass {pass} side {s:?} -> row {number} ({direction:?})");
        by_pass.entry(pass).or_default().push(Row {
            number,
            pass,
            start,
            end,
            direction,
            segments: Vec::new(),
        });
    }

    let mut out = AssembledRows::default();
    for (pass, mut rows) in by_pass {
        if rows.len() > 2 {
            report.record(&TopologyError::PassTooLarge {
                pass,
                count: rows.len(),
            });
            continue;
        }
        if rows.len() == 1 {
            info!("only 1 row found in pass {pass}");
        }
        rows.sort_by_key(|r| r.number);
        let first = out.rows.len();
        let ids = (first..first + rows.len()).map(RowId).collect();
        out.rows.extend(rows);
        out.passes.push(FieldPass { number: pass, rows: ids });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldmap_core::CodeKind;
    use nalgebra::Point3;

    fn row_code(name: &str, row: u32, x: f64, y: f64) -> Code {
        Code {
            kind: CodeKind::Row,
            name: name.into(),
            position: Point3::new(x, y, 0.0),
            item: None,
            row: Some(row),
        }
    }

    fn cfg(table: &RowDirectionTable) -> RowAssembly<'_> {
        RowAssembly {
            field_direction_deg: 90.0,
            tolerance_deg: 45.0,
            table,
        }
    }

    #[test]
    fn default_direction_table_matches_double_planter() {
        let t = RowDirectionTable::default();
        let up: Vec<u32> = (1..=58)
            .filter(|&n| t.direction(n) == Some(RowDirection::Up))
            .collect();
        assert_eq!(&up[..6], &[1, 2, 5, 6, 9, 10]);
        assert_eq!(t.direction(22), Some(RowDirection::Up));
        assert_eq!(t.direction(23), Some(RowDirection::Up));
        assert_eq!(t.direction(24), Some(RowDirection::Up));
        assert_eq!(t.direction(25), Some(RowDirection::Back));
        assert_eq!(t.direction(58), Some(RowDirection::Back));
        assert_eq!(t.direction(59), None);
        assert_eq!(t.direction(0), None);
    }

    #[test]
    fn row_number_mode_orients_and_pairs_rows() {
        let table = RowDirectionTable::default();
        let codes = vec![
            row_code("001EnX", 1, 0.0, 50.0),
            row_code("001StX", 1, 0.0, 0.0),
            row_code("002StX", 2, 1.0, 0.0),
            row_code("002EnX", 2, 1.0, 50.0),
            row_code("003StX", 3, 2.0, 0.0),
            row_code("003EnX", 3, 2.0, 50.0),
            // Only one code for row 4.
            row_code("004StX", 4, 3.0, 0.0),
        ];
        let mut report = TopologyReport::default();
        let out = assemble_by_row_number(codes, &cfg(&table), &mut report);

        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[0].start.name, "001StX");
        assert_eq!(out.rows[2].direction, RowDirection::Back);
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(out.passes.len(), 2);
        assert_eq!(out.passes[0].rows, vec![RowId(0), RowId(1)]);
        assert_eq!(out.passes[1].rows, vec![RowId(2)]);
        assert_eq!(out.rows[2].pass, 2);
    }

    #[test]
    fn misaligned_row_is_dropped() {
        let table = RowDirectionTable::default();
        let codes = vec![
            row_code("001StX", 1, 0.0, 0.0),
            row_code("001EnX", 1, 50.0, 1.0),
        ];
        let mut report = TopologyReport::default();
        let out = assemble_by_row_number(codes, &cfg(&table), &mut report);
        assert!(out.rows.is_empty());
        assert_eq!(report.orientation_failures, 1);
    }

    #[test]
    fn pass_mode_assigns_rows_from_side_and_direction() {
        let table = RowDirectionTable::default();
        let codes = vec![
            // Pass 1 planted up the field.
            row_code("001StL", 1, 0.0, 0.0),
            row_code("001EnL", 1, 0.0, 50.0),
            row_code("001StR", 1, 1.0, 0.0),
            row_code("001EnR", 1, 1.0, 50.0),
            // Pass 2 planted back down.
            row_code("002StL", 2, 3.0, 50.0),
            row_code("002EnL", 2, 3.0, 0.0),
            row_code("002StR", 2, 2.0, 50.0),
            row_code("002EnR", 2, 2.0, 0.0),
        ];
        let mut report = TopologyReport::default();
        let out = assemble_by_pass_name(codes, &cfg(&table), &mut report);

        let summary: Vec<(u32, u32, RowDirection)> = out
            .rows
            .iter()
            .map(|r| (r.pass, r.number, r.direction))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, 1, RowDirection::Up),
                (1, 2, RowDirection::Up),
                (2, 3, RowDirection::Back),
                (2, 4, RowDirection::Back),
            ]
        );
        // Field start of a back row is the pass end code.
        assert_eq!(out.rows[2].start.name, "002EnR");
        assert_eq!(out.rows[2].start.row, Some(3));
        assert_eq!(out.passes.len(), 2);
        assert_eq!(report, TopologyReport::default());
    }

    #[test]
    fn pass_mode_rejects_duplicate_markers() {
        let table = RowDirectionTable::default();
        let codes = vec![
            row_code("001StL", 1, 0.0, 0.0),
            row_code("001StL", 1, 0.0, 50.0),
            row_code("002StL", 2, 1.0, 0.0),
        ];
        let mut report = TopologyReport::default();
        let out = assemble_by_pass_name(codes, &cfg(&table), &mut report);
        assert!(out.rows.is_empty());
        assert_eq!(report.pairing_failures, 1);
        assert_eq!(report.unpaired_codes, 1);
    }

    #[test]
    fn pass_zero_is_dropped_as_pairing_failure() {
        let table = RowDirectionTable::default();
        let codes = vec![
            row_code("000StL", 0, 0.0, 0.0),
            row_code("000EnL", 0, 0.0, 50.0),
            row_code("001StL", 1, 1.0, 0.0),
            row_code("001EnL", 1, 1.0, 50.0),
        ];
        let mut report = TopologyReport::default();
        let out = assemble_by_pass_name(codes, &cfg(&table), &mut report);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].pass, 1);
        assert_eq!(out.rows[0].number, 1);
        assert_eq!(report.pairing_failures, 1);
    }
}
