use fieldmap_core::{axis_offset, Code};
use log::{debug, warn};

use crate::topology::{Row, RowId};

/// Code attached to a row, with its distance along the row from the field start.
#[derive(Clone, Debug)]
pub struct ProjectedCode {
    pub code: Code,
    pub row: RowId,
    pub projection: f64,
}

/// Attach each code to the row with the smallest absolute lateral distance.
///
/// Codes farther than `cutoff` from every row come back in the second
/// vector with `row` cleared.
pub fn project_codes_to_rows(
    codes: Vec<Code>,
    rows: &[Row],
    cutoff: f64,
) -> (Vec<ProjectedCode>, Vec<Code>) {
    let mut projected = Vec::with_capacity(codes.len());
    let mut unassociated = Vec::new();

    for mut code in codes {
        let p = code.position.xy();
        let closest = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                axis_offset(p, row.start.position.xy(), row.end.position.xy())
                    .map(|off| (i, off.lateral.abs(), off.projection))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match closest {
            Some((i, lateral, projection)) if lateral < cutoff => {
                code.row = Some(rows[i].number);
                debug!(
                    "code '{}' -> row {} at {:.3} (lateral {:.3})",
                    code.name, rows[i].number, projection, lateral
                );
                projected.push(ProjectedCode {
                    code,
                    row: RowId(i),
                    projection,
                });
            }
            other => {
                let distance = other.map_or(f64::INFINITY, |c| c.1);
                warn!(
                    "couldn't find a row for code '{}', closest row is {:.3} away",
                    code.name, distance
                );
                code.row = None;
                unassociated.push(code);
            }
        }
    }

    (projected, unassociated)
}
