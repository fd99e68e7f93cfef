use fieldmap_core::Code;
use log::info;

use crate::projection::ProjectedCode;
use crate::topology::{FieldTopology, PlantGroupSegment, RowDirection, RowId};

/// Split every row into segments between consecutive boundary codes.
///
/// Codes are ordered by projection from the field start, framed by the row
/// codes, and reversed for rows planted back. A row with no codes gets two
/// pseudo group codes (`PS<n>`, `PE<n>`) on its row codes.
pub fn build_segments(topology: &mut FieldTopology, projected: Vec<ProjectedCode>) {
    let mut per_row: Vec<Vec<(f64, Code)>> = vec![Vec::new(); topology.rows.len()];
    for p in projected {
        if let Some(bucket) = per_row.get_mut(p.row.0) {
            bucket.push((p.projection, p.code));
        }
    }

    for (i, mut codes) in per_row.into_iter().enumerate() {
        let row_id = RowId(i);
        let row = topology.row(row_id);
        if codes.is_empty() {
            info!(
                "no codes in row {}, creating pseudo group codes at its ends",
                row.number
            );
            codes = vec![
                (
                    0.0,
                    Code::pseudo(format!("PS{}", row.number), row.start.position, row.number),
                ),
                (
                    1.0,
                    Code::pseudo(format!("PE{}", row.number), row.end.position, row.number),
                ),
            ];
        }
        codes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut chain = Vec::with_capacity(codes.len() + 2);
        chain.push(row.start.clone());
        chain.extend(codes.into_iter().map(|(_, c)| c));
        chain.push(row.end.clone());
        if row.direction == RowDirection::Back {
            chain.reverse();
        }

        for w in chain.windows(2) {
            topology.push_segment(PlantGroupSegment::new(row_id, w[0].clone(), w[1].clone()));
        }
    }
}
