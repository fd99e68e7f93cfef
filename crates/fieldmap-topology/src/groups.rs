//! Stitching segments into plant groups.

use std::collections::HashSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::builder::TopologyReport;
use crate::topology::{FieldTopology, SegmentClass, SegmentId};

/// Planting record for one group code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeListing {
    pub id: String,
    pub max_plants: u32,
    #[serde(default)]
    pub alternate_id: Option<String>,
}

fn segment_label(topology: &FieldTopology, id: SegmentId) -> String {
    let seg = topology.segment(id);
    seg.start
        .as_code()
        .map_or_else(|| format!("segment {}", id.0), |c| c.name.clone())
}

/// Find the start segment an end segment continues into.
///
/// The continuation lives in the next pass, in the mirrored row position,
/// and must run the opposite way.
fn continuation(
    topology: &FieldTopology,
    end: SegmentId,
    claimed: &HashSet<SegmentId>,
) -> Result<SegmentId, String> {
    let row_id = topology.segment(end).row;
    let row = topology.row(row_id);
    let (p, i) = topology
        .pass_of(row_id)
        .ok_or_else(|| format!("row {} isn't in any field pass", row.number))?;
    let next_pass = topology
        .passes
        .get(p + 1)
        .ok_or_else(|| format!("row {} is in the last pass", row.number))?;
    if next_pass.rows.len() < 2 {
        return Err(format!("pass {} doesn't contain 2 rows", next_pass.number));
    }
    let mirrored = if i == 0 { 1 } else { 0 };
    let next_row = topology.row(next_pass.rows[mirrored]);
    if next_row.direction == row.direction {
        return Err(format!(
            "rows {} and {} both run {:?}",
            row.number, next_row.number, row.direction
        ));
    }
    let &first = next_row
        .segments
        .first()
        .ok_or_else(|| format!("row {} has no segments", next_row.number))?;
    if topology.segment(first).class() != SegmentClass::Start {
        return Err(format!(
            "row {} doesn't open with a start segment",
            next_row.number
        ));
    }
    if claimed.contains(&first) {
        return Err(format!(
            "start segment of row {} is already stitched",
            next_row.number
        ));
    }
    Ok(first)
}

/// Build every plant group of the topology.
///
/// End segments are stitched to their continuation; the ones that can't be
/// are demoted to singleton groups, as are single segments and start
/// segments nothing continued into.
pub(crate) fn complete_groups(topology: &mut FieldTopology, report: &mut TopologyReport) {
    let mut claimed = HashSet::new();
    let mut singles = topology.segments_of_class(SegmentClass::Single);

    for end in topology.segments_of_class(SegmentClass::End) {
        match continuation(topology, end, &claimed) {
            Ok(start) => {
                claimed.insert(start);
                topology.push_group(vec![end, start]);
            }
            Err(reason) => {
                warn!(
                    "end segment {} treated as single segment: {reason}",
                    segment_label(topology, end)
                );
                report.demoted_segments += 1;
                singles.push(end);
            }
        }
    }

    let stitched = topology.groups.len();
    for single in singles {
        topology.push_group(vec![single]);
    }

    for start in topology.segments_of_class(SegmentClass::Start) {
        if !claimed.contains(&start) {
            debug!(
                "start segment {} has no preceding end segment",
                segment_label(topology, start)
            );
            topology.push_group(vec![start]);
        }
    }

    info!(
        "built {} groups ({} spanning two rows)",
        topology.groups.len(),
        stitched
    );
}

/// Copy plant counts and alternate ids onto groups by start-code name.
///
/// Returns how many groups matched a listing.
pub fn apply_code_listings(topology: &mut FieldTopology, listings: &[CodeListing]) -> usize {
    if listings.is_empty() {
        return 0;
    }
    let mut matched = 0;
    for gid in topology.group_ids().collect::<Vec<_>>() {
        let Some(name) = topology.group_start_code(gid).map(|c| c.name.clone()) else {
            continue;
        };
        let Some(listing) = listings.iter().find(|l| l.id == name) else {
            continue;
        };
        let group = &mut topology.groups[gid.0];
        group.expected_num_plants = Some(listing.max_plants);
        if listing.alternate_id.is_some() {
            group.alternate_id = listing.alternate_id.clone();
        }
        matched += 1;
    }
    info!("updated {matched} groups from code listings");
    matched
}
