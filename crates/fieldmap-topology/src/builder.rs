use fieldmap_core::{Code, CodeKind, DetectionKind, ItemRegistry};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::TopologyError;
use crate::groups::{apply_code_listings, complete_groups, CodeListing};
use crate::projection::project_codes_to_rows;
use crate::rows::{
    assemble_by_pass_name, assemble_by_row_number, RowAssembly, RowDirectionTable, RowLabeling,
};
use crate::segments::build_segments;
use crate::topology::{FieldTopology, SegmentClass};

/// Topology assembly settings. Distances in world units, angles in degrees.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyParams {
    pub labeling: RowLabeling,
    /// Planting direction of the whole field; 0 is east, counter-clockwise.
    pub field_direction_deg: f64,
    pub orientation_tolerance_deg: f64,
    /// Largest lateral distance between a code and the row it joins.
    pub projection_cutoff: f64,
    pub direction_table: RowDirectionTable,
    pub code_listings: Vec<CodeListing>,
}

impl Default for TopologyParams {
    fn default() -> Self {
        Self {
            labeling: RowLabeling::RowNumber,
            field_direction_deg: 90.0,
            orientation_tolerance_deg: 45.0,
            projection_cutoff: 3.0,
            direction_table: RowDirectionTable::default(),
            code_listings: Vec::new(),
        }
    }
}

/// Counts of the non-fatal problems met while building.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyReport {
    pub dropped_rows: usize,
    pub orientation_failures: usize,
    pub pairing_failures: usize,
    pub unpaired_codes: usize,
    pub unassociated_codes: usize,
    pub demoted_segments: usize,
}

impl TopologyReport {
    /// Log a recoverable error and count it.
    pub(crate) fn record(&mut self, err: &TopologyError) {
        warn!("{err}");
        match err {
            TopologyError::Orientation { .. } => self.orientation_failures += 1,
            TopologyError::Pairing { .. } => self.pairing_failures += 1,
            TopologyError::PassTooLarge { count, .. } => self.dropped_rows += count,
            TopologyError::RowCodeCount { .. } | TopologyError::UncoveredRow { .. } => {
                self.dropped_rows += 1
            }
            TopologyError::NoRowCodes
            | TopologyError::NoRows
            | TopologyError::UnsupportedTopology { .. } => {}
        }
    }
}

/// Output of a topology build.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologyBuildResult {
    pub topology: FieldTopology,
    pub report: TopologyReport,
    /// Group and single codes too far from every row.
    pub unassociated: Vec<Code>,
}

/// Turns deduplicated codes into rows, segments and groups.
pub struct FieldTopologyBuilder {
    params: TopologyParams,
}

impl FieldTopologyBuilder {
    pub fn new(params: TopologyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TopologyParams {
        &self.params
    }

    /// Build from the canonical code items of `registry`.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, registry)))]
    pub fn build(&self, registry: &ItemRegistry) -> Result<TopologyBuildResult, TopologyError> {
        let (row_codes, other_codes) = split_codes(registry);
        self.build_from_codes(row_codes, other_codes)
    }

    /// Build from row codes and the group/single codes to place on them.
    pub fn build_from_codes(
        &self,
        row_codes: Vec<Code>,
        other_codes: Vec<Code>,
    ) -> Result<TopologyBuildResult, TopologyError> {
        if row_codes.is_empty() {
            return Err(TopologyError::NoRowCodes);
        }
        let mut report = TopologyReport::default();
        let cfg = RowAssembly {
            field_direction_deg: self.params.field_direction_deg,
            tolerance_deg: self.params.orientation_tolerance_deg,
            table: &self.params.direction_table,
        };
        let assembled = match self.params.labeling {
            RowLabeling::RowNumber => assemble_by_row_number(row_codes, &cfg, &mut report),
            RowLabeling::PassName => assemble_by_pass_name(row_codes, &cfg, &mut report),
        };
        if assembled.rows.is_empty() {
            return Err(TopologyError::NoRows);
        }
        info!(
            "assembled {} rows in {} passes",
            assembled.rows.len(),
            assembled.passes.len()
        );

        let mut topology = FieldTopology {
            rows: assembled.rows,
            passes: assembled.passes,
            ..FieldTopology::default()
        };

        let (projected, unassociated) =
            project_codes_to_rows(other_codes, &topology.rows, self.params.projection_cutoff);
        report.unassociated_codes = unassociated.len();

        build_segments(&mut topology, projected);

        ensure_supported(&topology)?;
        info!(
            "{} segments ({} special)",
            topology.segments.len(),
            topology.segments_of_class(SegmentClass::Special).len()
        );

        complete_groups(&mut topology, &mut report);
        apply_code_listings(&mut topology, &self.params.code_listings);

        Ok(TopologyBuildResult {
            topology,
            report,
            unassociated,
        })
    }
}

/// Reject segments bounded by row codes at both ends.
pub(crate) fn ensure_supported(topology: &FieldTopology) -> Result<(), TopologyError> {
    let middle = topology.segments_of_class(SegmentClass::Middle).len();
    if middle > 0 {
        return Err(TopologyError::UnsupportedTopology { segments: middle });
    }
    Ok(())
}

/// Canonical code items as boundary codes: row codes first, then the rest.
pub fn split_codes(registry: &ItemRegistry) -> (Vec<Code>, Vec<Code>) {
    let mut rows = Vec::new();
    let mut others = Vec::new();
    for id in registry.item_ids() {
        let DetectionKind::Code(kind) = registry.kind(id) else {
            continue;
        };
        let name = registry.name(id).to_string();
        let row = match kind {
            CodeKind::Row => CodeKind::embedded_row_number(&name),
            CodeKind::Group | CodeKind::Single => None,
        };
        let code = Code {
            kind,
            name,
            position: registry.position(id),
            item: Some(id),
            row,
        };
        match kind {
            CodeKind::Row => rows.push(code),
            CodeKind::Group | CodeKind::Single => others.push(code),
        }
    }
    (rows, others)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fieldmap_core::{CanonicalItem, Detection, DetectionId, ImageId};
    use nalgebra::Point3;

    use crate::topology::{RowDirection, RowId};

    fn det(kind: CodeKind, name: &str, x: f64, y: f64) -> Detection {
        Detection {
            kind: DetectionKind::Code(kind),
            name: name.into(),
            position: Point3::new(x, y, 0.0),
            bounds: None,
            image: ImageId(0),
        }
    }

    fn registry(dets: Vec<Detection>) -> ItemRegistry {
        let n = dets.len();
        let mut reg = ItemRegistry::new(dets);
        reg.set_items((0..n).map(|i| CanonicalItem::new(DetectionId(i))).collect());
        reg
    }

    /// Rows 1 and 2 planted up, rows 3 and 4 planted back.
    fn four_row_field() -> Vec<Detection> {
        let mut dets = Vec::new();
        for row in 1..=4u32 {
            let x = row as f64;
            dets.push(det(CodeKind::Row, &format!("{row:03}St"), x, 0.0));
            dets.push(det(CodeKind::Row, &format!("{row:03}En"), x, 20.0));
        }
        // Row 1: group 100 at 5 m; row 4 continues it from the top.
        dets.push(det(CodeKind::Group, "100", 1.0, 5.0));
        dets.push(det(CodeKind::Group, "101", 4.02, 12.0));
        dets.push(det(CodeKind::Single, "K7", 2.0, 8.0));
        dets.push(det(CodeKind::Group, "999", 40.0, 8.0));
        dets
    }

    fn params() -> TopologyParams {
        TopologyParams {
            direction_table: RowDirectionTable {
                sections: vec![crate::rows::RowSection { first: 1, last: 4 }],
                stride: 4,
            },
            ..TopologyParams::default()
        }
    }

    #[test]
    fn builds_rows_segments_and_groups() {
        let reg = registry(four_row_field());
        let out = FieldTopologyBuilder::new(params()).build(&reg).unwrap();
        let t = &out.topology;

        assert_eq!(t.rows.len(), 4);
        assert_eq!(t.passes.len(), 2);
        assert_eq!(t.rows[3].direction, RowDirection::Back);
        assert_eq!(out.report.unassociated_codes, 1);
        assert_eq!(out.unassociated[0].name, "999");

        // Every segment belongs to a group except the special one.
        for seg in &t.segments {
            assert_eq!(seg.group.is_some(), !seg.is_special());
        }
        assert_eq!(t.segments_of_class(SegmentClass::Special).len(), 1);

        // Group 100 runs from row 1 into row 4.
        let g = t
            .group_ids()
            .find(|&g| t.group_start_code(g).map(|c| c.name.as_str()) == Some("100"))
            .unwrap();
        let rows: Vec<RowId> = t.group(g).segments.iter().map(|&s| t.segment(s).row).collect();
        assert_eq!(rows, vec![RowId(0), RowId(3)]);

        for row in t.row_ids() {
            assert_abs_diff_eq!(t.row_length(row), t.row_path_length(row), epsilon = 1e-9);
        }
    }

    #[test]
    fn missing_row_codes_is_fatal() {
        let reg = registry(vec![det(CodeKind::Group, "1", 0.0, 0.0)]);
        let err = FieldTopologyBuilder::new(params()).build(&reg).unwrap_err();
        assert_eq!(err, TopologyError::NoRowCodes);
    }

    #[test]
    fn unpairable_rows_leave_no_rows() {
        let reg = registry(vec![det(CodeKind::Row, "001St", 0.0, 0.0)]);
        let err = FieldTopologyBuilder::new(params()).build(&reg).unwrap_err();
        assert_eq!(err, TopologyError::NoRows);
    }

    #[test]
    fn middle_segment_is_unsupported() {
        let row_code = |name: &str, y: f64| Code {
            kind: CodeKind::Row,
            name: name.into(),
            position: Point3::new(0.0, y, 0.0),
            item: None,
            row: Some(1),
        };
        let rows = vec![row_code("001St", 0.0), row_code("001En", 20.0)];
        let out = FieldTopologyBuilder::new(params())
            .build_from_codes(rows.clone(), Vec::new())
            .unwrap();
        // Pseudo codes keep an empty row free of middle segments.
        assert_eq!(out.topology.segments.len(), 3);
        assert!(ensure_supported(&out.topology).is_ok());

        let mut topology = out.topology;
        topology.push_segment(crate::topology::PlantGroupSegment::new(
            RowId(0),
            rows[0].clone(),
            rows[1].clone(),
        ));
        assert_eq!(
            ensure_supported(&topology),
            Err(TopologyError::UnsupportedTopology { segments: 1 })
        );
    }
}
