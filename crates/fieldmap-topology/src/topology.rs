//! Row -> segment -> group arena.
//!
//! Rows, segments, groups and passes each live in one `Vec` inside
//! [`FieldTopology`]; they refer to each other through index newtypes.

use fieldmap_core::{path_length, planar_distance, Code, CodeKind, FieldItem, Plant};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

/// Planting direction of a row relative to the field direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowDirection {
    Up,
    Back,
}

impl RowDirection {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            RowDirection::Up => RowDirection::Back,
            RowDirection::Back => RowDirection::Up,
        }
    }
}

/// A planted line between two row codes.
///
/// `start` and `end` follow the field direction; `segments` follow the
/// planting direction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Row {
    pub number: u32,
    pub pass: u32,
    pub start: Code,
    pub end: Code,
    pub direction: RowDirection,
    #[serde(default)]
    pub segments: Vec<SegmentId>,
}

impl Row {
    /// Bearing of the row axis in degrees (0 east, counter-clockwise).
    pub fn angle_deg(&self) -> f64 {
        fieldmap_core::bearing_deg(self.start.position.xy(), self.end.position.xy())
    }
}

/// Position of a segment inside its row, decided by which ends are row codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentClass {
    /// Starts at a row code.
    Start,
    /// Row code at both ends.
    Middle,
    /// Ends at a row code.
    End,
    /// Between two group codes.
    Single,
    /// Starts at a single-plant code.
    Special,
}

/// Stretch of a row between two consecutive boundary items.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlantGroupSegment {
    pub row: RowId,
    pub start: FieldItem,
    pub end: FieldItem,
    /// Resolved plants between `start` and `end`, in planting order.
    #[serde(default)]
    pub plants: Vec<Plant>,
    #[serde(default)]
    pub group: Option<GroupId>,
    #[serde(default)]
    pub expected_num_plants: Option<u32>,
}

impl PlantGroupSegment {
    pub fn new(row: RowId, start: impl Into<FieldItem>, end: impl Into<FieldItem>) -> Self {
        Self {
            row,
            start: start.into(),
            end: end.into(),
            plants: Vec::new(),
            group: None,
            expected_num_plants: None,
        }
    }

    /// Straight-line distance between the boundaries.
    pub fn length(&self) -> f64 {
        planar_distance(self.start.xy(), self.end.xy())
    }

    #[inline]
    pub fn is_special(&self) -> bool {
        self.start.code_kind() == Some(CodeKind::Single)
    }

    pub fn class(&self) -> SegmentClass {
        if self.is_special() {
            return SegmentClass::Special;
        }
        let starts_at_row = self.start.code_kind() == Some(CodeKind::Row);
        let ends_at_row = self.end.code_kind() == Some(CodeKind::Row);
        match (starts_at_row, ends_at_row) {
            (true, true) => SegmentClass::Middle,
            (true, false) => SegmentClass::Start,
            (false, true) => SegmentClass::End,
            (false, false) => SegmentClass::Single,
        }
    }
}

/// One planting unit, possibly spanning two rows.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlantGroup {
    pub segments: Vec<SegmentId>,
    #[serde(default)]
    pub expected_num_plants: Option<u32>,
    #[serde(default)]
    pub alternate_id: Option<String>,
}

/// Rows planted by one equipment pass, in pass order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldPass {
    pub number: u32,
    pub rows: Vec<RowId>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldTopology {
    pub rows: Vec<Row>,
    pub segments: Vec<PlantGroupSegment>,
    pub groups: Vec<PlantGroup>,
    pub passes: Vec<FieldPass>,
}

impl FieldTopology {
    pub fn row(&self, id: RowId) -> &Row {
        &self.rows[id.0]
    }

    pub fn segment(&self, id: SegmentId) -> &PlantGroupSegment {
        &self.segments[id.0]
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut PlantGroupSegment {
        &mut self.segments[id.0]
    }

    pub fn group(&self, id: GroupId) -> &PlantGroup {
        &self.groups[id.0]
    }

    pub fn row_ids(&self) -> impl Iterator<Item = RowId> {
        (0..self.rows.len()).map(RowId)
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> {
        (0..self.segments.len()).map(SegmentId)
    }

    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> {
        (0..self.groups.len()).map(GroupId)
    }

    /// Append a segment to `row` and return its id.
    pub fn push_segment(&mut self, segment: PlantGroupSegment) -> SegmentId {
        let id = SegmentId(self.segments.len());
        let row = segment.row;
        self.segments.push(segment);
        self.rows[row.0].segments.push(id);
        id
    }

    /// Create a group from `segments` and point each segment back at it.
    pub fn push_group(&mut self, segments: Vec<SegmentId>) -> GroupId {
        let id = GroupId(self.groups.len());
        for &s in &segments {
            self.segments[s.0].group = Some(id);
        }
        self.groups.push(PlantGroup {
            segments,
            ..PlantGroup::default()
        });
        id
    }

    /// Sum of the row's segment lengths.
    pub fn row_length(&self, id: RowId) -> f64 {
        self.row(id)
            .segments
            .iter()
            .map(|&s| self.segment(s).length())
            .sum()
    }

    /// Boundary positions of the row in planting order.
    pub fn row_boundaries(&self, id: RowId) -> Vec<Point2<f64>> {
        let row = self.row(id);
        let mut out = Vec::with_capacity(row.segments.len() + 1);
        if let Some(&first) = row.segments.first() {
            out.push(self.segment(first).start.xy());
        }
        out.extend(row.segments.iter().map(|&s| self.segment(s).end.xy()));
        out
    }

    /// Path length through the row's ordered boundaries.
    pub fn row_path_length(&self, id: RowId) -> f64 {
        path_length(&self.row_boundaries(id))
    }

    pub fn group_length(&self, id: GroupId) -> f64 {
        self.group(id)
            .segments
            .iter()
            .map(|&s| self.segment(s).length())
            .sum()
    }

    /// Code that opens the group.
    pub fn group_start_code(&self, id: GroupId) -> Option<&Code> {
        let first = *self.group(id).segments.first()?;
        self.segment(first).start.as_code()
    }

    /// Rows in ascending number.
    pub fn rows_by_number(&self) -> Vec<RowId> {
        let mut ids: Vec<RowId> = self.row_ids().collect();
        ids.sort_by_key(|&id| self.row(id).number);
        ids
    }

    /// Pass holding `row`, with the row's index inside that pass.
    pub fn pass_of(&self, row: RowId) -> Option<(usize, usize)> {
        self.passes.iter().enumerate().find_map(|(p, pass)| {
            pass.rows
                .iter()
                .position(|&r| r == row)
                .map(|i| (p, i))
        })
    }

    pub fn segments_of_class(&self, class: SegmentClass) -> Vec<SegmentId> {
        self.segment_ids()
            .filter(|&id| self.segment(id).class() == class)
            .collect()
    }
}
