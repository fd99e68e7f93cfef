//! Recursive plant localization inside one segment.
//!
//! A segment part is a start item, an end item and the candidate clusters
//! between them. Each step picks one plant (the best-scoring candidate near
//! the expected offsets, or a created plant at the first offset), splits the
//! part there and recurses into the pieces. A part too short for another
//! expected offset is terminal. The plants are the starts of all terminal
//! parts except the first.
//!
//! Both scan directions share the grid of expected offsets measured from
//! the part start, so created plants from either side land on it.

use fieldmap_core::{
    axis_offset, midpoint, point_along, AxisOffset, CodeKind, FieldItem, Plant, PlantPartKind,
};
use fieldmap_topology::PlantGroupSegment;
use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::cluster::PlantCluster;
use crate::error::LocalizeError;

/// Lateral error ramp: `(error, penalty)` breakpoints; beyond the second
/// breakpoint a candidate is disqualified.
const LATERAL_RAMP: [(f64, f64); 2] = [(0.076, 0.1), (0.15, 1.0)];
const PROJECTION_PENALTY_LOW: f64 = 0.1;
const PROJECTION_PENALTY_HIGH: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalizeMode {
    /// Scan each part from its start only.
    Forward,
    /// Scan from both ends and reconcile the two picks.
    #[default]
    Bidirectional,
}

/// Localizer settings. Spacings in world units.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerParams {
    /// Expected distance from a group or single code to the first plant.
    pub group_code_spacing: f64,
    /// Expected distance from a row code to the first plant.
    pub row_code_spacing: f64,
    /// Expected distance between neighbouring plants.
    pub plant_spacing: f64,
    pub lateral_weight: f64,
    pub projection_weight: f64,
    pub closeness_weight: f64,
    pub stick_multiplier: f64,
    pub leaf_multiplier: f64,
    pub tag_multiplier: f64,
    pub mode: LocalizeMode,
    /// Picks of the two scan directions closer than this are one plant.
    /// Defaults to a quarter of `plant_spacing`.
    pub overlap_tolerance: Option<f64>,
}

impl Default for LocalizerParams {
    fn default() -> Self {
        Self {
            group_code_spacing: 0.3,
            row_code_spacing: 0.3,
            plant_spacing: 0.6,
            lateral_weight: 1.0,
            projection_weight: 1.0,
            closeness_weight: 1.0,
            stick_multiplier: 2.0,
            leaf_multiplier: 1.5,
            tag_multiplier: 1.25,
            mode: LocalizeMode::Bidirectional,
            overlap_tolerance: None,
        }
    }
}

impl LocalizerParams {
    /// Expected distance from `item` to the next plant.
    pub fn spacing_after(&self, item: &FieldItem) -> f64 {
        match item.code_kind() {
            Some(CodeKind::Row) => self.row_code_spacing,
            Some(CodeKind::Group | CodeKind::Single) => self.group_code_spacing,
            None => self.plant_spacing,
        }
    }

    /// Closest a plant may sit to `item`.
    pub fn margin(&self, item: &FieldItem) -> f64 {
        self.spacing_after(item) / 2.0
    }

    pub fn overlap_tolerance(&self) -> f64 {
        self.overlap_tolerance.unwrap_or(self.plant_spacing / 4.0)
    }
}

/// Plant counts by how each plant was obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizerStats {
    pub detected: usize,
    pub created_empty_pool: usize,
    pub created_no_valid: usize,
}

impl LocalizerStats {
    pub fn total(&self) -> usize {
        self.detected + self.created_empty_pool + self.created_no_valid
    }

    pub fn accumulate(&mut self, other: &LocalizerStats) {
        self.detected += other.detected;
        self.created_empty_pool += other.created_empty_pool;
        self.created_no_valid += other.created_no_valid;
    }
}

/// One piece of a segment during the recursion.
#[derive(Clone, Debug)]
pub struct SegmentPart<'a> {
    pub start: FieldItem,
    pub end: FieldItem,
    pub candidates: Vec<&'a PlantCluster>,
}

impl SegmentPart<'_> {
    pub fn length(&self) -> f64 {
        fieldmap_core::planar_distance(self.start.xy(), self.end.xy())
    }
}

/// Plants found in a segment.
#[derive(Clone, Debug, Default)]
pub struct LocalizedSegment {
    pub plants: Vec<Plant>,
    pub stats: LocalizerStats,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Detected,
    EmptyPool,
    NoValidCandidate,
}

/// Plant picked by one scan. `projection` is measured from the part start.
#[derive(Clone, Debug)]
struct Selection {
    plant: Plant,
    projection: f64,
    candidate: Option<usize>,
    origin: Origin,
}

/// Scan direction over a part.
#[derive(Clone, Copy)]
struct Scan<'p> {
    from: &'p FieldItem,
    to: &'p FieldItem,
    length: f64,
    reversed: bool,
}

impl Scan<'_> {
    /// Convert a forward offset into this scan's frame.
    fn frame(&self, off: AxisOffset) -> AxisOffset {
        if self.reversed {
            AxisOffset {
                lateral: -off.lateral,
                projection: self.length - off.projection,
            }
        } else {
            off
        }
    }

    fn forward_projection(&self, projection: f64) -> f64 {
        if self.reversed {
            self.length - projection
        } else {
            projection
        }
    }
}

/// Two-piece linear ramp through `(0, 0)`, `(x1, y1)` and `(x2, y2)`.
fn ramp(x: f64, (x1, y1): (f64, f64), (x2, y2): (f64, f64), beyond: f64) -> f64 {
    if x < x1 {
        y1 / x1 * x
    } else if x <= x2 {
        (y2 - y1) / (x2 - x1) * (x - x1) + y1
    } else {
        beyond
    }
}

pub struct RecursivePlantLocalizer {
    params: LocalizerParams,
}

impl RecursivePlantLocalizer {
    pub fn new(params: LocalizerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LocalizerParams {
        &self.params
    }

    /// Offsets from `from` where plants are expected, stepping by the plant
    /// spacing up to the margin before `to`.
    pub fn expected_projections(&self, from: &FieldItem, to: &FieldItem, length: f64) -> Vec<f64> {
        let step = self.params.plant_spacing;
        if step.is_nan() || step <= 0.0 {
            return Vec::new();
        }
        let first = self.params.spacing_after(from);
        let last = length - self.params.margin(to);
        (0..)
            .map(|k| first + k as f64 * step)
            .take_while(|&p| p <= last)
            .collect()
    }

    pub fn lateral_penalty(&self, lateral: f64) -> f64 {
        ramp(lateral.abs(), LATERAL_RAMP[0], LATERAL_RAMP[1], f64::NAN)
    }

    pub fn projection_penalty(&self, expected: &[f64], projection: f64) -> f64 {
        let error = expected
            .iter()
            .map(|e| (projection - e).abs())
            .fold(f64::INFINITY, f64::min);
        let s = self.params.plant_spacing;
        ramp(
            error,
            (s / 4.0, PROJECTION_PENALTY_LOW),
            (s / 2.0, PROJECTION_PENALTY_HIGH),
            PROJECTION_PENALTY_HIGH,
        )
    }

    pub fn closeness_penalty(&self, projection: f64) -> f64 {
        let s = self.params.plant_spacing;
        if projection < 2.5 * s {
            0.0
        } else if projection < 3.5 * s {
            1.0
        } else {
            f64::NAN
        }
    }

    /// Product of the multipliers of the part kinds present in `cluster`.
    pub fn confidence(&self, cluster: &PlantCluster) -> f64 {
        let p = &self.params;
        [
            (PlantPartKind::Stick, p.stick_multiplier),
            (PlantPartKind::Leaf, p.leaf_multiplier),
            (PlantPartKind::Tag, p.tag_multiplier),
        ]
        .into_iter()
        .filter(|&(kind, _)| cluster.contains(kind))
        .map(|(_, m)| m.max(1.0))
        .product()
    }

    /// Penalty of a candidate at `off`; NaN disqualifies it.
    pub fn penalty(&self, cluster: &PlantCluster, off: AxisOffset, expected: &[f64]) -> f64 {
        let p = &self.params;
        (self.lateral_penalty(off.lateral) * p.lateral_weight
            + self.projection_penalty(expected, off.projection) * p.projection_weight
            + self.closeness_penalty(off.projection) * p.closeness_weight)
            / self.confidence(cluster)
    }

    /// Locate the plants between the boundaries of `segment`.
    pub fn locate_segment(
        &self,
        segment: &PlantGroupSegment,
        candidates: &[PlantCluster],
    ) -> Result<LocalizedSegment, LocalizeError> {
        self.locate(&segment.start, &segment.end, candidates)
    }

    /// Locate the plants between `start` and `end`.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, start, end, candidates),
            fields(n = candidates.len())
        )
    )]
    pub fn locate(
        &self,
        start: &FieldItem,
        end: &FieldItem,
        candidates: &[PlantCluster],
    ) -> Result<LocalizedSegment, LocalizeError> {
        if !end.is_code() {
            return Err(LocalizeError::SegmentEndsWithPlant);
        }
        let whole = SegmentPart {
            start: start.clone(),
            end: end.clone(),
            candidates: candidates.iter().collect(),
        };
        let mut stats = LocalizerStats::default();
        let parts = self.split_into_subparts(whole, &mut stats)?;
        debug_assert!(parts.last().is_some_and(|p| p.end.is_code()));

        let plants: Vec<Plant> = parts
            .iter()
            .filter_map(|p| p.start.as_plant().cloned())
            .collect();
        debug!(
            "{} plants in {} parts ({} detected)",
            plants.len(),
            parts.len(),
            stats.detected
        );
        Ok(LocalizedSegment { plants, stats })
    }

    /// Recurse until every part is terminal; terminal parts in order.
    pub fn split_into_subparts<'a>(
        &self,
        part: SegmentPart<'a>,
        stats: &mut LocalizerStats,
    ) -> Result<Vec<SegmentPart<'a>>, LocalizeError> {
        match self.process_part(&part, stats)? {
            None => Ok(vec![part]),
            Some(children) => {
                let mut out = Vec::new();
                for child in children {
                    out.extend(self.split_into_subparts(child, stats)?);
                }
                Ok(out)
            }
        }
    }

    /// Split `part` at its chosen plant(s); `None` when it is terminal.
    fn process_part<'a>(
        &self,
        part: &SegmentPart<'a>,
        stats: &mut LocalizerStats,
    ) -> Result<Option<Vec<SegmentPart<'a>>>, LocalizeError> {
        let length = part.length();
        let forward = Scan {
            from: &part.start,
            to: &part.end,
            length,
            reversed: false,
        };
        let backward = Scan {
            from: &part.end,
            to: &part.start,
            length,
            reversed: true,
        };
        let forward_expected = self.expected_projections(&part.start, &part.end, length);
        if forward_expected.is_empty() {
            return Ok(None);
        }
        // Same offsets seen from the end, nearest first.
        let backward_expected: Vec<f64> = match self.params.mode {
            LocalizeMode::Forward => Vec::new(),
            LocalizeMode::Bidirectional => {
                forward_expected.iter().rev().map(|e| length - e).collect()
            }
        };

        // Candidates strictly inside the band, with forward offsets.
        let low = self.params.margin(&part.start);
        let high = length - self.params.margin(&part.end);
        let mut pool: Vec<(&'a PlantCluster, AxisOffset)> =
            Vec::with_capacity(part.candidates.len());
        for &cluster in &part.candidates {
            let off = axis_offset(cluster.position(), part.start.xy(), part.end.xy())
                .ok_or(LocalizeError::DegenerateSegment)?;
            if off.projection > low && off.projection < high {
                pool.push((cluster, off));
            }
        }
        pool.sort_by(|a, b| a.1.projection.total_cmp(&b.1.projection));

        let z = part.start.position().z;
        let forward_pick = self.scan(forward, &forward_expected, &pool, z)?;
        let backward_pick = self.scan(backward, &backward_expected, &pool, z)?;
        let picks = self.reconcile(forward_pick, backward_pick);
        if picks.is_empty() {
            return Ok(None);
        }

        for pick in &picks {
            match pick.origin {
                Origin::Detected => stats.detected += 1,
                Origin::EmptyPool => stats.created_empty_pool += 1,
                Origin::NoValidCandidate => stats.created_no_valid += 1,
            }
        }

        let mut children = Vec::with_capacity(picks.len() + 1);
        let mut boundary = part.start.clone();
        let mut lower = f64::NEG_INFINITY;
        for pick in picks {
            let threshold = pick.projection;
            children.push(SegmentPart {
                start: boundary,
                end: FieldItem::Plant(pick.plant.clone()),
                candidates: pool
                    .iter()
                    .filter(|(_, off)| off.projection >= lower && off.projection < threshold)
                    .map(|(c, _)| *c)
                    .collect(),
            });
            boundary = FieldItem::Plant(pick.plant);
            lower = threshold;
        }
        children.push(SegmentPart {
            start: boundary,
            end: part.end.clone(),
            candidates: pool
                .iter()
                .filter(|(_, off)| off.projection >= lower)
                .map(|(c, _)| *c)
                .collect(),
        });
        Ok(Some(children))
    }

    /// Pick the best candidate seen from `scan.from`, or create a plant at
    /// the expected offset nearest to it. `expected` is in the scan's frame.
    fn scan(
        &self,
        scan: Scan<'_>,
        expected: &[f64],
        pool: &[(&PlantCluster, AxisOffset)],
        z: f64,
    ) -> Result<Option<Selection>, LocalizeError> {
        let Some(&first) = expected.first() else {
            return Ok(None);
        };

        let best = pool
            .iter()
            .enumerate()
            .map(|(i, (cluster, off))| (i, self.penalty(cluster, scan.frame(*off), expected)))
            .filter(|(_, penalty)| !penalty.is_nan())
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((i, penalty)) = best {
            let (cluster, off) = pool[i];
            let c = cluster.position();
            let mut plant =
                Plant::detected(Point3::new(c.x, c.y, z), Some(cluster.bounds), penalty);
            plant.image = cluster.image();
            return Ok(Some(Selection {
                plant,
                projection: off.projection,
                candidate: Some(i),
                origin: Origin::Detected,
            }));
        }

        let origin = if pool.is_empty() {
            Origin::EmptyPool
        } else {
            Origin::NoValidCandidate
        };
        let p = point_along(first, scan.from.xy(), scan.to.xy())
            .ok_or(LocalizeError::DegenerateSegment)?;
        Ok(Some(Selection {
            plant: Plant::created(Point3::new(p.x, p.y, z)),
            projection: scan.forward_projection(first),
            candidate: None,
            origin,
        }))
    }

    /// Merge the picks of the two scan directions into one or two split
    /// points, ordered by projection.
    fn reconcile(&self, forward: Option<Selection>, backward: Option<Selection>) -> Vec<Selection> {
        let (f, b) = match (forward, backward) {
            (None, None) => return Vec::new(),
            (Some(one), None) | (None, Some(one)) => return vec![one],
            (Some(f), Some(b)) => (f, b),
        };

        if f.candidate.is_some() && f.candidate == b.candidate {
            return vec![f];
        }

        if (f.projection - b.projection).abs() <= self.params.overlap_tolerance() {
            let chosen = match (f.plant.is_created(), b.plant.is_created()) {
                (false, true) => f,
                (true, false) => b,
                (false, false) => {
                    let fp = f.plant.penalty.unwrap_or(f64::INFINITY);
                    let bp = b.plant.penalty.unwrap_or(f64::INFINITY);
                    if bp < fp {
                        b
                    } else {
                        f
                    }
                }
                (true, true) => {
                    let xy = midpoint(f.plant.position.xy(), b.plant.position.xy());
                    let z = 0.5 * (f.plant.position.z + b.plant.position.z);
                    Selection {
                        plant: Plant::created(Point3::new(xy.x, xy.y, z)),
                        projection: 0.5 * (f.projection + b.projection),
                        candidate: None,
                        origin: f.origin,
                    }
                }
            };
            return vec![chosen];
        }

        let mut both = vec![f, b];
        both.sort_by(|x, y| x.projection.total_cmp(&y.projection));
        both
    }
}
