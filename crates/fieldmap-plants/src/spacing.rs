//! Smoothing pass over the plants of one segment.

use fieldmap_core::{midpoint, planar_distance, FieldItem, Plant};
use log::debug;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Relative slack on `max_ratio`; a plant half a spacing from a code sits
/// exactly on the default ratio.
const RATIO_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingFilterParams {
    /// Largest allowed ratio between the distances to the two neighbours.
    pub max_ratio: f64,
}

impl Default for SpacingFilterParams {
    fn default() -> Self {
        Self { max_ratio: 2.0 }
    }
}

/// Replaces plants that sit much closer to one neighbour than the other.
///
/// The segment boundaries act as fixed neighbours of the first and last
/// plant. The pass runs once, front to back, so a replaced plant is the
/// neighbour seen by the next one.
pub struct PlantSpacingFilter {
    params: SpacingFilterParams,
}

impl PlantSpacingFilter {
    pub fn new(params: SpacingFilterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SpacingFilterParams {
        &self.params
    }

    fn uneven(&self, before: f64, after: f64) -> bool {
        let small = before.min(after);
        let large = before.max(after);
        small <= 0.0 || large / small > self.params.max_ratio * (1.0 + RATIO_TOLERANCE)
    }

    /// Filter `plants` in place; returns how many were replaced.
    pub fn apply(&self, start: &FieldItem, plants: &mut [Plant], end: &FieldItem) -> usize {
        let mut replaced = 0;
        for i in 0..plants.len() {
            let prev = if i == 0 {
                start.position()
            } else {
                plants[i - 1].position
            };
            let next = match plants.get(i + 1) {
                Some(p) => p.position,
                None => end.position(),
            };
            let here = plants[i].position.xy();
            let before = planar_distance(prev.xy(), here);
            let after = planar_distance(here, next.xy());
            if self.uneven(before, after) {
                let xy = midpoint(prev.xy(), next.xy());
                debug!(
                    "replacing plant {i} ({before:.3} / {after:.3}) at ({:.3}, {:.3})",
                    xy.x, xy.y
                );
                plants[i] = Plant::created(Point3::new(xy.x, xy.y, 0.5 * (prev.z + next.z)));
                replaced += 1;
            }
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fieldmap_core::{Code, CodeKind, WorldRect};

    fn code(x: f64) -> FieldItem {
        FieldItem::Code(Code {
            kind: CodeKind::Group,
            name: "12".into(),
            position: Point3::new(x, 0.0, 0.0),
            item: None,
            row: Some(1),
        })
    }

    fn detected(x: f64) -> Plant {
        Plant::detected(
            Point3::new(x, 0.0, 0.0),
            Some(WorldRect::centered(nalgebra::Point2::new(x, 0.0), 0.05)),
            0.1,
        )
    }

    #[test]
    fn even_sequence_is_untouched() {
        let filter = PlantSpacingFilter::new(SpacingFilterParams::default());
        let mut plants: Vec<Plant> = [1.0, 2.0, 3.0].into_iter().map(detected).collect();
        assert_eq!(filter.apply(&code(0.0), &mut plants, &code(4.0)), 0);
        assert!(plants.iter().all(|p| !p.is_created()));
    }

    #[test]
    fn crowded_plant_moves_to_neighbour_midpoint() {
        let filter = PlantSpacingFilter::new(SpacingFilterParams::default());
        let mut plants: Vec<Plant> = [1.0, 2.6, 3.0].into_iter().map(detected).collect();
        assert_eq!(filter.apply(&code(0.0), &mut plants, &code(4.0)), 1);
        assert!(plants[1].is_created());
        assert_abs_diff_eq!(plants[1].position.x, 2.0);
        for (i, p) in plants.iter().enumerate() {
            let prev = if i == 0 { 0.0 } else { plants[i - 1].position.x };
            let next = plants.get(i + 1).map_or(4.0, |n| n.position.x);
            let (a, b) = (p.position.x - prev, next - p.position.x);
            assert!(a.max(b) / a.min(b) <= 2.0);
        }
    }

    #[test]
    fn half_spacing_next_to_codes_is_even() {
        let filter = PlantSpacingFilter::new(SpacingFilterParams::default());
        // Offsets built the way the localizer steps them, noise included.
        let start = 2.0_f64;
        let mut plants: Vec<Plant> = (0..6)
            .map(|k| detected(start + 0.3 + k as f64 * 0.6))
            .collect();
        let end = code(start + 3.6);
        assert_eq!(filter.apply(&code(start), &mut plants, &end), 0);
        assert!(plants.iter().all(|p| !p.is_created()));
    }

    #[test]
    fn coincident_neighbour_counts_as_uneven() {
        let filter = PlantSpacingFilter::new(SpacingFilterParams::default());
        let mut plants = vec![detected(0.0)];
        assert_eq!(filter.apply(&code(0.0), &mut plants, &code(2.0)), 1);
        assert_abs_diff_eq!(plants[0].position.x, 1.0);
    }

    #[test]
    fn empty_segment_is_noop() {
        let filter = PlantSpacingFilter::new(SpacingFilterParams::default());
        assert_eq!(filter.apply(&code(0.0), &mut [], &code(2.0)), 0);
    }
}
