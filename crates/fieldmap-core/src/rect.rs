use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::geometry::planar_distance;

/// Bounding quadrilateral of an object in world coordinates.
///
/// Corners are stored in the order they were produced (a rotated image
/// rectangle projected into the world keeps its rotation). Unions are
/// axis-aligned in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    pub corners: [Point2<f64>; 4],
}

impl WorldRect {
    pub fn new(corners: [Point2<f64>; 4]) -> Self {
        Self { corners }
    }

    /// Axis-aligned rectangle spanning `min`..`max`.
    pub fn from_min_max(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self {
            corners: [
                Point2::new(min.x, min.y),
                Point2::new(min.x, max.y),
                Point2::new(max.x, min.y),
                Point2::new(max.x, max.y),
            ],
        }
    }

    /// Axis-aligned square of side `size` centred on `center`.
    pub fn centered(center: Point2<f64>, size: f64) -> Self {
        let h = 0.5 * size;
        Self::from_min_max(
            Point2::new(center.x - h, center.y - h),
            Point2::new(center.x + h, center.y + h),
        )
    }

    /// `(min, max)` of the axis-aligned box containing all corners.
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for c in &self.corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        (min, max)
    }

    /// Width and height of the axis-aligned box.
    pub fn extent(&self) -> (f64, f64) {
        let (min, max) = self.bounds();
        (max.x - min.x, max.y - min.y)
    }

    /// Mean of the four corners.
    pub fn center(&self) -> Point2<f64> {
        let sum = self
            .corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, c| acc + c.coords);
        Point2::from(sum / 4.0)
    }

    /// Axis-aligned rectangle containing both inputs.
    pub fn union(&self, other: &WorldRect) -> WorldRect {
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        WorldRect::from_min_max(
            Point2::new(a_min.x.min(b_min.x), a_min.y.min(b_min.y)),
            Point2::new(a_max.x.max(b_max.x), a_max.y.max(b_max.y)),
        )
    }

    /// Smallest distance between any corner of `self` and any corner of `other`.
    pub fn corner_distance(&self, other: &WorldRect) -> f64 {
        let mut best = f64::INFINITY;
        for a in &self.corners {
            for b in &other.corners {
                best = best.min(planar_distance(*a, *b));
            }
        }
        best
    }

    /// Axis-aligned overlap test, `pad` grows `self` on every side.
    pub fn overlaps(&self, other: &WorldRect, pad: f64) -> bool {
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        a_max.x + pad > b_min.x
            && a_min.x - pad < b_max.x
            && a_max.y + pad > b_min.y
            && a_min.y - pad < b_max.y
    }

    /// True if `p` lies inside the axis-aligned box grown by `pad`.
    pub fn contains(&self, p: Point2<f64>, pad: f64) -> bool {
        let (min, max) = self.bounds();
        p.x >= min.x - pad && p.x <= max.x + pad && p.y >= min.y - pad && p.y <= max.y + pad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn union_is_axis_aligned_hull() {
        let a = WorldRect::from_min_max(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = WorldRect::from_min_max(Point2::new(2.0, -1.0), Point2::new(3.0, 0.5));
        let u = a.union(&b);
        let (min, max) = u.bounds();
        assert_eq!(min, Point2::new(0.0, -1.0));
        assert_eq!(max, Point2::new(3.0, 1.0));
        assert_eq!(u.extent(), (3.0, 2.0));
    }

    #[test]
    fn corner_distance_is_minimum_over_corner_pairs() {
        let a = WorldRect::from_min_max(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = WorldRect::from_min_max(Point2::new(1.3, 0.0), Point2::new(2.0, 1.0));
        assert_abs_diff_eq!(a.corner_distance(&b), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(b.corner_distance(&a), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn rotated_rect_center_and_extent() {
        let r = WorldRect::new([
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 1.0),
        ]);
        assert_eq!(r.center(), Point2::new(1.0, 1.0));
        assert_eq!(r.extent(), (2.0, 2.0));
        assert!(r.contains(Point2::new(1.9, 1.9), 0.0));
        assert!(!r.contains(Point2::new(2.2, 1.0), 0.1));
    }

    #[test]
    fn overlap_respects_padding() {
        let a = WorldRect::from_min_max(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = WorldRect::from_min_max(Point2::new(1.5, 0.0), Point2::new(2.0, 1.0));
        assert!(!a.overlaps(&b, 0.0));
        assert!(a.overlaps(&b, 0.6));
    }
}
