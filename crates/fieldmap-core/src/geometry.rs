//! Planar geometry on world (easting, northing) coordinates.
//!
//! Everything here works on the XY plane; altitude is carried by callers
//! but never enters a distance or angle.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Axis lengths shorter than this are treated as degenerate.
const MIN_AXIS_LENGTH: f64 = 1e-12;

/// Position of a point relative to a directed axis `a -> b`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisOffset {
    /// Signed perpendicular distance; positive on the left of travel.
    pub lateral: f64,
    /// Distance travelled along the axis from `a` (negative behind `a`).
    pub projection: f64,
}

/// Straight-line XY distance between two points.
#[inline]
pub fn planar_distance(a: Point2<f64>, b: Point2<f64>) -> f64 {
    (b - a).norm()
}

/// Decompose `p` into lateral and projection components along `a -> b`.
///
/// Returns `None` when `a` and `b` coincide.
pub fn axis_offset(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> Option<AxisOffset> {
    let axis = b - a;
    let len = axis.norm();
    if len < MIN_AXIS_LENGTH {
        return None;
    }
    let dir = axis / len;
    let to_p = p - a;
    let projection = to_p.dot(&dir);
    // z of (axis x to_p) gives the side.
    let lateral = dir.x * to_p.y - dir.y * to_p.x;
    Some(AxisOffset {
        lateral,
        projection,
    })
}

/// Point reached after travelling `projection` along `a -> b`.
pub fn point_along(projection: f64, a: Point2<f64>, b: Point2<f64>) -> Option<Point2<f64>> {
    let axis = b - a;
    let len = axis.norm();
    if len < MIN_AXIS_LENGTH {
        return None;
    }
    Some(a + axis * (projection / len))
}

/// Midpoint of two points.
#[inline]
pub fn midpoint(a: Point2<f64>, b: Point2<f64>) -> Point2<f64> {
    Point2::from((a.coords + b.coords) * 0.5)
}

/// Bearing of `b` seen from `a` in degrees; 0 is east, counter-clockwise positive.
pub fn bearing_deg(a: Point2<f64>, b: Point2<f64>) -> f64 {
    let d: Vector2<f64> = b - a;
    d.y.atan2(d.x).to_degrees()
}

/// Wrap an angle in degrees to `(-180, 180]`.
pub fn wrap_angle_deg(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// True if `a` is strictly within `tolerance` degrees of `b` on the circle.
pub fn angles_within(a: f64, b: f64, tolerance: f64) -> bool {
    wrap_angle_deg(a - b).abs() < tolerance
}

/// Result of orienting an unordered pair along an expected direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairOrder {
    /// The first point is the start.
    AsGiven,
    /// The second point is the start.
    Swapped,
}

/// Decide which of two points comes first when travelling along `direction_deg`.
///
/// Returns `None` when the bearing between them is not within `tolerance_deg`
/// of either the direction or its reverse.
pub fn orient_pair(
    first: Point2<f64>,
    second: Point2<f64>,
    direction_deg: f64,
    tolerance_deg: f64,
) -> Option<PairOrder> {
    let bearing = bearing_deg(first, second);
    if angles_within(bearing, direction_deg, tolerance_deg) {
        Some(PairOrder::AsGiven)
    } else if angles_within(bearing, direction_deg + 180.0, tolerance_deg) {
        Some(PairOrder::Swapped)
    } else {
        None
    }
}

/// Sum of straight-line hops through an ordered point sequence.
pub fn path_length(points: &[Point2<f64>]) -> f64 {
    points
        .windows(2)
        .map(|w| planar_distance(w[0], w[1]))
        .sum()
}
