//! Angle and orientation math for placing figures around a node boundary.
//!
//! ## Angle Convention
//!
//! Angles are radians measured counter-clockwise from east, independent of the
//! screen's downward y-axis:
//! - 0 = east (right)
//! - π/2 = north (top)
//! - π = west (left)
//! - 3π/2 = south (bottom)
//!
//! The boundary point for angle `a` therefore lies in screen direction
//! `(cos a, -sin a)` from the node center.

use std::f64::consts::{PI, TAU};

use crate::geometry::{BoundingBox, Point, ShapeKind, Side};

/// Minimum separation between two arranged socket angles
pub const ANGLE_EPSILON: f64 = 0.011;

/// Step used when nudging a colliding angle
pub const NUDGE_STEP: f64 = PI / 10.0;

/// How many times the nudge step is halved before giving up on a free slot
const MAX_REFINEMENTS: u32 = 3;

/// Fold any finite angle into `[0, 2π)`. Non-finite input maps to 0.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let folded = angle.rem_euclid(TAU);
    // rem_euclid can round up to TAU for tiny negative inputs
    if folded >= TAU {
        0.0
    } else {
        folded
    }
}

/// Shortest distance between two angles around the circle, in `[0, π]`
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    d.min(TAU - d)
}

/// Whether `candidate` lies within `epsilon` of any occupied angle
pub fn collides(candidate: f64, occupied: &[f64], epsilon: f64) -> bool {
    occupied
        .iter()
        .any(|&taken| angular_distance(candidate, taken) < epsilon)
}

/// Angle of `point` as seen from `center`
pub fn angle_to(center: Point, point: Point) -> f64 {
    normalize_angle((center.y - point.y).atan2(point.x - center.x))
}

/// Unit vector in screen coordinates for an angle
pub fn direction(angle: f64) -> (f64, f64) {
    (angle.cos(), -angle.sin())
}

/// Bucket an angle into the side of `bounds` it points through.
///
/// The diagonals of the box separate the buckets, so a wide box gives more of
/// the circle to its top and bottom sides.
pub fn side_of(angle: f64, bounds: &BoundingBox) -> Side {
    let a = normalize_angle(angle);
    let corner = if bounds.width <= 0.0 && bounds.height <= 0.0 {
        PI / 4.0
    } else {
        bounds.height.atan2(bounds.width)
    };

    if a < corner || a >= TAU - corner {
        Side::Right
    } else if a < PI - corner {
        Side::Top
    } else if a < PI + corner {
        Side::Left
    } else {
        Side::Bottom
    }
}

/// Find an angle near `candidate` that keeps at least `epsilon` away from
/// every occupied angle.
///
/// The candidate is nudged by π/10 for one full turn. When the whole turn is
/// crowded the step is halved and only the new midpoints are probed, up to
/// three times. If nothing is free the candidate is returned unchanged and a
/// warning is logged.
pub fn find_free_angle(candidate: f64, occupied: &[f64], epsilon: f64) -> f64 {
    let candidate = normalize_angle(candidate);
    if !collides(candidate, occupied, epsilon) {
        return candidate;
    }

    let mut step = NUDGE_STEP;
    let probes = (TAU / step).round() as usize;
    for k in 1..probes {
        let probe = normalize_angle(candidate + k as f64 * step);
        if !collides(probe, occupied, epsilon) {
            return probe;
        }
    }

    for _ in 0..MAX_REFINEMENTS {
        let probes = (TAU / step).round() as usize;
        for k in 0..probes {
            let probe = normalize_angle(candidate + step / 2.0 + k as f64 * step);
            if !collides(probe, occupied, epsilon) {
                return probe;
            }
        }
        step /= 2.0;
    }

    tracing::warn!(
        candidate,
        occupied = occupied.len(),
        "no free socket angle left, accepting collision"
    );
    candidate
}

/// Point where a ray from the center of `bounds` at `angle` leaves `shape`
pub fn boundary_point(shape: ShapeKind, bounds: &BoundingBox, angle: f64) -> Point {
    let center = bounds.center();
    let a = bounds.width / 2.0;
    let b = bounds.height / 2.0;
    if a <= 0.0 || b <= 0.0 {
        return center;
    }

    let (dx, dy) = direction(angle);
    let t = match shape {
        ShapeKind::Ellipse => 1.0 / ((dx / a).powi(2) + (dy / b).powi(2)).sqrt(),
        ShapeKind::Diamond => 1.0 / (dx.abs() / a + dy.abs() / b),
        ShapeKind::Rectangle | ShapeKind::RoundedRectangle => {
            let tx = if dx.abs() > f64::EPSILON {
                a / dx.abs()
            } else {
                f64::INFINITY
            };
            let ty = if dy.abs() > f64::EPSILON {
                b / dy.abs()
            } else {
                f64::INFINITY
            };
            tx.min(ty)
        }
    };

    Point::new(center.x + dx * t, center.y + dy * t)
}

/// Direction of a quarter turn applied to every tag on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Axis a node's tags are mirrored across
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    /// Mirror left and right (reflect across the vertical axis)
    Horizontal,
    /// Mirror top and bottom (reflect across the horizontal axis)
    Vertical,
}

/// Rotate an angle by a quarter turn
pub fn rotate_angle(angle: f64, direction: RotationDirection) -> f64 {
    match direction {
        RotationDirection::Clockwise => normalize_angle(angle - PI / 2.0),
        RotationDirection::CounterClockwise => normalize_angle(angle + PI / 2.0),
    }
}

/// Mirror an angle across an axis
pub fn flip_angle(angle: f64, axis: FlipAxis) -> f64 {
    match axis {
        FlipAxis::Horizontal => normalize_angle(PI - angle),
        FlipAxis::Vertical => normalize_angle(-angle),
    }
}
