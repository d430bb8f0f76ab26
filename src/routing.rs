//! Connection routing between oriented connector points

use crate::geometry::{BoundingBox, Point, Side};

/// Coordinates closer than this are treated as aligned
const ALIGN_TOLERANCE: f64 = 0.5;

/// Length of an arrowhead along the final segment
pub const ARROW_LENGTH: f64 = 8.0;

/// Half width of an arrowhead
pub const ARROW_HALF_WIDTH: f64 = 4.0;

/// Get the attachment point on a bounding box side
pub fn attachment_point(bounds: &BoundingBox, side: Side) -> Point {
    match side {
        Side::Top => Point::new(bounds.x + bounds.width / 2.0, bounds.y),
        Side::Bottom => Point::new(bounds.x + bounds.width / 2.0, bounds.bottom()),
        Side::Left => Point::new(bounds.x, bounds.y + bounds.height / 2.0),
        Side::Right => Point::new(bounds.right(), bounds.y + bounds.height / 2.0),
    }
}

/// Point reached by leaving `anchor` straight out through `side`
pub fn stub_point(anchor: Point, side: Side, length: f64) -> Point {
    let (dx, dy) = side.outward();
    anchor.translated(dx * length, dy * length)
}

/// Orthogonal elbow between two stub ends.
///
/// A stub leaving through a vertical side continues vertically first, one
/// leaving through a horizontal side continues horizontally first.
pub fn elbow(from: Point, from_side: Side, to: Point, to_side: Side) -> Vec<Point> {
    let aligned_x = (to.x - from.x).abs() < ALIGN_TOLERANCE;
    let aligned_y = (to.y - from.y).abs() < ALIGN_TOLERANCE;
    if aligned_x || aligned_y {
        return vec![from, to];
    }

    match (from_side.is_vertical(), to_side.is_vertical()) {
        (true, true) => {
            let mid_y = (from.y + to.y) / 2.0;
            vec![from, Point::new(from.x, mid_y), Point::new(to.x, mid_y), to]
        }
        (false, false) => {
            let mid_x = (from.x + to.x) / 2.0;
            vec![from, Point::new(mid_x, from.y), Point::new(mid_x, to.y), to]
        }
        (true, false) => vec![from, Point::new(from.x, to.y), to],
        (false, true) => vec![from, Point::new(to.x, from.y), to],
    }
}

/// Route a connection between two connector boxes.
///
/// The path leaves the start box through `start_side`, runs a stub of
/// `stub` length, passes every bend point (or an orthogonal elbow when there
/// are none), and enters the end box through `end_side` after another stub.
pub fn route(
    start_bounds: &BoundingBox,
    start_side: Side,
    end_bounds: &BoundingBox,
    end_side: Side,
    bend_points: &[Point],
    stub: f64,
) -> Vec<Point> {
    let start = attachment_point(start_bounds, start_side);
    let end = attachment_point(end_bounds, end_side);
    let start_stub = stub_point(start, start_side, stub);
    let end_stub = stub_point(end, end_side, stub);

    let mut path = vec![start];
    if bend_points.is_empty() {
        path.extend(elbow(start_stub, start_side, end_stub, end_side));
    } else {
        path.push(start_stub);
        path.extend_from_slice(bend_points);
        path.push(end_stub);
    }
    path.push(end);

    path.dedup_by(|a, b| a.distance(*b) < ALIGN_TOLERANCE);
    path
}

/// Total length of a polyline
pub fn path_length(path: &[Point]) -> f64 {
    path.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point halfway along a polyline by length
pub fn midpoint(path: &[Point]) -> Option<Point> {
    let first = *path.first()?;
    let mut remaining = path_length(path) / 2.0;
    for w in path.windows(2) {
        let segment = w[0].distance(w[1]);
        if segment >= remaining && segment > 0.0 {
            let t = remaining / segment;
            return Some(Point::new(
                w[0].x + (w[1].x - w[0].x) * t,
                w[0].y + (w[1].y - w[0].y) * t,
            ));
        }
        remaining -= segment;
    }
    Some(first)
}

/// Triangle at the end of a path: tip, then the two base corners
pub fn arrowhead(path: &[Point]) -> Option<[Point; 3]> {
    let tip = *path.last()?;
    // The last segment with non-zero length sets the direction
    let from = path
        .iter()
        .rev()
        .skip(1)
        .find(|p| p.distance(tip) > f64::EPSILON)?;
    let length = from.distance(tip);
    let (ux, uy) = ((tip.x - from.x) / length, (tip.y - from.y) / length);
    let base = Point::new(tip.x - ux * ARROW_LENGTH, tip.y - uy * ARROW_LENGTH);
    Some([
        tip,
        Point::new(base.x - uy * ARROW_HALF_WIDTH, base.y + ux * ARROW_HALF_WIDTH),
        Point::new(base.x + uy * ARROW_HALF_WIDTH, base.y - ux * ARROW_HALF_WIDTH),
    ])
}
