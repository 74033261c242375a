//! Plane geometry helpers for the tile primitives.
//!
//! Pure functions over points; nothing here touches the heap.

use std::f64::consts::TAU;

/// Locations closer than this on both axes are the same patch location.
pub const LOCATION_EPSILON: f64 = 1e-6;

/// A point in the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Vertices of a regular `sides`-gon with unit side length.
///
/// The first side runs from the origin along the positive x axis and the
/// vertices wind counter-clockwise.
pub fn regular_polygon(sides: usize) -> Vec<Point> {
    let mut points = Vec::with_capacity(sides);
    let mut at = Point::new(0.0, 0.0);
    #[allow(
        clippy::cast_precision_loss,
        reason = "side counts are small integers"
    )]
    let turn = TAU / sides as f64;
    for k in 0..sides {
        points.push(at);
        #[allow(
            clippy::cast_precision_loss,
            reason = "side counts are small integers"
        )]
        let heading = turn * k as f64;
        at = Point::new(at.x + heading.cos(), at.y + heading.sin());
    }
    points
}

/// Vertex centroid (mean of the points). The origin for no points.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }
    #[allow(clippy::cast_precision_loss, reason = "vertex counts are small")]
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point::new(sx / n, sy / n)
}

/// Euclidean distance.
pub fn distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Hashable grid key: points that agree to within [`LOCATION_EPSILON`]
/// snap to the same key.
pub fn location_key(p: Point) -> (i64, i64) {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "keys only need to agree for nearby points"
    )]
    let snap = |v: f64| (v / LOCATION_EPSILON).round() as i64;
    (snap(p.x), snap(p.y))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
