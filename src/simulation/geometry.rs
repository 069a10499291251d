//! Distance helpers for topology construction.

use super::types::Point;

/// Squared Euclidean distance (avoids a sqrt when comparing distances).
///
/// # Parameters
///
/// * `a` - First point
/// * `b` - Second point
///
/// # Returns
///
/// The squared distance (dx² + dy²).
pub fn distance2(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Whether `to` lies strictly inside the circle of `radius` around `from`.
pub fn in_range(from: &Point, to: &Point, radius: f64) -> bool {
    distance2(from, to) < radius * radius
}
