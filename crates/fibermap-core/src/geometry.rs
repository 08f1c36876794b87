// ── Planar geometry helpers ──
//
// Latitude/longitude are treated as plain planar coordinates. At the
// scale of a street-level edit that is accurate enough for picking.

use crate::model::{Device, Point};

/// Euclidean distance from `p` to the segment `a`–`b`.
///
/// A degenerate segment (`a == b`) reduces to the point distance.
pub fn distance_point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.lat - a.lat;
    let dy = b.lng - a.lng;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return (p.lat - a.lat).hypot(p.lng - a.lng);
    }

    let t = (((p.lat - a.lat) * dx + (p.lng - a.lng) * dy) / len_sq).clamp(0.0, 1.0);
    let proj_lat = a.lat + t * dx;
    let proj_lng = a.lng + t * dy;
    (p.lat - proj_lat).hypot(p.lng - proj_lng)
}

/// Waypoint index at which `click` should be inserted into the polyline
/// `path = [from, ..waypoints, to]`.
///
/// Picks the segment closest to the click; on ties the first segment
/// wins. Segment `i` (between `path[i]` and `path[i + 1]`) maps to
/// waypoint index `i`. Paths with fewer than two points yield `0`.
pub fn nearest_insertion_index(path: &[Point], click: Point) -> usize {
    let mut best_index = 0;
    let mut best_distance = f64::INFINITY;

    for (i, pair) in path.windows(2).enumerate() {
        let d = distance_point_to_segment(click, pair[0], pair[1]);
        if d < best_distance {
            best_distance = d;
            best_index = i;
        }
    }

    best_index
}

/// `a` and `b` coincide within `epsilon` on both axes.
pub fn coincident(a: Point, b: Point, epsilon: f64) -> bool {
    (a.lat - b.lat).abs() <= epsilon && (a.lng - b.lng).abs() <= epsilon
}

/// First device (in iteration order) sitting on `point`.
pub fn find_snap_target<'a, I>(point: Point, devices: I, epsilon: f64) -> Option<&'a Device>
where
    I: IntoIterator<Item = &'a Device>,
{
    devices
        .into_iter()
        .find(|d| coincident(d.position, point, epsilon))
}

/// Whether `point` sits on any device.
pub fn is_snapped<'a, I>(point: Point, devices: I, epsilon: f64) -> bool
where
    I: IntoIterator<Item = &'a Device>,
{
    find_snap_target(point, devices, epsilon).is_some()
}
