//! Loop cleanup after stitching and offsetting.
//!
//! Triangulated side faces split a straight contour edge into several
//! collinear pieces, and offsetting leaves near-duplicate vertices at sharp
//! corners. Both are removed here before a loop is used further.

use super::{Point, Polygon, Segment};
use crate::CoordF;

/// Minimum segment length below which a vertex is merged into its
/// predecessor (5 microns).
pub const MINIMUM_SEGMENT_LENGTH: CoordF = 0.005;

/// Maximum distance from the line through its neighbours at which a vertex
/// is considered collinear (1 micron).
pub const COLLINEARITY_THRESHOLD: CoordF = 0.001;

/// Drop vertices closer than `tolerance` to the last kept vertex.
///
/// The loop is treated as closed: trailing vertices that coincide with the
/// first one are dropped too.
pub fn remove_duplicate_points(points: &[Point], tolerance: CoordF) -> Vec<Point> {
    let mut result: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        match result.last() {
            Some(last) if last.distance(&p) < tolerance => {}
            _ => result.push(p),
        }
    }
    while result.len() > 1 && result[0].distance(&result[result.len() - 1]) < tolerance {
        result.pop();
    }
    result
}

/// Drop vertices within `tolerance` of the line through their neighbours.
///
/// Repeats until a full pass removes nothing or fewer than three vertices
/// remain.
pub fn remove_collinear_points(points: &[Point], tolerance: CoordF) -> Vec<Point> {
    let mut current = points.to_vec();
    loop {
        let n = current.len();
        if n < 3 {
            return current;
        }

        let mut kept: Vec<Point> = Vec::with_capacity(n);
        for i in 0..n {
            let prev = kept.last().copied().unwrap_or(current[n - 1]);
            let next = current[(i + 1) % n];
            if Segment::new(prev, next).distance_to_line(&current[i]) > tolerance {
                kept.push(current[i]);
            }
        }

        if kept.len() == n {
            return kept;
        }
        current = kept;
    }
}

/// Run both cleanup passes over a closed vertex loop.
pub fn cleanup_loop(points: &[Point]) -> Vec<Point> {
    let deduped = remove_duplicate_points(points, MINIMUM_SEGMENT_LENGTH);
    remove_collinear_points(&deduped, COLLINEARITY_THRESHOLD)
}

/// Clean up a closed polygon, keeping its role.
///
/// Returns `None` when fewer than three vertices survive. Open polygons are
/// returned unchanged.
pub fn cleanup_polygon(polygon: &Polygon) -> Option<Polygon> {
    if !polygon.is_closed() {
        return Some(polygon.clone());
    }
    let cleaned = cleanup_loop(&polygon.vertices());
    if cleaned.len() < 3 {
        return None;
    }
    Some(Polygon::closed(&cleaned, polygon.role()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Role;

    #[test]
    fn test_remove_duplicates() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(0.001, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.002),
        ];
        let out = remove_duplicate_points(&pts, MINIMUM_SEGMENT_LENGTH);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_remove_collinear_on_split_edge() {
        // Triangle with one edge split in two.
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        let out = remove_collinear_points(&pts, COLLINEARITY_THRESHOLD);
        assert_eq!(out.len(), 3);
        assert!(!out.iter().any(|p| p.approx_eq(&Point::new(5.0, 0.0))));
    }

    #[test]
    fn test_split_point_at_loop_start() {
        let pts = vec![
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ];
        let out = cleanup_loop(&pts);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_keeps_real_corners() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert_eq!(cleanup_loop(&pts).len(), 4);
    }

    #[test]
    fn test_cleanup_polygon_vanishes() {
        let sliver = Polygon::closed(
            &[
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(2.0, 0.0005),
            ],
            Role::Shell,
        );
        assert!(cleanup_polygon(&sliver).is_none());
    }
}
