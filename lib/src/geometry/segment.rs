//! Directed line segment.

use super::Point;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A directed segment from `start` to `end`, in millimetres.
///
/// Segments carry no role of their own; the owning [`super::Polygon`] does.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    #[inline]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// A zero-length segment anchored at `p`.
    #[inline]
    pub const fn point(p: Point) -> Self {
        Self { start: p, end: p }
    }

    /// Start and end coincide within epsilon.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.start.approx_eq(&self.end)
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        self.start.distance(&self.end)
    }

    #[inline]
    pub fn direction(&self) -> Point {
        self.end - self.start
    }

    #[inline]
    pub fn midpoint(&self) -> Point {
        self.start.lerp(&self.end, 0.5)
    }

    /// The same segment traversed the other way.
    #[inline]
    pub fn reversed(&self) -> Self {
        Self::new(self.end, self.start)
    }

    #[inline]
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }

    /// Perpendicular distance from `p` to the infinite line through this
    /// segment. Falls back to the point distance when degenerate.
    pub fn distance_to_line(&self, p: &Point) -> CoordF {
        let d = self.direction();
        let len = d.length();
        if len <= crate::EPSILON {
            return self.start.distance(p);
        }
        (d.cross(&(*p - self.start))).abs() / len
    }

    /// Rotate both endpoints around `center`.
    pub fn rotated(&self, angle: CoordF, center: Point) -> Self {
        let (sin_a, cos_a) = angle.sin_cos();
        Self::new(
            self.start.rotate_around_by_cos_sin(center, cos_a, sin_a),
            self.end.rotate_around_by_cos_sin(center, cos_a, sin_a),
        )
    }

    /// Translate both endpoints by `v`.
    #[inline]
    pub fn translated(&self, v: Point) -> Self {
        Self::new(self.start + v, self.end + v)
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate() {
        let p = Point::new(3.0, 4.0);
        assert!(Segment::point(p).is_degenerate());
        assert!(Segment::new(p, Point::new(3.0, 4.0000005)).is_degenerate());
        assert!(!Segment::new(p, Point::new(3.0, 4.1)).is_degenerate());
    }

    #[test]
    fn test_reverse() {
        let mut s = Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 2.0));
        s.reverse();
        assert_eq!(s.start, Point::new(1.0, 2.0));
        assert_eq!(s.reversed().start, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_distance_to_line() {
        let s = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((s.distance_to_line(&Point::new(5.0, 3.0)) - 3.0).abs() < 1e-12);
        // Beyond the end still measures against the infinite line.
        assert!((s.distance_to_line(&Point::new(20.0, -2.0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_length() {
        let s = Segment::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!((s.length() - 5.0).abs() < 1e-12);
    }
}
