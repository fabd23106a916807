//! Polygon type: an ordered run of connected segments with a single role.

use super::{BoundingBox, IntPoint, Point, Segment};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a polygon is used for once it reaches a finished layer.
///
/// A polygon has exactly one role; the variants are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Outer boundary of a solid region.
    #[default]
    Contour,
    /// Boundary of a cavity inside a solid region.
    Hole,
    /// Wall loop generated by inward offsetting.
    Shell,
    /// Low-density interior fill.
    SparseInfill,
    /// Solid fill for top and bottom surfaces.
    DenseInfill,
    Support,
    Adhesion,
    /// A chain the stitcher could not close.
    Open,
}

impl Role {
    /// All roles, in output order.
    pub const ALL: [Role; 8] = [
        Role::Contour,
        Role::Hole,
        Role::Shell,
        Role::DenseInfill,
        Role::SparseInfill,
        Role::Support,
        Role::Adhesion,
        Role::Open,
    ];

    /// Sort key for the final per-layer ordering pass.
    pub const fn rank(self) -> u8 {
        match self {
            Role::Contour => 0,
            Role::Hole => 1,
            Role::Shell => 2,
            Role::DenseInfill => 3,
            Role::SparseInfill => 4,
            Role::Support => 5,
            Role::Adhesion => 6,
            Role::Open => 7,
        }
    }

    /// Roles that describe a region boundary rather than a fill path.
    pub const fn is_boundary(self) -> bool {
        matches!(self, Role::Contour | Role::Hole)
    }

    pub const fn is_infill(self) -> bool {
        matches!(self, Role::SparseInfill | Role::DenseInfill)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Role::Contour => "contour",
            Role::Hole => "hole",
            Role::Shell => "shell",
            Role::SparseInfill => "sparse_infill",
            Role::DenseInfill => "dense_infill",
            Role::Support => "support",
            Role::Adhesion => "adhesion",
            Role::Open => "open",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered sequence of connected segments plus one [`Role`].
///
/// Each segment's end coincides with the next segment's start. The polygon
/// is closed when it has more than two segments and the last end meets the
/// first start. A fixed-point copy of the vertex loop is kept alongside the
/// segments and rebuilt by every mutating method.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolygonData")]
pub struct Polygon {
    segments: Vec<Segment>,
    role: Role,
    #[serde(skip)]
    int_loop: Vec<IntPoint>,
}

/// Serialized form of [`Polygon`]; the fixed-point loop is rebuilt on load.
#[derive(Deserialize)]
struct PolygonData {
    segments: Vec<Segment>,
    role: Role,
}

impl From<PolygonData> for Polygon {
    fn from(data: PolygonData) -> Self {
        Polygon::from_segments(data.segments, data.role)
    }
}

impl Polygon {
    /// Create an empty polygon with the given role.
    pub fn new(role: Role) -> Self {
        Self {
            segments: Vec::new(),
            role,
            int_loop: Vec::new(),
        }
    }

    /// Create a polygon from already-connected segments.
    pub fn from_segments(segments: Vec<Segment>, role: Role) -> Self {
        let mut polygon = Self {
            segments,
            role,
            int_loop: Vec::new(),
        };
        polygon.rebuild_cache();
        polygon
    }

    /// Create a closed polygon through `points`, joining the last back to the first.
    pub fn closed(points: &[Point], role: Role) -> Self {
        let n = points.len();
        let segments = (0..n)
            .map(|i| Segment::new(points[i], points[(i + 1) % n]))
            .collect();
        Self::from_segments(segments, role)
    }

    /// Create an open polygon (polyline) through `points`.
    pub fn open(points: &[Point], role: Role) -> Self {
        let segments = points
            .windows(2)
            .map(|w| Segment::new(w[0], w[1]))
            .collect();
        Self::from_segments(segments, role)
    }

    /// Create a one-segment open polygon.
    pub fn line(start: Point, end: Point, role: Role) -> Self {
        Self::from_segments(vec![Segment::new(start, end)], role)
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Return this polygon with a different role.
    #[inline]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a segment.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
        self.rebuild_cache();
    }

    /// More than two segments and last end meets first start.
    pub fn is_closed(&self) -> bool {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) if self.segments.len() > 2 => {
                first.start.approx_eq(&last.end)
            }
            _ => false,
        }
    }

    /// First point of the polygon.
    pub fn first_point(&self) -> Option<Point> {
        self.segments.first().map(|s| s.start)
    }

    /// Last point of the polygon.
    pub fn last_point(&self) -> Option<Point> {
        self.segments.last().map(|s| s.end)
    }

    /// Vertex list. For a closed polygon the closing point is not repeated.
    pub fn vertices(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self.segments.iter().map(|s| s.start).collect();
        if !self.is_closed() {
            if let Some(last) = self.segments.last() {
                points.push(last.end);
            }
        }
        points
    }

    /// Fixed-point vertex loop, in sync with the segments.
    #[inline]
    pub fn int_loop(&self) -> &[IntPoint] {
        &self.int_loop
    }

    /// Recompute the fixed-point vertex loop from the segments.
    fn rebuild_cache(&mut self) {
        self.int_loop = self.vertices().iter().map(Point::to_int).collect();
    }

    /// Signed area (shoelace). Positive when counter-clockwise.
    pub fn signed_area(&self) -> CoordF {
        if !self.is_closed() {
            return 0.0;
        }
        let mut sum = 0.0;
        for s in &self.segments {
            sum += s.start.x * s.end.y - s.end.x * s.start.y;
        }
        sum * 0.5
    }

    /// Unsigned area.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    #[inline]
    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    /// Reverse traversal direction.
    pub fn reverse(&mut self) {
        self.segments.reverse();
        for s in &mut self.segments {
            s.reverse();
        }
        self.rebuild_cache();
    }

    pub fn make_counter_clockwise(&mut self) {
        if self.is_clockwise() {
            self.reverse();
        }
    }

    pub fn make_clockwise(&mut self) {
        if self.is_counter_clockwise() {
            self.reverse();
        }
    }

    /// Sum of segment lengths.
    pub fn length(&self) -> CoordF {
        self.segments.iter().map(Segment::length).sum()
    }

    /// Crossing-number containment test on the fixed-point loop.
    ///
    /// Points exactly on the boundary may fall either way.
    pub fn contains_point(&self, p: &Point) -> bool {
        contains_int(&self.int_loop, p.to_int())
    }

    /// Every vertex of `other` lies inside this polygon.
    pub fn contains_polygon(&self, other: &Polygon) -> bool {
        !other.int_loop.is_empty()
            && other
                .int_loop
                .iter()
                .all(|&p| contains_int(&self.int_loop, p))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.segments.iter().flat_map(|s| [s.start, s.end]))
    }

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.start.is_finite() && s.end.is_finite())
    }

    pub fn translate(&mut self, v: Point) {
        for s in &mut self.segments {
            *s = s.translated(v);
        }
        self.rebuild_cache();
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polygon")
            .field("role", &self.role)
            .field("segments", &self.segments)
            .finish()
    }
}

/// Crossing-number point-in-loop test with exact integer arithmetic.
pub fn contains_int(ring: &[IntPoint], p: IntPoint) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let pi = ring[i];
        let pj = ring[j];

        if (pi.y > p.y) != (pj.y > p.y) {
            // x of the edge at p.y, compared without division:
            // p.x < pi.x + (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y)
            let lhs = (p.x as i128 - pi.x as i128) * (pj.y as i128 - pi.y as i128);
            let rhs = (pj.x as i128 - pi.x as i128) * (p.y as i128 - pi.y as i128);
            let crosses = if pj.y > pi.y { lhs < rhs } else { lhs > rhs };
            if crosses {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}
