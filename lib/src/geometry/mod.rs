//! Geometry primitives for the slicer.
//!
//! This module provides the fundamental geometric types used throughout the slicing pipeline:
//! - [`Point`] and [`Point3`] - 2D and 3D points in millimetres
//! - [`IntPoint`] - fixed-point 2D point used by offset and containment code
//! - [`Segment`] - directed segment between two points
//! - [`Polygon`] - connected segments tagged with a [`Role`]
//! - [`BoundingBox`] - axis-aligned 2D bounds
//!
//! ## Coordinate System
//!
//! Layer geometry is kept in floating-point millimetres. Each polygon also
//! carries its vertex loop scaled by `SCALING_FACTOR` (1,000,000), so 1 unit =
//! 1 nanometer, for routines that need exact integer predicates.

mod point;
mod polygon;
mod segment;
pub mod simplify;

pub use point::{IntPoint, Point, Point3};
pub use polygon::{contains_int, Polygon, Role};
pub use segment::Segment;
pub use simplify::{
    cleanup_loop, cleanup_polygon, remove_collinear_points, remove_duplicate_points,
    COLLINEARITY_THRESHOLD, MINIMUM_SEGMENT_LENGTH,
};

use crate::CoordF;

/// Axis-aligned 2D bounding box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point will expand.
    pub fn empty() -> Self {
        Self {
            min: Point::new(CoordF::INFINITY, CoordF::INFINITY),
            max: Point::new(CoordF::NEG_INFINITY, CoordF::NEG_INFINITY),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.merge_point(p);
        }
        bb
    }

    pub fn merge_point(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.merge_point(other.min);
        self.merge_point(other.max);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    #[inline]
    pub fn width(&self) -> CoordF {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> CoordF {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Point {
        self.min.lerp(&self.max, 0.5)
    }

    /// Length of the diagonal.
    #[inline]
    pub fn diagonal(&self) -> CoordF {
        self.min.distance(&self.max)
    }

    /// Grow by `d` on every side.
    pub fn expanded(&self, d: CoordF) -> Self {
        Self::new(
            Point::new(self.min.x - d, self.min.y - d),
            Point::new(self.max.x + d, self.max.y + d),
        )
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Total bounds of a list of polygons.
pub fn bounding_box_of(polygons: &[Polygon]) -> BoundingBox {
    let mut bb = BoundingBox::empty();
    for p in polygons {
        bb.merge(&p.bounding_box());
    }
    bb
}
