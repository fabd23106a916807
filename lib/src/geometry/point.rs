//! Point types for 2D and 3D geometry.
//!
//! Layer geometry is carried as floating-point millimetres ([`Point`]); the
//! fixed-point [`IntPoint`] mirrors it for the offset and containment
//! routines, which need exact integer arithmetic.

use crate::{scale, unscale, Coord, CoordF, EPSILON};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D point in millimetres.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: CoordF,
    pub y: CoordF,
}

impl Point {
    /// Create a new point with the given coordinates.
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    /// Create a point at the origin (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Absolute-epsilon equality ([`EPSILON`] on each axis).
    #[inline]
    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    /// Relative-tolerance equality for near-coincident grid points.
    ///
    /// Each axis passes if `|a - b| <= tolerance * max(1, |a|, |b|)`.
    #[inline]
    pub fn approx_eq_relative(&self, other: &Point, tolerance: CoordF) -> bool {
        fn close(a: CoordF, b: CoordF, tolerance: CoordF) -> bool {
            (a - b).abs() <= tolerance * 1.0_f64.max(a.abs()).max(b.abs())
        }
        close(self.x, other.x, tolerance) && close(self.y, other.y, tolerance)
    }

    /// Calculate the squared distance to another point.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> CoordF {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Calculate the distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        self.distance_squared(other).sqrt()
    }

    /// Length of this point taken as a vector.
    #[inline]
    pub fn length(&self) -> CoordF {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// 2D cross product (z component).
    #[inline]
    pub fn cross(&self, other: &Point) -> CoordF {
        self.x * other.y - self.y * other.x
    }

    /// Dot product.
    #[inline]
    pub fn dot(&self, other: &Point) -> CoordF {
        self.x * other.x + self.y * other.y
    }

    /// Rotate by precomputed cos and sin values around `center`.
    #[inline]
    pub fn rotate_around_by_cos_sin(&self, center: Point, cos_a: CoordF, sin_a: CoordF) -> Self {
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self {
            x: center.x + cos_a * dx - sin_a * dy,
            y: center.y + sin_a * dx + cos_a * dy,
        }
    }

    /// Rotate this point around a center point (angle in radians).
    #[inline]
    pub fn rotate_around(&self, angle: CoordF, center: Point) -> Self {
        self.rotate_around_by_cos_sin(center, angle.cos(), angle.sin())
    }

    /// Linear interpolation towards `other`.
    #[inline]
    pub fn lerp(&self, other: &Point, t: CoordF) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Convert to the fixed-point representation.
    #[inline]
    pub fn to_int(&self) -> IntPoint {
        IntPoint::new(scale(self.x), scale(self.y))
    }

    /// Both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

impl Add for Point {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<CoordF> for Point {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: CoordF) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A 2D point with scaled integer coordinates.
///
/// 1 unit = 1 nanometer. Used for the cached vertex loop of a polygon.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntPoint {
    pub x: Coord,
    pub y: Coord,
}

impl IntPoint {
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Convert back to millimetres.
    #[inline]
    pub fn to_f64(&self) -> Point {
        Point::new(unscale(self.x), unscale(self.y))
    }

    /// Cross product of (b - a) and (c - a), widened to avoid overflow.
    #[inline]
    pub fn cross3(a: IntPoint, b: IntPoint, c: IntPoint) -> i128 {
        let abx = (b.x - a.x) as i128;
        let aby = (b.y - a.y) as i128;
        let acx = (c.x - a.x) as i128;
        let acy = (c.y - a.y) as i128;
        abx * acy - aby * acx
    }
}

impl fmt::Debug for IntPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntPoint({}, {})", self.x, self.y)
    }
}

impl From<Point> for IntPoint {
    #[inline]
    fn from(p: Point) -> Self {
        p.to_int()
    }
}

/// A 3D point in millimetres.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[CoordF; 3]", into = "[CoordF; 3]")]
pub struct Point3 {
    pub x: CoordF,
    pub y: CoordF,
    pub z: CoordF,
}

impl Point3 {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self { x, y, z }
    }

    /// Drop the Z coordinate.
    #[inline]
    pub fn xy(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Interpolate the XY position where the edge self→other reaches `z`.
    ///
    /// Callers guarantee `self.z != other.z`.
    #[inline]
    pub fn xy_at_z(&self, other: &Point3, z: CoordF) -> Point {
        let t = (z - self.z) / (other.z - self.z);
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl fmt::Debug for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

impl From<[CoordF; 3]> for Point3 {
    #[inline]
    fn from(v: [CoordF; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Point3> for [CoordF; 3] {
    #[inline]
    fn from(p: Point3) -> Self {
        [p.x, p.y, p.z]
    }
}

impl Sub for Point3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Point3 {
    /// 3D cross product.
    #[inline]
    pub fn cross(&self, other: &Point3) -> Point3 {
        Point3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}
