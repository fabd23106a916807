//! Triangle-plane intersection.
//!
//! Each triangle is cut against a horizontal plane and classified into one of
//! four outcomes. Segments are directed so that an outward-facing,
//! counter-clockwise mesh yields counter-clockwise outer contours when viewed
//! from +Z.

use crate::geometry::{Point, Polygon, Role, Segment};
use crate::mesh::Triangle;
use crate::{CoordF, EPSILON};

/// Where a vertex sits relative to the cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Below,
    On,
    Above,
}

/// Classify a vertex height against the plane.
///
/// Within [`EPSILON`] counts as on the plane. A NaN height classifies as
/// below; the resulting non-finite geometry is caught by the layer check.
#[inline]
pub fn classify(z: CoordF, plane_z: CoordF) -> Side {
    let dz = z - plane_z;
    if dz.abs() <= EPSILON {
        Side::On
    } else if dz > 0.0 {
        Side::Above
    } else {
        Side::Below
    }
}

/// Outcome of cutting one triangle.
#[derive(Debug, Clone, PartialEq)]
pub enum CutResult {
    /// The plane misses the triangle.
    None,
    /// A single vertex touches the plane; zero-length placeholder.
    Touch(Point),
    /// The plane crosses the triangle along a segment.
    Segment(Segment),
    /// The triangle lies in the plane.
    Surface(Polygon),
}

impl CutResult {
    pub fn is_none(&self) -> bool {
        matches!(self, CutResult::None)
    }
}

/// Cut `triangle` with the horizontal plane at `plane_z`.
pub fn cut_triangle(triangle: &Triangle, plane_z: CoordF) -> CutResult {
    let p = [
        triangle.position(0),
        triangle.position(1),
        triangle.position(2),
    ];
    let sides = p.map(|v| classify(v.z, plane_z));

    let on = sides.iter().filter(|&&s| s == Side::On).count();
    let above = sides.iter().filter(|&&s| s == Side::Above).count();
    let below = sides.iter().filter(|&&s| s == Side::Below).count();

    match (on, above, below) {
        (0, 3, 0) | (0, 0, 3) => CutResult::None,

        (3, _, _) => {
            let mut surface =
                Polygon::closed(&[p[0].xy(), p[1].xy(), p[2].xy()], Role::DenseInfill);
            surface.make_counter_clockwise();
            CutResult::Surface(surface)
        }

        (2, _, _) => {
            // Edge k -> l lies in the plane, the third vertex is off it.
            let off = sides.iter().position(|&s| s != Side::On).unwrap_or(0);
            let k = (off + 1) % 3;
            let l = (off + 2) % 3;
            let seg = Segment::new(p[k].xy(), p[l].xy());
            if sides[off] == Side::Below {
                CutResult::Segment(seg.reversed())
            } else {
                CutResult::Segment(seg)
            }
        }

        (1, a, b) if a == 2 || b == 2 => {
            let i = sides.iter().position(|&s| s == Side::On).unwrap_or(0);
            CutResult::Touch(p[i].xy())
        }

        (1, _, _) => {
            // Remaining vertices straddle the plane.
            let o = sides.iter().position(|&s| s == Side::On).unwrap_or(0);
            let u = (o + 1) % 3;
            let w = (o + 2) % 3;
            let crossing = p[u].xy_at_z(&p[w], plane_z);
            CutResult::Segment(Segment::new(crossing, p[o].xy()))
        }

        _ => {
            // One vertex alone on its side: the minority vertex m.
            let minority = if above == 1 { Side::Above } else { Side::Below };
            let m = sides.iter().position(|&s| s == minority).unwrap_or(0);
            let prev = (m + 2) % 3;
            let next = (m + 1) % 3;
            let a = p[m].xy_at_z(&p[prev], plane_z);
            let b = p[m].xy_at_z(&p[next], plane_z);
            if minority == Side::Below {
                CutResult::Segment(Segment::new(a, b))
            } else {
                CutResult::Segment(Segment::new(b, a))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::from_positions(a.into(), b.into(), c.into())
    }

    #[test]
    fn test_miss() {
        let t = tri([0.0, 0.0, 1.0], [1.0, 0.0, 2.0], [0.0, 1.0, 3.0]);
        assert_eq!(cut_triangle(&t, 0.5), CutResult::None);
        assert_eq!(cut_triangle(&t, 3.5), CutResult::None);
    }

    #[test]
    fn test_touch() {
        let t = tri([0.0, 0.0, 1.0], [1.0, 0.0, 2.0], [0.0, 1.0, 3.0]);
        assert_eq!(cut_triangle(&t, 1.0), CutResult::Touch(Point::new(0.0, 0.0)));
        assert_eq!(cut_triangle(&t, 3.0), CutResult::Touch(Point::new(0.0, 1.0)));
    }

    #[test]
    fn test_two_on_plane() {
        let t = tri([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 3.0]);
        match cut_triangle(&t, 1.0) {
            CutResult::Segment(s) => {
                assert!(s.start.approx_eq(&Point::new(0.0, 0.0)));
                assert!(s.end.approx_eq(&Point::new(1.0, 0.0)));
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_one_on_plane_straddling() {
        // Vertex 0 on the plane, 1 above, 2 below.
        let t = tri([0.0, 0.0, 1.0], [2.0, 0.0, 2.0], [2.0, 2.0, 0.0]);
        match cut_triangle(&t, 1.0) {
            CutResult::Segment(s) => {
                assert!(s.start.approx_eq(&Point::new(2.0, 1.0)));
                assert!(s.end.approx_eq(&Point::new(0.0, 0.0)));
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_general_direction_minority_below() {
        // Side face of a box at y = 0, outward normal -Y.
        let t = tri([0.0, 0.0, 0.0], [2.0, 0.0, 2.0], [0.0, 0.0, 2.0]);
        match cut_triangle(&t, 1.0) {
            CutResult::Segment(s) => {
                // Runs +X along the front edge: counter-clockwise seen from +Z.
                assert!(s.start.approx_eq(&Point::new(0.0, 0.0)));
                assert!(s.end.approx_eq(&Point::new(1.0, 0.0)));
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_general_direction_minority_above() {
        let t = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 0.0, 2.0]);
        match cut_triangle(&t, 1.0) {
            CutResult::Segment(s) => {
                assert!(s.start.approx_eq(&Point::new(1.0, 0.0)));
                assert!(s.end.approx_eq(&Point::new(2.0, 0.0)));
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_surface() {
        // Clockwise in the plane; surface comes back counter-clockwise.
        let t = tri([0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 0.0, 1.0]);
        match cut_triangle(&t, 1.0) {
            CutResult::Surface(poly) => {
                assert!(poly.is_closed());
                assert_eq!(poly.role(), Role::DenseInfill);
                assert!(poly.is_counter_clockwise());
            }
            other => panic!("expected surface, got {:?}", other),
        }
    }

    #[test]
    fn test_near_plane_counts_as_on() {
        assert_eq!(classify(1.0 + 5e-7, 1.0), Side::On);
        assert_eq!(classify(1.0 + 5e-6, 1.0), Side::Above);
        assert_eq!(classify(f64::NAN, 1.0), Side::Below);
    }

    #[test]
    fn test_cube_cross_section_is_ccw_chain() {
        let mesh = crate::mesh::Mesh::cube(2.0);
        let segments: Vec<Segment> = mesh
            .triangles()
            .iter()
            .filter_map(|t| match cut_triangle(t, 1.0) {
                CutResult::Segment(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(segments.len(), 8);
        // Shoelace over unordered directed segments equals twice the area.
        let twice_area: f64 = segments
            .iter()
            .map(|s| s.start.x * s.end.y - s.end.x * s.start.y)
            .sum();
        assert!((twice_area - 8.0).abs() < 1e-9);
    }
}
