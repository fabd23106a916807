//! Infill pattern generation.
//!
//! Every pattern is built from one canonical stripe set: lines parallel to
//! the X axis, `thickness × spacing` apart, laid out symmetrically about the
//! centre of the bounding rectangle so one stripe passes through the centre.
//! Each stripe spans the rectangle's diagonal, which lets any rotated copy
//! still cover the rectangle. Composite patterns rotate (and for
//! tri-hexagons, shift) copies of that set about the centre.
//!
//! Stripes are clipped to the rectangle grown by one step on each side, then
//! [`clip_to_region`] cuts them down to the real infill area.

use crate::clipper::{region_rings, Region};
use crate::config::InfillKind;
use crate::geometry::{contains_int, BoundingBox, IntPoint, Point, Polygon, Role, Segment};
use crate::CoordF;
use std::f64::consts::PI;

/// Stripes shorter than this after clipping are dropped (mm).
const MIN_STRIPE_LENGTH: CoordF = 1e-3;

/// Angles (radians) and perpendicular shifts (in steps) for each stripe set.
fn stripe_sets(kind: InfillKind) -> &'static [(f64, f64)] {
    const DEG60: f64 = PI / 3.0;
    match kind {
        InfillKind::None => &[],
        InfillKind::Single => &[(0.0, 0.0)],
        InfillKind::SingleRotated => &[(PI / 2.0, 0.0)],
        InfillKind::Square | InfillKind::Rectangle => &[(0.0, 0.0), (PI / 2.0, 0.0)],
        InfillKind::Diamond => &[(PI / 4.0, 0.0), (3.0 * PI / 4.0, 0.0)],
        InfillKind::Triangles => &[(0.0, 0.0), (DEG60, 0.0), (2.0 * DEG60, 0.0)],
        InfillKind::TriHexagons => &[(0.0, 0.0), (DEG60, 0.0), (2.0 * DEG60, 0.5)],
    }
}

/// Canonical horizontal stripes about the centre of `bounds`.
///
/// `shift` moves the whole set along +Y, in units of `step`.
fn canonical_stripes(bounds: &BoundingBox, step: CoordF, shift: CoordF) -> Vec<Segment> {
    let center = bounds.center();
    let half = bounds.diagonal() / 2.0;
    let n = (half / step).floor() as i64;

    (-n..=n)
        .map(|k| {
            let y = center.y + (k as CoordF + shift) * step;
            Segment::new(Point::new(center.x - half, y), Point::new(center.x + half, y))
        })
        .collect()
}

/// Liang–Barsky clip of a segment against an axis-aligned box.
pub fn clip_segment(segment: &Segment, bounds: &BoundingBox) -> Option<Segment> {
    let d = segment.direction();
    let p = [-d.x, d.x, -d.y, d.y];
    let q = [
        segment.start.x - bounds.min.x,
        bounds.max.x - segment.start.x,
        segment.start.y - bounds.min.y,
        bounds.max.y - segment.start.y,
    ];

    let mut t0: CoordF = 0.0;
    let mut t1: CoordF = 1.0;
    for i in 0..4 {
        if p[i] == 0.0 {
            if q[i] < 0.0 {
                return None;
            }
        } else {
            let t = q[i] / p[i];
            if p[i] < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 {
        return None;
    }

    let clamp = |pt: Point| {
        Point::new(
            pt.x.clamp(bounds.min.x, bounds.max.x),
            pt.y.clamp(bounds.min.y, bounds.max.y),
        )
    };
    Some(Segment::new(
        clamp(segment.start.lerp(&segment.end, t0)),
        clamp(segment.start.lerp(&segment.end, t1)),
    ))
}

/// Generate the stripes of `kind` for a bounding rectangle.
///
/// Stripes are `thickness × spacing` apart and come back as one-segment open
/// polygons with role [`Role::SparseInfill`]. Every endpoint lies within the
/// rectangle grown by one step. Invalid input (empty bounds, non-positive or
/// non-finite step) yields no stripes.
pub fn generate_pattern(
    bounds: &BoundingBox,
    thickness: CoordF,
    spacing: CoordF,
    kind: InfillKind,
) -> Vec<Polygon> {
    let mut step = thickness * spacing;
    if kind == InfillKind::Rectangle {
        step *= 2.0;
    }
    if bounds.is_empty() || !step.is_finite() || step <= 0.0 {
        return Vec::new();
    }

    let center = bounds.center();
    let limit = bounds.expanded(step);
    let mut out = Vec::new();
    for &(angle, shift) in stripe_sets(kind) {
        for stripe in canonical_stripes(bounds, step, shift) {
            let rotated = if angle == 0.0 {
                stripe
            } else {
                stripe.rotated(angle, center)
            };
            if let Some(clipped) = clip_segment(&rotated, &limit) {
                if clipped.length() >= MIN_STRIPE_LENGTH {
                    out.push(Polygon::line(clipped.start, clipped.end, Role::SparseInfill));
                }
            }
        }
    }
    out
}

/// Even-odd containment against a set of fixed-point rings.
fn inside_rings(rings: &[Vec<IntPoint>], p: &Point) -> bool {
    let q = p.to_int();
    rings.iter().filter(|ring| contains_int(ring, q)).count() % 2 == 1
}

/// Parameters along `s` where it crosses an edge a-b, strictly inside (0, 1).
fn crossings(s: &Segment, a: Point, b: Point, out: &mut Vec<CoordF>) {
    let d = s.direction();
    let e = b - a;
    let denom = d.cross(&e);
    if denom.abs() < 1e-12 {
        return;
    }
    let w = a - s.start;
    let t = w.cross(&e) / denom;
    let u = w.cross(&d) / denom;
    if t > 0.0 && t < 1.0 && (0.0..=1.0).contains(&u) {
        out.push(t);
    }
}

/// Clip stripes to a region (outer boundaries and holes), retagging them.
///
/// Each stripe is split at every ring crossing and the pieces whose midpoint
/// lies inside the region are kept. Adjacent kept pieces are merged.
pub fn clip_to_region(stripes: &[Polygon], region: &Region, role: Role) -> Vec<Polygon> {
    let rings = region_rings(region);
    if rings.is_empty() {
        return Vec::new();
    }
    let int_rings: Vec<Vec<IntPoint>> = rings
        .iter()
        .map(|ring| ring.iter().map(Point::to_int).collect())
        .collect();

    let mut out = Vec::new();
    let mut ts: Vec<CoordF> = Vec::new();
    for stripe in stripes {
        for s in stripe.segments() {
            ts.clear();
            ts.push(0.0);
            for ring in &rings {
                for i in 0..ring.len() {
                    crossings(s, ring[i], ring[(i + 1) % ring.len()], &mut ts);
                }
            }
            ts.push(1.0);
            ts.sort_by(|a, b| a.total_cmp(b));
            ts.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

            let mut run: Option<(CoordF, CoordF)> = None;
            for w in ts.windows(2) {
                let mid = s.start.lerp(&s.end, (w[0] + w[1]) / 2.0);
                if inside_rings(&int_rings, &mid) {
                    run = Some(match run {
                        Some((t0, _)) => (t0, w[1]),
                        None => (w[0], w[1]),
                    });
                } else if let Some((t0, t1)) = run.take() {
                    push_piece(&mut out, s, t0, t1, role);
                }
            }
            if let Some((t0, t1)) = run {
                push_piece(&mut out, s, t0, t1, role);
            }
        }
    }
    out
}

fn push_piece(out: &mut Vec<Polygon>, s: &Segment, t0: CoordF, t1: CoordF, role: Role) {
    let a = s.start.lerp(&s.end, t0);
    let b = s.start.lerp(&s.end, t1);
    if a.distance(&b) >= MIN_STRIPE_LENGTH {
        out.push(Polygon::line(a, b, role));
    }
}

/// Pattern for a given layer: single-direction stripes alternate by parity.
pub fn kind_for_layer(kind: InfillKind, layer_index: usize) -> InfillKind {
    match (kind, layer_index % 2) {
        (InfillKind::Single, 1) => InfillKind::SingleRotated,
        (InfillKind::SingleRotated, 1) => InfillKind::Single,
        (k, _) => k,
    }
}

/// Fill a region with the given pattern.
pub fn fill_region(
    region: &Region,
    thickness: CoordF,
    spacing: CoordF,
    kind: InfillKind,
    role: Role,
) -> Vec<Polygon> {
    if region.0.is_empty() || kind == InfillKind::None {
        return Vec::new();
    }
    let bounds = BoundingBox::from_points(region_rings(region).into_iter().flatten());
    let stripes = generate_pattern(&bounds, thickness, spacing, kind);
    clip_to_region(&stripes, region, role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::{difference, rectangle};

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0))
    }

    fn endpoints(polys: &[Polygon]) -> Vec<Point> {
        polys
            .iter()
            .flat_map(|p| p.segments().iter().flat_map(|s| [s.start, s.end]))
            .collect()
    }

    #[test]
    fn test_square_within_expanded_bounds() {
        let polys = generate_pattern(&unit_box(), 0.4, 7.0, InfillKind::Square);
        assert!(!polys.is_empty());
        for p in endpoints(&polys) {
            assert!(p.x >= -2.8 - 1e-9 && p.x <= 12.8 + 1e-9, "{:?}", p);
            assert!(p.y >= -2.8 - 1e-9 && p.y <= 12.8 + 1e-9, "{:?}", p);
        }
        assert!(polys.iter().all(|p| p.role() == Role::SparseInfill && p.len() == 1));
    }

    #[test]
    fn test_single_has_center_stripe() {
        let polys = generate_pattern(&unit_box(), 0.4, 2.5, InfillKind::Single);
        assert!(polys
            .iter()
            .any(|p| (p.segments()[0].start.y - 5.0).abs() < 1e-9));
        // Symmetric about the centre.
        let ys: Vec<f64> = polys.iter().map(|p| p.segments()[0].start.y).collect();
        let min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((min - 5.0 + (max - 5.0)).abs() < 1e-9);
        // All horizontal.
        assert!(polys.iter().all(|p| {
            let s = p.segments()[0];
            (s.start.y - s.end.y).abs() < 1e-12
        }));
    }

    #[test]
    fn test_rotated_is_vertical() {
        let polys = generate_pattern(&unit_box(), 0.4, 2.5, InfillKind::SingleRotated);
        assert!(polys.iter().all(|p| {
            let s = p.segments()[0];
            (s.start.x - s.end.x).abs() < 1e-9
        }));
    }

    #[test]
    fn test_rectangle_doubles_spacing() {
        let square = generate_pattern(&unit_box(), 0.4, 2.5, InfillKind::Square);
        let rect = generate_pattern(&unit_box(), 0.4, 2.5, InfillKind::Rectangle);
        assert!(rect.len() < square.len());
    }

    #[test]
    fn test_triangles_and_trihexagons_differ() {
        let tri = generate_pattern(&unit_box(), 0.4, 5.0, InfillKind::Triangles);
        let hex = generate_pattern(&unit_box(), 0.4, 5.0, InfillKind::TriHexagons);
        assert!(!tri.is_empty());
        assert_ne!(endpoints(&tri), endpoints(&hex));
    }

    #[test]
    fn test_none_and_invalid() {
        assert!(generate_pattern(&unit_box(), 0.4, 2.0, InfillKind::None).is_empty());
        assert!(generate_pattern(&unit_box(), 0.0, 2.0, InfillKind::Square).is_empty());
        assert!(generate_pattern(&BoundingBox::empty(), 0.4, 2.0, InfillKind::Square).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let a = generate_pattern(&unit_box(), 0.4, 3.0, InfillKind::Diamond);
        let b = generate_pattern(&unit_box(), 0.4, 3.0, InfillKind::Diamond);
        assert_eq!(a, b);
    }

    #[test]
    fn test_liang_barsky() {
        let bb = unit_box();
        let s = Segment::new(Point::new(-5.0, 5.0), Point::new(15.0, 5.0));
        let c = clip_segment(&s, &bb).unwrap();
        assert!(c.start.approx_eq(&Point::new(0.0, 5.0)));
        assert!(c.end.approx_eq(&Point::new(10.0, 5.0)));

        let outside = Segment::new(Point::new(-5.0, 20.0), Point::new(15.0, 20.0));
        assert!(clip_segment(&outside, &bb).is_none());
    }

    #[test]
    fn test_clip_to_region_with_hole() {
        let outer = rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let hole = rectangle(Point::new(4.0, 4.0), Point::new(6.0, 6.0));
        let region = difference(&outer, &hole);

        let stripe = Polygon::line(Point::new(-1.0, 5.0), Point::new(11.0, 5.0), Role::SparseInfill);
        let pieces = clip_to_region(&[stripe], &region, Role::DenseInfill);
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().all(|p| p.role() == Role::DenseInfill));
        let total: f64 = pieces.iter().map(Polygon::length).sum();
        assert!((total - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_inside_rings_even_odd() {
        let outer = rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let hole = rectangle(Point::new(2.0, 2.0), Point::new(8.0, 8.0));
        let island = rectangle(Point::new(4.0, 4.0), Point::new(6.0, 6.0));
        let region = crate::clipper::union(&difference(&outer, &hole), &island);
        let rings: Vec<Vec<IntPoint>> = region_rings(&region)
            .iter()
            .map(|r| r.iter().map(Point::to_int).collect())
            .collect();
        assert_eq!(rings.len(), 3);

        assert!(inside_rings(&rings, &Point::new(1.0, 1.0)));
        assert!(!inside_rings(&rings, &Point::new(3.0, 3.0)));
        assert!(inside_rings(&rings, &Point::new(5.0, 5.0)));
        assert!(!inside_rings(&rings, &Point::new(11.0, 5.0)));
    }

    #[test]
    fn test_kind_for_layer() {
        assert_eq!(kind_for_layer(InfillKind::Single, 0), InfillKind::Single);
        assert_eq!(kind_for_layer(InfillKind::Single, 1), InfillKind::SingleRotated);
        assert_eq!(kind_for_layer(InfillKind::Square, 1), InfillKind::Square);
    }

    #[test]
    fn test_fill_region_stays_inside() {
        let region = rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let fill = fill_region(&region, 0.4, 1.0, InfillKind::Diamond, Role::SparseInfill);
        assert!(!fill.is_empty());
        for p in endpoints(&fill) {
            assert!(p.x >= -1e-6 && p.x <= 10.0 + 1e-6);
            assert!(p.y >= -1e-6 && p.y <= 10.0 + 1e-6);
        }
    }
}
