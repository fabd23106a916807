//! Polygon offsetting and boolean operations.
//!
//! Thin layer over geo-clipper. Rings are handed to Clipper in fixed-point
//! units (the polygons' cached integer loops, widened to `f64`) with a
//! conversion factor of 1.0, so Clipper sees exactly the integers the rest
//! of the slicer uses. Distances are taken in millimetres and scaled here.
//!
//! A [`Region`] is a set of polygons with holes in the same fixed-point
//! units; it is what the surface detector and infill clipping work on.

use crate::geometry::{cleanup_loop, IntPoint, Point, Polygon, Role};
use crate::{scale, CoordF, SCALING_FACTOR};
use geo::{Area, Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Clipper's own conversion factor; coordinates are already integral.
const FACTOR: f64 = 1.0;

/// Default miter limit for wall offsets.
pub const DEFAULT_MITER_LIMIT: f64 = 3.0;

/// Polygons with holes, in fixed-point units.
pub type Region = MultiPolygon<f64>;

fn ring_to_geo(ring: &[IntPoint]) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = ring
        .iter()
        .map(|p| GeoCoord {
            x: p.x as f64,
            y: p.y as f64,
        })
        .collect();

    // Close the ring if needed
    if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(*first);
        }
    }
    LineString::new(coords)
}

/// Convert a closed geo ring back to millimetre points without the closing
/// duplicate.
fn geo_to_ring(ring: &LineString<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(c.x / SCALING_FACTOR, c.y / SCALING_FACTOR))
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Counter-clockwise copy of an integer loop.
fn ccw(ring: &[IntPoint]) -> Vec<IntPoint> {
    let mut twice_area: i128 = 0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        twice_area += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
    }
    let mut out = ring.to_vec();
    if twice_area < 0 {
        out.reverse();
    }
    out
}

/// Offset a closed integer loop by `delta` millimetres with mitered joins.
///
/// Positive delta grows the loop, negative shrinks it. Returns the single
/// resulting ring counter-clockwise, cleaned up, or `None` when nothing is
/// left. If Clipper splits the loop, the largest piece is kept.
pub fn offset_loop(ring: &[IntPoint], delta: CoordF, miter_limit: f64) -> Option<Vec<Point>> {
    offset_loop_split(ring, delta, miter_limit).map(|(points, _)| points)
}

/// Like [`offset_loop`], also returning how many split-off pieces were
/// dropped.
pub fn offset_loop_split(
    ring: &[IntPoint],
    delta: CoordF,
    miter_limit: f64,
) -> Option<(Vec<Point>, usize)> {
    if ring.len() < 3 {
        return None;
    }

    let subject = GeoPolygon::new(ring_to_geo(&ccw(ring)), vec![]);
    let result = subject.offset(
        delta * SCALING_FACTOR,
        JoinType::Miter(miter_limit),
        EndType::ClosedPolygon,
        FACTOR,
    );

    let dropped = result.0.len().saturating_sub(1);
    if dropped > 0 {
        log::debug!(
            "Offset by {:.3}mm split a loop into {} pieces, keeping the largest",
            delta,
            result.0.len()
        );
    }

    let largest = result
        .0
        .iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))?;

    let cleaned = cleanup_loop(&geo_to_ring(largest.exterior()));
    if cleaned.len() < 3 {
        return None;
    }
    Some((cleaned, dropped))
}

/// Offset a closed polygon, keeping its role and winding.
pub fn offset_polygon(polygon: &Polygon, delta: CoordF, miter_limit: f64) -> Option<Polygon> {
    offset_polygon_split(polygon, delta, miter_limit).map(|(out, _)| out)
}

/// Like [`offset_polygon`], plus the number of dropped pieces.
pub fn offset_polygon_split(
    polygon: &Polygon,
    delta: CoordF,
    miter_limit: f64,
) -> Option<(Polygon, usize)> {
    let (ring, dropped) = offset_loop_split(polygon.int_loop(), delta, miter_limit)?;
    let mut out = Polygon::closed(&ring, polygon.role());
    if polygon.is_clockwise() {
        out.reverse();
    }
    Some((out, dropped))
}

/// Region with no area.
pub fn empty_region() -> Region {
    MultiPolygon::new(Vec::new())
}

/// Build a region from boundary polygons: solids minus holes.
///
/// Closed contours, shells and in-plane surfaces count as solids; holes are
/// subtracted. Other roles are ignored.
pub fn region_from_polygons(polygons: &[Polygon]) -> Region {
    let mut solids = Vec::new();
    let mut holes = Vec::new();
    for p in polygons.iter().filter(|p| p.is_closed()) {
        let geo = GeoPolygon::new(ring_to_geo(&ccw(p.int_loop())), vec![]);
        match p.role() {
            Role::Contour | Role::Shell | Role::DenseInfill => solids.push(geo),
            Role::Hole => holes.push(geo),
            _ => {}
        }
    }
    // Union all solids together
    let merged = solids
        .into_iter()
        .fold(empty_region(), |acc, poly| {
            union(&acc, &MultiPolygon::new(vec![poly]))
        });
    difference(&merged, &MultiPolygon::new(holes))
}

/// Union of two regions.
pub fn union(subject: &Region, clip: &Region) -> Region {
    if subject.0.is_empty() {
        return clip.clone();
    }
    if clip.0.is_empty() {
        return subject.clone();
    }
    subject.union(clip, FACTOR)
}

/// Intersection of two regions.
pub fn intersection(subject: &Region, clip: &Region) -> Region {
    if subject.0.is_empty() || clip.0.is_empty() {
        return empty_region();
    }
    subject.intersection(clip, FACTOR)
}

/// `subject` minus `clip`.
pub fn difference(subject: &Region, clip: &Region) -> Region {
    if subject.0.is_empty() {
        return empty_region();
    }
    if clip.0.is_empty() {
        return subject.clone();
    }
    subject.difference(clip, FACTOR)
}

/// Offset every polygon of a region, holes included.
pub fn offset_region(region: &Region, delta: CoordF, miter_limit: f64) -> Region {
    if region.0.is_empty() {
        return empty_region();
    }
    region.offset(
        delta * SCALING_FACTOR,
        JoinType::Miter(miter_limit),
        EndType::ClosedPolygon,
        FACTOR,
    )
}

/// Area of a region in mm².
pub fn area(region: &Region) -> CoordF {
    region.unsigned_area() / (SCALING_FACTOR * SCALING_FACTOR)
}

/// Drop polygons smaller than `min_area` mm².
pub fn remove_small(region: &Region, min_area: CoordF) -> Region {
    let threshold = min_area * SCALING_FACTOR * SCALING_FACTOR;
    MultiPolygon::new(
        region
            .0
            .iter()
            .filter(|p| p.unsigned_area() >= threshold)
            .cloned()
            .collect(),
    )
}

/// Every ring of a region (outer boundaries and holes) in millimetres.
///
/// Suitable for even-odd containment tests.
pub fn region_rings(region: &Region) -> Vec<Vec<Point>> {
    let mut rings = Vec::new();
    for poly in &region.0 {
        rings.push(geo_to_ring(poly.exterior()));
        for hole in poly.interiors() {
            rings.push(geo_to_ring(hole));
        }
    }
    rings.retain(|r| r.len() >= 3);
    rings
}

/// Rectangle region in millimetres, mostly for tests and benches.
pub fn rectangle(min: Point, max: Point) -> Region {
    let ring = [
        IntPoint::new(scale(min.x), scale(min.y)),
        IntPoint::new(scale(max.x), scale(min.y)),
        IntPoint::new(scale(max.x), scale(max.y)),
        IntPoint::new(scale(min.x), scale(max.y)),
    ];
    MultiPolygon::new(vec![GeoPolygon::new(ring_to_geo(&ring), vec![])])
}
