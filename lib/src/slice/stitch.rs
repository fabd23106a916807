//! Contour stitching.
//!
//! Turns the unordered segments cut from one layer into polygons. Segments
//! live in an index arena with `next`/`prev` links; an open chain is just a
//! head index, a tail index and a length, so joining and reversing chains
//! never copies segments.
//!
//! Touch placeholders never become part of a chain. They are counted, and
//! the ones that coincide with no segment endpoint once stitching is over
//! are reported as isolated.
//!
//! An edge lying in the cutting plane is emitted by both triangles that
//! share it. Only the first copy is placed.

use super::plane_cut::CutResult;
use crate::geometry::{cleanup_polygon, IntPoint, Point, Polygon, Role, Segment};
use std::collections::HashSet;

/// Counters collected while stitching one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StitchStats {
    /// Segments placed into chains.
    pub segments: usize,
    /// Zero-length segments that were skipped.
    pub degenerate: usize,
    /// Repeats of an already placed edge, in either direction.
    pub duplicates: usize,
    pub touches: usize,
    pub isolated_touches: usize,
    pub surfaces: usize,
    pub closed: usize,
    pub open: usize,
    /// Chain pairs joined during the merge passes.
    pub merges: usize,
    /// Closed loops removed because cleanup left fewer than three vertices.
    pub collapsed: usize,
}

/// Polygons stitched from one layer, plus counters.
#[derive(Debug, Clone, Default)]
pub struct StitchResult {
    /// Closed contours first, then open chains (role [`Role::Open`]), then
    /// in-plane surfaces.
    pub polygons: Vec<Polygon>,
    pub stats: StitchStats,
}

impl StitchResult {
    pub fn open_count(&self) -> usize {
        self.stats.open
    }

    pub fn closed(&self) -> impl Iterator<Item = &Polygon> {
        self.polygons.iter().filter(|p| p.role() != Role::Open)
    }
}

#[derive(Debug, Clone, Copy)]
struct Chain {
    head: usize,
    tail: usize,
    len: usize,
}

/// How two endpoints pair up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    /// Incoming start meets chain end.
    Append,
    /// Incoming end meets chain start.
    Prepend,
    /// Starts coincide; reverse incoming, then prepend.
    ReversePrepend,
    /// Ends coincide; reverse incoming, then append.
    ReverseAppend,
}

/// Four-way endpoint test between a chain (`cs`..`ce`) and an incoming
/// piece (`is`..`ie`).
fn match_ends(cs: Point, ce: Point, is: Point, ie: Point) -> Option<Join> {
    if is.approx_eq(&ce) {
        Some(Join::Append)
    } else if ie.approx_eq(&cs) {
        Some(Join::Prepend)
    } else if is.approx_eq(&cs) {
        Some(Join::ReversePrepend)
    } else if ie.approx_eq(&ce) {
        Some(Join::ReverseAppend)
    } else {
        None
    }
}

#[derive(Default)]
struct Arena {
    segments: Vec<Segment>,
    next: Vec<Option<usize>>,
    prev: Vec<Option<usize>>,
}

impl Arena {
    fn push(&mut self, segment: Segment) -> Chain {
        let idx = self.segments.len();
        self.segments.push(segment);
        self.next.push(None);
        self.prev.push(None);
        Chain {
            head: idx,
            tail: idx,
            len: 1,
        }
    }

    #[inline]
    fn start(&self, chain: &Chain) -> Point {
        self.segments[chain.head].start
    }

    #[inline]
    fn end(&self, chain: &Chain) -> Point {
        self.segments[chain.tail].end
    }

    fn is_closed(&self, chain: &Chain) -> bool {
        chain.len > 2 && self.start(chain).approx_eq(&self.end(chain))
    }

    /// Reverse a chain in place: flip every segment and swap its links.
    fn reverse(&mut self, chain: &mut Chain) {
        let mut cursor = Some(chain.head);
        while let Some(i) = cursor {
            cursor = self.next[i];
            self.segments[i].reverse();
            std::mem::swap(&mut self.next[i], &mut self.prev[i]);
        }
        std::mem::swap(&mut chain.head, &mut chain.tail);
    }

    fn link(&mut self, from: usize, to: usize) {
        self.next[from] = Some(to);
        self.prev[to] = Some(from);
    }

    /// Try to join `incoming` onto `chain`.
    fn join(&mut self, chain: Chain, mut incoming: Chain) -> Option<Chain> {
        let join = match_ends(
            self.start(&chain),
            self.end(&chain),
            self.start(&incoming),
            self.end(&incoming),
        )?;

        if matches!(join, Join::ReversePrepend | Join::ReverseAppend) {
            self.reverse(&mut incoming);
        }

        let len = chain.len + incoming.len;
        Some(match join {
            Join::Append | Join::ReverseAppend => {
                self.link(chain.tail, incoming.head);
                Chain {
                    head: chain.head,
                    tail: incoming.tail,
                    len,
                }
            }
            Join::Prepend | Join::ReversePrepend => {
                self.link(incoming.tail, chain.head);
                Chain {
                    head: incoming.head,
                    tail: chain.tail,
                    len,
                }
            }
        })
    }

    fn collect(&self, chain: &Chain) -> Vec<Segment> {
        let mut out = Vec::with_capacity(chain.len);
        let mut cursor = Some(chain.head);
        while let Some(i) = cursor {
            out.push(self.segments[i]);
            if i == chain.tail {
                break;
            }
            cursor = self.next[i];
        }
        out
    }
}

/// Stitch the cut results of one layer into polygons.
pub fn stitch<I>(cuts: I) -> StitchResult
where
    I: IntoIterator<Item = CutResult>,
{
    let mut arena = Arena::default();
    let mut open: Vec<Chain> = Vec::new();
    let mut closed: Vec<Chain> = Vec::new();
    let mut surfaces: Vec<Polygon> = Vec::new();
    let mut touches: Vec<Point> = Vec::new();
    let mut placed_edges: HashSet<(IntPoint, IntPoint)> = HashSet::new();
    let mut stats = StitchStats::default();

    for cut in cuts {
        let segment = match cut {
            CutResult::None => continue,
            CutResult::Touch(p) => {
                touches.push(p);
                continue;
            }
            CutResult::Surface(polygon) => {
                surfaces.push(polygon);
                continue;
            }
            CutResult::Segment(s) => s,
        };

        if segment.is_degenerate() {
            stats.degenerate += 1;
            continue;
        }
        if !placed_edges.insert(edge_key(&segment)) {
            stats.duplicates += 1;
            continue;
        }
        stats.segments += 1;

        let incoming = arena.push(segment);
        let mut placed = false;
        for i in 0..open.len() {
            if let Some(joined) = arena.join(open[i], incoming) {
                if arena.is_closed(&joined) {
                    open.remove(i);
                    closed.push(joined);
                } else {
                    open[i] = joined;
                }
                placed = true;
                break;
            }
        }
        if !placed {
            open.push(incoming);
        }
    }

    // Merge open chains until nothing changes.
    loop {
        let mut merged_any = false;
        let mut i = 0;
        while i < open.len() {
            let mut j = i + 1;
            let mut closed_i = false;
            while j < open.len() {
                if let Some(joined) = arena.join(open[i], open[j]) {
                    open.remove(j);
                    stats.merges += 1;
                    merged_any = true;
                    if arena.is_closed(&joined) {
                        open.remove(i);
                        closed.push(joined);
                        closed_i = true;
                        break;
                    }
                    open[i] = joined;
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            if !closed_i {
                i += 1;
            }
        }
        if !merged_any || open.is_empty() {
            break;
        }
    }

    stats.touches = touches.len();
    if !touches.is_empty() {
        let endpoints: HashSet<IntPoint> = arena
            .segments
            .iter()
            .flat_map(|s| [s.start.to_int(), s.end.to_int()])
            .collect();
        stats.isolated_touches = touches
            .iter()
            .filter(|p| !near_any(&endpoints, p.to_int()))
            .count();
    }

    let mut polygons = Vec::with_capacity(closed.len() + open.len() + surfaces.len());
    for chain in &closed {
        let polygon = Polygon::from_segments(arena.collect(chain), Role::Contour);
        match cleanup_polygon(&polygon) {
            Some(cleaned) => polygons.push(cleaned),
            None => stats.collapsed += 1,
        }
    }
    stats.closed = polygons.len();

    for chain in &open {
        polygons.push(Polygon::from_segments(arena.collect(chain), Role::Open));
    }
    stats.open = open.len();

    stats.surfaces = surfaces.len();
    polygons.extend(surfaces);

    StitchResult { polygons, stats }
}

/// Direction-free key of a segment in fixed-point units.
fn edge_key(segment: &Segment) -> (IntPoint, IntPoint) {
    let (a, b) = (segment.start.to_int(), segment.end.to_int());
    if (a.x, a.y) <= (b.x, b.y) {
        (a, b)
    } else {
        (b, a)
    }
}

/// Whether `p` lies within one fixed-point unit of any endpoint.
fn near_any(endpoints: &HashSet<IntPoint>, p: IntPoint) -> bool {
    (-1..=1).any(|dx| {
        (-1..=1).any(|dy| endpoints.contains(&IntPoint::new(p.x + dx, p.y + dy)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> CutResult {
        CutResult::Segment(Segment::new(Point::new(ax, ay), Point::new(bx, by)))
    }

    fn square_cuts() -> Vec<CutResult> {
        vec![
            seg(0.0, 0.0, 1.0, 0.0),
            seg(1.0, 0.0, 1.0, 1.0),
            seg(1.0, 1.0, 0.0, 1.0),
            seg(0.0, 1.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_closed_square_in_order() {
        let result = stitch(square_cuts());
        assert_eq!(result.polygons.len(), 1);
        let poly = &result.polygons[0];
        assert!(poly.is_closed());
        assert_eq!(poly.role(), Role::Contour);
        assert_eq!(poly.len(), 4);
        assert_eq!(result.stats.open, 0);
    }

    #[test]
    fn test_shuffled_and_reversed() {
        // Out of order, two segments pointing the wrong way.
        let cuts = vec![
            seg(1.0, 1.0, 0.0, 1.0),
            seg(0.0, 0.0, 1.0, 0.0),
            seg(0.0, 0.0, 0.0, 1.0),
            seg(1.0, 1.0, 1.0, 0.0),
        ];
        let result = stitch(cuts);
        assert_eq!(result.stats.closed, 1);
        let poly = &result.polygons[0];
        assert!(poly.is_closed());
        assert!((poly.area() - 1.0).abs() < 1e-9);
        // Connected end-to-start throughout.
        for w in poly.segments().windows(2) {
            assert!(w[0].end.approx_eq(&w[1].start));
        }
    }

    #[test]
    fn test_merge_pass_joins_chains() {
        // Two separate halves arrive first, then the bridging pieces.
        let cuts = vec![
            seg(0.0, 0.0, 1.0, 0.0),
            seg(1.0, 1.0, 0.0, 1.0),
            seg(1.0, 0.0, 1.0, 1.0),
            seg(0.0, 1.0, 0.0, 0.0),
        ];
        let result = stitch(cuts);
        assert_eq!(result.stats.closed, 1);
        assert_eq!(result.stats.open, 0);
    }

    #[test]
    fn test_unclosable_chain_is_open() {
        let cuts = vec![seg(0.0, 0.0, 1.0, 0.0), seg(1.0, 0.0, 1.0, 1.0)];
        let result = stitch(cuts);
        assert_eq!(result.polygons.len(), 1);
        assert_eq!(result.polygons[0].role(), Role::Open);
        assert_eq!(result.open_count(), 1);
        assert_eq!(result.closed().count(), 0);
    }

    #[test]
    fn test_collinear_split_points_removed() {
        let cuts = vec![
            seg(0.0, 0.0, 0.5, 0.0),
            seg(0.5, 0.0, 1.0, 0.0),
            seg(1.0, 0.0, 0.0, 1.0),
            seg(0.0, 1.0, 0.0, 0.0),
        ];
        let result = stitch(cuts);
        assert_eq!(result.polygons[0].len(), 3);
    }

    #[test]
    fn test_touch_placeholders_do_not_change_output() {
        let plain = stitch(square_cuts());

        let mut with_touches = vec![
            CutResult::Touch(Point::new(0.0, 0.0)),
            CutResult::Touch(Point::new(5.0, 5.0)),
        ];
        with_touches.extend(square_cuts());
        with_touches.push(CutResult::Touch(Point::new(1.0, 1.0)));
        let touched = stitch(with_touches);

        assert_eq!(plain.polygons, touched.polygons);
        assert_eq!(touched.stats.touches, 3);
        assert_eq!(touched.stats.isolated_touches, 1);
        assert_eq!(plain.stats.touches, 0);
    }

    #[test]
    fn test_touch_alone_makes_nothing() {
        let result = stitch(vec![CutResult::Touch(Point::new(1.0, 1.0))]);
        assert!(result.polygons.is_empty());
        assert_eq!(result.stats.isolated_touches, 1);
    }

    #[test]
    fn test_degenerate_segments_skipped() {
        let mut cuts = square_cuts();
        cuts.push(seg(2.0, 2.0, 2.0, 2.0));
        let result = stitch(cuts);
        assert_eq!(result.stats.degenerate, 1);
        assert_eq!(result.polygons.len(), 1);
    }

    #[test]
    fn test_surfaces_bypass() {
        let surface = Polygon::closed(
            &[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
            Role::DenseInfill,
        );
        let mut cuts = square_cuts();
        cuts.push(CutResult::Surface(surface.clone()));
        let result = stitch(cuts);
        assert_eq!(result.stats.surfaces, 1);
        assert_eq!(result.polygons.last(), Some(&surface));
    }

    #[test]
    fn test_shared_in_plane_edges_placed_once() {
        let mut cuts = square_cuts();
        cuts.extend(square_cuts());
        cuts.push(seg(1.0, 0.0, 0.0, 0.0));
        let result = stitch(cuts);
        assert_eq!(result.stats.segments, 4);
        assert_eq!(result.stats.duplicates, 5);
        assert_eq!(result.polygons.len(), 1);
        assert!((result.polygons[0].area() - 1.0).abs() < 1e-9);
    }

    /// Box whose side walls carry a vertex ring at the cutting height.
    fn box_with_ring(size: f64, ring_z: f64, height: f64) -> crate::mesh::Mesh {
        use crate::geometry::Point3;
        use crate::mesh::{Mesh, Triangle};
        let corners = [(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)];
        let mut mesh = Mesh::new();
        for i in 0..4 {
            let (ax, ay) = corners[i];
            let (bx, by) = corners[(i + 1) % 4];
            for (z0, z1) in [(0.0, ring_z), (ring_z, height)] {
                let a0 = Point3::new(ax, ay, z0);
                let b0 = Point3::new(bx, by, z0);
                let b1 = Point3::new(bx, by, z1);
                let a1 = Point3::new(ax, ay, z1);
                mesh.push(Triangle::from_positions(a0, b0, b1));
                mesh.push(Triangle::from_positions(a0, b1, a1));
            }
        }
        let c = |i: usize, z: f64| Point3::new(corners[i].0, corners[i].1, z);
        mesh.push(Triangle::from_positions(c(0, 0.0), c(2, 0.0), c(1, 0.0)));
        mesh.push(Triangle::from_positions(c(0, 0.0), c(3, 0.0), c(2, 0.0)));
        mesh.push(Triangle::from_positions(c(0, height), c(1, height), c(2, height)));
        mesh.push(Triangle::from_positions(c(0, height), c(2, height), c(3, height)));
        mesh
    }

    #[test]
    fn test_plane_through_vertex_ring() {
        let mesh = box_with_ring(10.0, 0.5, 1.0);
        let cuts: Vec<CutResult> = mesh
            .triangles()
            .iter()
            .map(|t| crate::slice::cut_triangle(t, 0.5))
            .collect();
        assert!(cuts.iter().any(|c| matches!(c, CutResult::Touch(_))));

        let result = stitch(cuts);
        assert_eq!(result.stats.duplicates, 4);
        assert_eq!(result.stats.open, 0);
        assert_eq!(result.stats.isolated_touches, 0);
        assert_eq!(result.polygons.len(), 1);
        let square = &result.polygons[0];
        assert!(square.is_closed());
        assert_eq!(square.len(), 4);
        assert!((square.signed_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_plane_through_crossing_vertices() {
        use crate::geometry::Point3;
        use crate::mesh::Triangle;
        // Bipyramid with a skewed equator: two equator vertices sit on the
        // plane, one below, one above.
        let top = Point3::new(0.0, 0.0, 10.0);
        let bottom = Point3::new(0.0, 0.0, 0.0);
        let eq = [
            Point3::new(5.0, 0.0, 5.0),
            Point3::new(0.0, 5.0, 4.0),
            Point3::new(-5.0, 0.0, 5.0),
            Point3::new(0.0, -5.0, 6.0),
        ];
        let mut cuts = Vec::new();
        for i in 0..4 {
            let (a, b) = (eq[i], eq[(i + 1) % 4]);
            for t in [
                Triangle::from_positions(top, a, b),
                Triangle::from_positions(bottom, b, a),
            ] {
                cuts.push(crate::slice::cut_triangle(&t, 5.0));
            }
        }
        assert_eq!(
            cuts.iter().filter(|c| matches!(c, CutResult::Touch(_))).count(),
            4
        );

        let result = stitch(cuts);
        assert_eq!(result.stats.closed, 1);
        assert_eq!(result.stats.open, 0);
        assert_eq!(result.stats.isolated_touches, 0);
        let poly = &result.polygons[0];
        assert_eq!(poly.len(), 4);
        assert!(poly.contains_point(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_two_separate_loops() {
        let mut cuts = square_cuts();
        cuts.extend([
            seg(5.0, 5.0, 6.0, 5.0),
            seg(6.0, 5.0, 5.5, 6.0),
            seg(5.5, 6.0, 5.0, 5.0),
        ]);
        let result = stitch(cuts);
        assert_eq!(result.stats.closed, 2);
    }
}
