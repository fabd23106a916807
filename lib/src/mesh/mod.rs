//! Mesh input contract.
//!
//! The slicer consumes a flat list of triangles, each carrying three vertices
//! with a position and a normal. Meshes arrive as JSON from an importer:
//!
//! ```json
//! {"triangles":[{"vertices":[{"position":[0,0,0],"normal":[0,0,-1]}, ...]}]}
//! ```
//!
//! Triangles are expected to wind counter-clockwise when viewed from outside
//! the solid; contour direction follows from that.

use crate::geometry::{Point, Point3};
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A mesh vertex: position and normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3,
    #[serde(default)]
    pub normal: Point3,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Point3, normal: Point3) -> Self {
        Self { position, normal }
    }
}

/// A triangle of three vertices.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    #[inline]
    pub const fn new(vertices: [Vertex; 3]) -> Self {
        Self { vertices }
    }

    /// Build a triangle from positions, deriving the face normal from the winding.
    pub fn from_positions(p0: Point3, p1: Point3, p2: Point3) -> Self {
        let normal = face_normal(p0, p1, p2);
        Self {
            vertices: [
                Vertex::new(p0, normal),
                Vertex::new(p1, normal),
                Vertex::new(p2, normal),
            ],
        }
    }

    #[inline]
    pub fn position(&self, i: usize) -> Point3 {
        self.vertices[i].position
    }

    /// Lowest and highest Z of the three vertices.
    pub fn z_range(&self) -> (CoordF, CoordF) {
        let zs = self.vertices.map(|v| v.position.z);
        (zs[0].min(zs[1]).min(zs[2]), zs[0].max(zs[1]).max(zs[2]))
    }

    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.position.is_finite())
    }
}

impl fmt::Debug for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Triangle({:?}, {:?}, {:?})",
            self.vertices[0].position, self.vertices[1].position, self.vertices[2].position
        )
    }
}

/// Unit normal of the triangle p0, p1, p2 (right-hand rule).
fn face_normal(p0: Point3, p1: Point3, p2: Point3) -> Point3 {
    let n = (p1 - p0).cross(&(p2 - p0));
    let len = (n.x * n.x + n.y * n.y + n.z * n.z).sqrt();
    if len > 0.0 {
        Point3::new(n.x / len, n.y / len, n.z / len)
    } else {
        Point3::default()
    }
}

/// A triangulated surface mesh.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn push(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Load a mesh from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Load a mesh from any JSON reader.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let mesh: Mesh = serde_json::from_reader(reader)?;
        log::debug!("Loaded mesh with {} triangles", mesh.len());
        Ok(mesh)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the mesh can be sliced.
    ///
    /// An empty mesh, or one without a single finite triangle, is rejected.
    /// Individual non-finite triangles are tolerated here and reported by
    /// the layers they reach.
    pub fn validate(&self) -> Result<()> {
        if self.triangles.is_empty() {
            return Err(Error::Mesh("mesh has no triangles".into()));
        }
        let bad = self.triangles.iter().filter(|t| !t.is_finite()).count();
        if bad == self.triangles.len() {
            return Err(Error::Mesh(format!(
                "all {} triangles have non-finite coordinates",
                bad
            )));
        }
        if bad > 0 {
            log::warn!("{} triangles have non-finite coordinates", bad);
        }
        Ok(())
    }

    /// Bounds over all finite vertices, or `None` when there are none.
    pub fn bounding_box(&self) -> Option<(Point3, Point3)> {
        let mut min = Point3::new(CoordF::INFINITY, CoordF::INFINITY, CoordF::INFINITY);
        let mut max = Point3::new(
            CoordF::NEG_INFINITY,
            CoordF::NEG_INFINITY,
            CoordF::NEG_INFINITY,
        );
        let mut any = false;
        for v in self.triangles.iter().flat_map(|t| t.vertices.iter()) {
            let p = v.position;
            if !p.is_finite() {
                continue;
            }
            any = true;
            min = Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Point3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        any.then_some((min, max))
    }

    /// Z extent over all finite vertices.
    pub fn z_range(&self) -> Option<(CoordF, CoordF)> {
        self.bounding_box().map(|(min, max)| (min.z, max.z))
    }

    /// Translate every vertex.
    pub fn translate(&mut self, x: CoordF, y: CoordF, z: CoordF) {
        for t in &mut self.triangles {
            for v in &mut t.vertices {
                v.position = Point3::new(v.position.x + x, v.position.y + y, v.position.z + z);
            }
        }
    }

    /// Axis-aligned box between `min` and `max`, outward-facing.
    pub fn cuboid(min: Point3, max: Point3) -> Self {
        let c = [
            // Bottom face
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            // Top face
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ];

        const FACES: [[usize; 3]; 12] = [
            // Bottom
            [0, 2, 1],
            [0, 3, 2],
            // Top
            [4, 5, 6],
            [4, 6, 7],
            // Front
            [0, 1, 5],
            [0, 5, 4],
            // Back
            [2, 3, 7],
            [2, 7, 6],
            // Left
            [0, 4, 7],
            [0, 7, 3],
            // Right
            [1, 2, 6],
            [1, 6, 5],
        ];

        Self::from_triangles(
            FACES
                .iter()
                .map(|f| Triangle::from_positions(c[f[0]], c[f[1]], c[f[2]]))
                .collect(),
        )
    }

    /// Cube of edge `size` with its minimum corner at the origin.
    pub fn cube(size: CoordF) -> Self {
        Self::cuboid(Point3::default(), Point3::new(size, size, size))
    }

    /// Prism extruding the triangle a, b, c from `z0` to `z1`.
    ///
    /// The base is reordered counter-clockwise so faces point outward.
    pub fn triangular_prism(a: Point, b: Point, c: Point, z0: CoordF, z1: CoordF) -> Self {
        let (a, b, c) = if (b - a).cross(&(c - a)) < 0.0 {
            (a, c, b)
        } else {
            (a, b, c)
        };
        let base = [a, b, c];
        let lo = |p: Point| Point3::new(p.x, p.y, z0);
        let hi = |p: Point| Point3::new(p.x, p.y, z1);

        let mut triangles = vec![
            Triangle::from_positions(lo(a), lo(c), lo(b)),
            Triangle::from_positions(hi(a), hi(b), hi(c)),
        ];
        for i in 0..3 {
            let p = base[i];
            let q = base[(i + 1) % 3];
            triangles.push(Triangle::from_positions(lo(p), lo(q), hi(q)));
            triangles.push(Triangle::from_positions(lo(p), hi(q), hi(p)));
        }
        Self::from_triangles(triangles)
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mesh({} triangles)", self.triangles.len())
    }
}
