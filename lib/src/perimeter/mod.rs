//! Wall generation.
//!
//! Classified boundaries are turned into printable walls in three steps:
//!
//! 1. Erosion: every contour shrinks, and every hole grows, by half an
//!    extrusion width so the outer wall's centreline sits inside the part.
//! 2. Shells: each eroded boundary is offset `shell_count` more times at one
//!    extrusion width per step. Offsetting stops early when a loop vanishes.
//! 3. Infill region: the innermost loops (solids minus holes) shrunk by half
//!    an extrusion width, which is where infill may go.

use crate::clipper::{self, Region, DEFAULT_MITER_LIMIT};
use crate::geometry::{Polygon, Role};
use crate::slice::{LayerError, LayerIssue};
use crate::CoordF;

/// Configuration for wall generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerimeterConfig {
    /// Extrusion width, taken equal to the nozzle diameter (mm).
    pub extrusion_width: CoordF,
    /// Number of shells after erosion.
    pub shell_count: usize,
    /// Miter limit for offset corners.
    pub miter_limit: f64,
}

impl Default for PerimeterConfig {
    fn default() -> Self {
        Self {
            extrusion_width: 0.4,
            shell_count: 2,
            miter_limit: DEFAULT_MITER_LIMIT,
        }
    }
}

impl PerimeterConfig {
    pub fn new(extrusion_width: CoordF, shell_count: usize) -> Self {
        Self {
            extrusion_width,
            shell_count,
            ..Default::default()
        }
    }

    pub fn with_miter_limit(mut self, miter_limit: f64) -> Self {
        self.miter_limit = miter_limit;
        self
    }
}

/// Walls for one layer.
#[derive(Debug, Clone)]
pub struct PerimeterResult {
    /// Eroded contours and holes, in input order.
    pub boundaries: Vec<Polygon>,
    /// Shell loops, boundary by boundary, outermost first.
    pub shells: Vec<Polygon>,
    /// Area left for infill.
    pub infill_region: Region,
    pub issues: Vec<LayerIssue>,
}

impl Default for PerimeterResult {
    fn default() -> Self {
        Self {
            boundaries: Vec::new(),
            shells: Vec::new(),
            infill_region: clipper::empty_region(),
            issues: Vec::new(),
        }
    }
}

impl PerimeterResult {
    /// Eroded boundaries followed by shells.
    pub fn into_polygons(self) -> Vec<Polygon> {
        let mut out = self.boundaries;
        out.extend(self.shells);
        out
    }
}

/// Generates walls from classified boundaries.
#[derive(Debug, Clone)]
pub struct PerimeterGenerator {
    config: PerimeterConfig,
}

impl PerimeterGenerator {
    pub fn new(config: PerimeterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PerimeterConfig {
        &self.config
    }

    /// Erode boundaries, generate shells and compute the infill region.
    ///
    /// Only closed polygons with role [`Role::Contour`] or [`Role::Hole`] are
    /// used; everything else is ignored. `index` is the layer index used in
    /// errors.
    pub fn generate(
        &self,
        index: usize,
        polygons: &[Polygon],
    ) -> Result<PerimeterResult, LayerError> {
        let width = self.config.extrusion_width;
        let miter = self.config.miter_limit;
        let mut result = PerimeterResult::default();

        let mut vanished = 0;
        let mut dropped = 0;
        let mut innermost: Vec<Polygon> = Vec::new();

        for polygon in polygons
            .iter()
            .filter(|p| p.role().is_boundary() && p.is_closed())
        {
            // Contours move inward, holes outward.
            let inward = if polygon.role() == Role::Hole { 1.0 } else { -1.0 };

            let Some((eroded, lost)) =
                clipper::offset_polygon_split(polygon, inward * width / 2.0, miter)
            else {
                vanished += 1;
                continue;
            };
            dropped += lost;
            check_finite(index, &eroded)?;

            let mut current = eroded.clone();
            let mut generated = 0;
            for _ in 0..self.config.shell_count {
                match clipper::offset_polygon_split(&current, inward * width, miter) {
                    Some((next, lost)) => {
                        check_finite(index, &next)?;
                        dropped += lost;
                        result.shells.push(next.clone().with_role(Role::Shell));
                        current = next;
                        generated += 1;
                    }
                    None => break,
                }
            }
            if generated < self.config.shell_count {
                log::debug!(
                    "Layer {}: {} of {} shells fit",
                    index,
                    generated,
                    self.config.shell_count
                );
                result.issues.push(LayerIssue::ShellsTruncated {
                    requested: self.config.shell_count,
                    generated,
                });
            }

            result.boundaries.push(eroded);
            // `current` keeps the boundary's role so holes stay holes.
            innermost.push(current);
        }

        if vanished > 0 {
            result
                .issues
                .push(LayerIssue::VanishedOnErosion { count: vanished });
        }
        if dropped > 0 {
            log::warn!("Layer {}: offsets split loops, {} pieces dropped", index, dropped);
            result.issues.push(LayerIssue::SplitOnOffset { dropped });
        }

        let walls = clipper::region_from_polygons(&innermost);
        result.infill_region = clipper::offset_region(&walls, -width / 2.0, miter);
        Ok(result)
    }
}

fn check_finite(index: usize, polygon: &Polygon) -> Result<(), LayerError> {
    if polygon.is_finite() {
        Ok(())
    } else {
        Err(LayerError::Offset {
            index,
            reason: "non-finite coordinate in offset ring".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(x: f64, y: f64, size: f64, role: Role) -> Polygon {
        let mut p = Polygon::closed(
            &[
                Point::new(x, y),
                Point::new(x + size, y),
                Point::new(x + size, y + size),
                Point::new(x, y + size),
            ],
            role,
        );
        if role == Role::Hole {
            p.reverse();
        }
        p
    }

    #[test]
    fn test_erosion_and_shells() {
        let gen = PerimeterGenerator::new(PerimeterConfig::new(0.4, 2));
        let result = gen
            .generate(0, &[square(0.0, 0.0, 20.0, Role::Contour)])
            .unwrap();

        assert_eq!(result.boundaries.len(), 1);
        let eroded = &result.boundaries[0];
        assert_eq!(eroded.role(), Role::Contour);
        // 20 - 2 * 0.2
        assert!((eroded.area() - 19.6 * 19.6).abs() < 1e-3);

        assert_eq!(result.shells.len(), 2);
        assert!(result.shells.iter().all(|s| s.role() == Role::Shell));
        assert!((result.shells[1].area() - 18.0 * 18.0).abs() < 1e-3);

        // Innermost 18x18 shrunk by 0.2.
        assert!((clipper::area(&result.infill_region) - 17.6 * 17.6).abs() < 1e-3);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_hole_grows() {
        let gen = PerimeterGenerator::new(PerimeterConfig::new(0.4, 1));
        let polys = [
            square(0.0, 0.0, 20.0, Role::Contour),
            square(8.0, 8.0, 4.0, Role::Hole),
        ];
        let result = gen.generate(0, &polys).unwrap();
        let hole = &result.boundaries[1];
        assert_eq!(hole.role(), Role::Hole);
        assert!(hole.is_clockwise());
        assert!((hole.area() - 4.4 * 4.4).abs() < 1e-3);

        // Solid 18.8^2 minus hole 5.2^2, then each side moves 0.2 more.
        let expected = 18.4 * 18.4 - 5.6 * 5.6;
        assert!((clipper::area(&result.infill_region) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_vanished_on_erosion() {
        let gen = PerimeterGenerator::new(PerimeterConfig::new(0.4, 2));
        let result = gen
            .generate(3, &[square(0.0, 0.0, 0.3, Role::Contour)])
            .unwrap();
        assert!(result.boundaries.is_empty());
        assert_eq!(
            result.issues,
            vec![LayerIssue::VanishedOnErosion { count: 1 }]
        );
        assert!(result.infill_region.0.is_empty());
    }

    #[test]
    fn test_shells_truncated() {
        let gen = PerimeterGenerator::new(PerimeterConfig::new(0.4, 5));
        let result = gen
            .generate(0, &[square(0.0, 0.0, 1.8, Role::Contour)])
            .unwrap();
        // 1.8 -> 1.4 eroded -> 0.6 -> gone
        assert_eq!(result.shells.len(), 1);
        assert_eq!(
            result.issues,
            vec![LayerIssue::ShellsTruncated {
                requested: 5,
                generated: 1
            }]
        );
    }

    #[test]
    fn test_pinched_boundary_reports_split() {
        let gen = PerimeterGenerator::new(PerimeterConfig::new(0.4, 1));
        let result = gen
            .generate(0, &[clipper::tests::dumbbell()])
            .unwrap();
        assert_eq!(result.boundaries.len(), 1);
        assert!((result.boundaries[0].area() - 9.6 * 9.6).abs() < 1e-3);
        assert_eq!(result.issues, vec![LayerIssue::SplitOnOffset { dropped: 1 }]);
    }

    #[test]
    fn test_default_result_is_empty() {
        let result = PerimeterResult::default();
        assert!(result.infill_region.0.is_empty());
        assert!(result.into_polygons().is_empty());
    }

    #[test]
    fn test_ignores_other_roles() {
        let gen = PerimeterGenerator::new(PerimeterConfig::default());
        let line = Polygon::line(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Role::SparseInfill);
        let result = gen.generate(0, &[line]).unwrap();
        assert!(result.boundaries.is_empty());
        assert!(result.shells.is_empty());
    }
}
