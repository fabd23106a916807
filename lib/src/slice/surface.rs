//! Top and bottom surface detection.
//!
//! Surface types are detected by comparing the current layer's region with
//! the regions of the adjacent layers:
//!
//! - **Top**: areas of the current layer not covered by the layer above
//! - **Bottom**: areas of the current layer not supported by the layer below
//!
//! A missing neighbour (first or last layer) makes the whole region top or
//! bottom. Both get dense infill; the rest of the infill area is sparse.

use crate::clipper::{self, difference, empty_region, intersection, remove_small, union, Region};
use crate::CoordF;

/// Default sliver threshold (mm²).
pub const DEFAULT_MIN_SURFACE_AREA: CoordF = 0.01;

/// Classified regions of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Surfaces {
    pub top: Region,
    pub bottom: Region,
    /// Infill area that needs solid fill.
    pub dense: Region,
    /// Remaining infill area.
    pub sparse: Region,
}

impl Default for Surfaces {
    fn default() -> Self {
        Self {
            top: empty_region(),
            bottom: empty_region(),
            dense: empty_region(),
            sparse: empty_region(),
        }
    }
}

impl Surfaces {
    pub fn has_dense(&self) -> bool {
        !self.dense.0.is_empty()
    }

    pub fn dense_area(&self) -> CoordF {
        clipper::area(&self.dense)
    }

    pub fn sparse_area(&self) -> CoordF {
        clipper::area(&self.sparse)
    }
}

/// Split `infill_region` into dense and sparse parts.
///
/// `current` is the layer's full region (solids minus holes), `below` and
/// `above` the same for the neighbours when they exist. Pieces under
/// `min_area` mm² are dropped from every result.
pub fn detect_surfaces(
    current: &Region,
    below: Option<&Region>,
    above: Option<&Region>,
    infill_region: &Region,
    min_area: CoordF,
) -> Surfaces {
    // Top = areas not covered by the layer above
    let top = match above {
        Some(upper) => remove_small(&difference(current, upper), min_area),
        None => current.clone(),
    };
    // Bottom = areas not supported by the layer below
    let bottom = match below {
        Some(lower) => remove_small(&difference(current, lower), min_area),
        None => current.clone(),
    };

    let dense = remove_small(&intersection(&union(&top, &bottom), infill_region), min_area);
    let sparse = remove_small(&difference(infill_region, &dense), min_area);

    Surfaces {
        top,
        bottom,
        dense,
        sparse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipper::{area, rectangle};
    use crate::geometry::Point;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        rectangle(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn test_first_layer_is_all_bottom() {
        let current = rect(0.0, 0.0, 10.0, 10.0);
        let infill = rect(1.0, 1.0, 9.0, 9.0);
        let s = detect_surfaces(&current, None, Some(&current), &infill, 0.01);
        assert_eq!(s.bottom, current);
        assert!(s.top.0.is_empty());
        assert!((s.dense_area() - 64.0).abs() < 1e-6);
        assert!(s.sparse.0.is_empty());
    }

    #[test]
    fn test_middle_layer_is_sparse() {
        let current = rect(0.0, 0.0, 10.0, 10.0);
        let infill = rect(1.0, 1.0, 9.0, 9.0);
        let s = detect_surfaces(&current, Some(&current), Some(&current), &infill, 0.01);
        assert!(!s.has_dense());
        assert!((s.sparse_area() - 64.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_roof() {
        // Layer above only covers the left half.
        let current = rect(0.0, 0.0, 10.0, 10.0);
        let above = rect(0.0, 0.0, 5.0, 10.0);
        let infill = rect(1.0, 1.0, 9.0, 9.0);
        let s = detect_surfaces(&current, Some(&current), Some(&above), &infill, 0.01);
        assert!((area(&s.top) - 50.0).abs() < 1e-6);
        // Infill x in 5..9 is under open sky.
        assert!((s.dense_area() - 32.0).abs() < 1e-6);
        assert!((s.sparse_area() - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_is_empty() {
        let s = Surfaces::default();
        assert!(!s.has_dense());
        assert_eq!(s.sparse_area(), 0.0);
        assert!(s.top.0.is_empty() && s.bottom.0.is_empty());
    }

    #[test]
    fn test_slivers_dropped() {
        let current = rect(0.0, 0.0, 10.0, 10.0);
        let above = rect(0.0, 0.0, 10.0, 9.999);
        let infill = rect(0.0, 0.0, 10.0, 10.0);
        let s = detect_surfaces(&current, Some(&current), Some(&above), &infill, 0.05);
        assert!(s.top.0.is_empty());
        assert!(!s.has_dense());
    }
}
