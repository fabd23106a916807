//! Slicing module - converts meshes into layers.
//!
//! This module contains the core slicing functionality:
//! - [`plane_cut`] - triangle-plane intersection
//! - [`stitch`] - joining cut segments into polygons
//! - [`classify_holes`] - contour / hole classification
//! - [`surface`] - top and bottom surface detection
//! - [`Layer`] and [`LayerStack`] - finished layers
//! - [`plan_layers`] and [`slice_layer`] - the per-layer contour pass

mod holes;
mod layer;
pub mod plane_cut;
pub mod stitch;
pub mod surface;

pub use holes::classify_holes;
pub use layer::{Layer, LayerError, LayerIssue, LayerSlot, LayerStack};
pub use plane_cut::{cut_triangle, CutResult};
pub use stitch::{stitch, StitchResult, StitchStats};
pub use surface::{detect_surfaces, Surfaces};

use crate::clipper::{region_from_polygons, Region};
use crate::geometry::Polygon;
use crate::mesh::Mesh;
use crate::{CoordF, Error, Result, EPSILON};
use std::sync::OnceLock;

/// Where one layer sits in Z.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerPlan {
    pub index: usize,
    /// Bottom of the slab in mesh coordinates.
    pub bottom: CoordF,
    /// Cutting plane, mid-height of the slab.
    pub cut_z: CoordF,
    /// Print height of the layer top above the build plate.
    pub z: CoordF,
}

/// Upper bound on the number of planned layers.
pub const MAX_LAYER_COUNT: usize = 1_000_000;

/// Plan evenly spaced layers over the mesh's Z extent.
///
/// With `layer_count` absent the count is `ceil(height / layer_height)`.
pub fn plan_layers(
    mesh: &Mesh,
    layer_height: CoordF,
    layer_count: Option<usize>,
) -> Result<Vec<LayerPlan>> {
    if !layer_height.is_finite() || layer_height <= 0.0 {
        return Err(Error::Config(format!(
            "layer height must be positive, got {}",
            layer_height
        )));
    }
    let (min_z, max_z) = mesh
        .z_range()
        .ok_or_else(|| Error::Mesh("mesh has no finite vertices".into()))?;

    if layer_count.is_none() && max_z - min_z <= EPSILON {
        return Err(Error::Geometry(format!("mesh has no height (z = {})", min_z)));
    }
    let count = match layer_count {
        Some(n) => n,
        None => {
            let n = (((max_z - min_z) / layer_height) - EPSILON).ceil().max(0.0);
            if n > MAX_LAYER_COUNT as f64 {
                return Err(Error::Config(format!(
                    "layer height {} gives {:.0} layers, more than {}",
                    layer_height, n, MAX_LAYER_COUNT
                )));
            }
            n as usize
        }
    };
    if count > MAX_LAYER_COUNT {
        return Err(Error::Config(format!(
            "layer count {} exceeds {}",
            count, MAX_LAYER_COUNT
        )));
    }

    Ok((0..count)
        .map(|i| {
            let bottom = min_z + i as CoordF * layer_height;
            LayerPlan {
                index: i,
                bottom,
                cut_z: bottom + layer_height / 2.0,
                z: (i + 1) as CoordF * layer_height,
            }
        })
        .collect())
}

/// Output of the contour pass for one layer.
///
/// Written once, then only read. Hole classification and the layer region
/// are derived on first use, so neighbours can share them.
#[derive(Debug, Default)]
pub struct ContourLayer {
    pub plan: LayerPlan,
    /// Stitched polygons, before hole classification.
    pub polygons: Vec<Polygon>,
    pub stats: StitchStats,
    pub issues: Vec<LayerIssue>,
    pub error: Option<LayerError>,
    pub cancelled: bool,
    classified: OnceLock<Vec<Polygon>>,
    region: OnceLock<Region>,
}

impl ContourLayer {
    pub fn new(plan: LayerPlan, result: StitchResult) -> Self {
        Self {
            plan,
            polygons: result.polygons,
            stats: result.stats,
            ..Default::default()
        }
    }

    pub fn failed(plan: LayerPlan, error: LayerError) -> Self {
        Self {
            plan,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn cancelled(plan: LayerPlan) -> Self {
        Self {
            plan,
            cancelled: true,
            ..Default::default()
        }
    }

    /// Usable by the finishing pass.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && !self.cancelled
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Polygons with holes classified and winding normalised.
    pub fn classified(&self) -> &[Polygon] {
        self.classified.get_or_init(|| {
            let mut polygons = self.polygons.clone();
            classify_holes(&mut polygons);
            polygons
        })
    }

    /// Solids minus holes.
    pub fn region(&self) -> &Region {
        self.region
            .get_or_init(|| region_from_polygons(self.classified()))
    }

    /// Move this layer to a new position in the stack.
    pub fn renumber(&mut self, index: usize, layer_height: CoordF) {
        self.plan.index = index;
        self.plan.z = (index + 1) as CoordF * layer_height;
        if let Some(LayerError::NonFinite { index: i } | LayerError::Offset { index: i, .. }) =
            self.error.as_mut()
        {
            *i = index;
        }
    }
}

/// Cut and stitch one layer.
pub fn slice_layer(mesh: &Mesh, plan: LayerPlan) -> ContourLayer {
    let cut_z = plan.cut_z;
    let cuts = mesh
        .triangles()
        .iter()
        .filter(|t| {
            let (lo, hi) = t.z_range();
            lo <= cut_z + EPSILON && hi >= cut_z - EPSILON
        })
        .map(|t| cut_triangle(t, cut_z));

    let result = stitch(cuts);

    if !result.polygons.iter().all(Polygon::is_finite) {
        return ContourLayer::failed(plan, LayerError::NonFinite { index: plan.index });
    }

    let mut issues = Vec::new();
    if result.polygons.is_empty() {
        issues.push(LayerIssue::EmptyLayer);
    }
    if result.stats.open > 0 {
        log::warn!(
            "Layer {}: {} contours could not be closed",
            plan.index,
            result.stats.open
        );
        issues.push(LayerIssue::OpenContours {
            count: result.stats.open,
        });
    }
    if result.stats.isolated_touches > 0 {
        log::debug!(
            "Layer {}: {} isolated touch points",
            plan.index,
            result.stats.isolated_touches
        );
        issues.push(LayerIssue::IsolatedTouches {
            count: result.stats.isolated_touches,
        });
    }

    let mut layer = ContourLayer::new(plan, result);
    layer.issues = issues;
    layer
}
