//! # Stack Slicer
//!
//! Converts a triangulated surface mesh into a stack of printable layers and
//! a machine toolpath program.
//!
//! The library provides the complete layered slicing pipeline:
//! - Plane cutting of mesh triangles into directed segments
//! - Stitching segments into closed contours
//! - Hole classification, erosion and wall shells
//! - Top/bottom surface detection from neighbouring layers
//! - Parametric infill patterns
//! - Deterministic toolpath serialization
//!
//! ## Example
//!
//! ```rust,ignore
//! use stack_slicer::{Mesh, PipelineConfig, PrintPipeline};
//!
//! let mesh = Mesh::from_json_file("model.json")?;
//! let pipeline = PrintPipeline::new(PipelineConfig::default());
//! let report = pipeline.slice(&mesh)?;
//! let toolpath = pipeline.write_toolpath(&report);
//! toolpath.write_to_file("output.gcode")?;
//! ```

// Core modules
pub mod clipper;
pub mod config;
pub mod gcode;
pub mod geometry;
pub mod infill;
pub mod mesh;
pub mod perimeter;
pub mod pipeline;
pub mod render;
pub mod slice;

// Re-export commonly used types
pub use config::{InfillKind, PipelineConfig, SliceConfig, WriterConfig};
pub use gcode::{
    extrusion_length, Param, ParamValue, Toolpath, ToolpathCommand, ToolpathStats, ToolpathWriter,
};
pub use geometry::{IntPoint, Point, Point3, Polygon, Role, Segment};
pub use infill::generate_pattern;
pub use mesh::{Mesh, Triangle, Vertex};
pub use pipeline::{
    CancelToken, PipelineState, PrintPipeline, ProgressEvent, ProgressPhase, SliceReport,
};
pub use render::{Color, Stroke};
pub use slice::{
    classify_holes, cut_triangle, stitch, CutResult, Layer, LayerError, LayerIssue, LayerSlot,
    LayerStack, StitchResult,
};

/// Fixed-point coordinate type used for the integer vertex loops.
pub type Coord = i64;

/// Floating-point coordinate type (millimetres).
pub type CoordF = f64;

/// Scaling factor between millimetres and fixed-point units.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Absolute epsilon for point and plane comparisons (mm).
pub const EPSILON: f64 = 1e-6;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the slicer.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
///
/// Only input validation and I/O reach the caller as an `Error`; geometric
/// trouble inside a single layer is recorded on that layer instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        // 1mm should scale to 1_000_000
        assert_eq!(scale(1.0), 1_000_000);

        // And back
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);

        // Sub-micron precision
        assert_eq!(scale(0.001), 1_000);
        assert_eq!(scale(-0.0001), -100);
    }

    #[test]
    fn test_error_display() {
        let err = Error::Config("layer height must be positive".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: layer height must be positive"
        );
    }
}
