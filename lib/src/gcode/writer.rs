//! Layer stack to command stream.
//!
//! Layers are written in increasing Z. Each layer is raised to, every
//! polygon is entered with a rapid move to its first vertex and printed one
//! segment at a time with relative extrusion, and the layer ends with a
//! retract and a Z lift.

use super::{round_to, Toolpath, ToolpathCommand, ToolpathStats};
use crate::config::{SliceConfig, WriterConfig};
use crate::geometry::{Point, Polygon, Role};
use crate::slice::{Layer, LayerStack};
use crate::{CoordF, EPSILON};

/// Filament length needed to print `segment_length` mm of one bead.
#[inline]
pub fn extrusion_length(
    layer_height: CoordF,
    nozzle_diameter: CoordF,
    segment_length: CoordF,
    filament_diameter: CoordF,
) -> CoordF {
    layer_height * nozzle_diameter * segment_length / filament_diameter
}

/// Bead geometry used for extrusion accounting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrusion {
    pub layer_height: CoordF,
    pub nozzle_diameter: CoordF,
    pub filament_diameter: CoordF,
}

impl Extrusion {
    pub fn length(&self, segment_length: CoordF) -> CoordF {
        extrusion_length(
            self.layer_height,
            self.nozzle_diameter,
            segment_length,
            self.filament_diameter,
        )
    }
}

impl From<&SliceConfig> for Extrusion {
    fn from(config: &SliceConfig) -> Self {
        Self {
            layer_height: config.layer_height,
            nozzle_diameter: config.nozzle_diameter,
            filament_diameter: config.filament_diameter,
        }
    }
}

impl Default for Extrusion {
    fn default() -> Self {
        Self::from(&SliceConfig::default())
    }
}

/// Serializes finished layers into a [`Toolpath`].
#[derive(Debug, Clone)]
pub struct ToolpathWriter {
    config: WriterConfig,
    extrusion: Extrusion,
}

impl ToolpathWriter {
    pub fn new(config: WriterConfig, extrusion: Extrusion) -> Self {
        Self { config, extrusion }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Write every finished layer of the stack. Failed and cancelled slots
    /// produce nothing.
    pub fn write_stack(&self, stack: &LayerStack) -> Toolpath {
        self.write(stack.layers())
    }

    pub fn write<'a>(&self, layers: impl IntoIterator<Item = &'a Layer>) -> Toolpath {
        let mut layers: Vec<&Layer> = layers.into_iter().collect();
        layers.sort_by(|a, b| a.z.total_cmp(&b.z));

        let mut state = WriteState::default();
        for layer in layers {
            self.write_layer(layer, &mut state);
        }

        log::debug!("Toolpath: {}", state.stats);
        let mut stats = state.stats;
        stats.commands = state.body.len();
        Toolpath {
            startup: self.config.startup.clone(),
            body: state.body,
            teardown: self.config.teardown.clone(),
            stats,
        }
    }

    fn printable(&self, polygon: &Polygon) -> bool {
        !polygon.is_empty() && (self.config.print_open || polygon.role() != Role::Open)
    }

    fn write_layer(&self, layer: &Layer, state: &mut WriteState) {
        if !layer.polygons.iter().any(|p| self.printable(p)) {
            return;
        }
        let cfg = &self.config;

        state.body.push(ToolpathCommand::comment(format!(
            "layer {} z={}",
            layer.index,
            round_to(layer.z, 3)
        )));
        state.body.push(ToolpathCommand::rapid_z(layer.z, Some(cfg.travel_feed)));
        if state.retracted {
            state
                .body
                .push(ToolpathCommand::feed(cfg.retract_length, cfg.retract_feed));
            state.retracted = false;
        }

        for polygon in layer.polygons.iter().filter(|p| self.printable(p)) {
            let Some(start) = polygon.first_point() else {
                continue;
            };
            if let Some(pos) = state.position {
                state.stats.travel_distance += pos.distance(&start);
            }
            state
                .body
                .push(ToolpathCommand::rapid_xy(start.x, start.y, Some(cfg.travel_feed)));
            state.position = Some(start);

            let mut feed = Some(cfg.print_feed);
            for segment in polygon.segments() {
                let length = segment.length();
                if length < EPSILON {
                    continue;
                }
                let e = self.extrusion.length(length);
                state
                    .body
                    .push(ToolpathCommand::extrude_to(segment.end.x, segment.end.y, e, feed.take()));
                state.stats.total_extrusion += e;
                state.stats.print_distance += length;
                state.position = Some(segment.end);
            }
        }

        if cfg.retract_length > 0.0 {
            state
                .body
                .push(ToolpathCommand::feed(-cfg.retract_length, cfg.retract_feed));
            state.retracted = true;
        }
        state
            .body
            .push(ToolpathCommand::rapid_z(layer.z + cfg.lift, Some(cfg.travel_feed)));
        state.stats.layers += 1;
    }
}

#[derive(Default)]
struct WriteState {
    body: Vec<ToolpathCommand>,
    stats: ToolpathStats,
    position: Option<Point>,
    retracted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_layer(index: usize, z: f64) -> Layer {
        let square = Polygon::closed(
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            Role::Contour,
        );
        Layer::new(index, z, z - 0.1, vec![square])
    }

    fn writer() -> ToolpathWriter {
        ToolpathWriter::new(WriterConfig::default(), Extrusion::default())
    }

    #[test]
    fn test_extrusion_length() {
        let e = extrusion_length(0.2, 0.4, 10.0, 1.75);
        assert!((e - 0.4571428571).abs() < 1e-9);
    }

    #[test]
    fn test_layer_sequence() {
        let toolpath = writer().write([&square_layer(0, 0.2)]);
        let lines: Vec<String> = toolpath.body.iter().map(|c| c.to_gcode()).collect();
        assert_eq!(
            lines,
            vec![
                "; layer 0 z=0.2",
                "G0 Z0.2 F3000",
                "G0 X0 Y0 F3000",
                "G1 X10 Y0 E0.45714 F1500",
                "G1 X10 Y10 E0.45714",
                "G1 X0 Y10 E0.45714",
                "G1 X0 Y0 E0.45714",
                "G1 E-1 F2100",
                "G0 Z0.6 F3000",
            ]
        );
        assert_eq!(toolpath.stats.layers, 1);
        assert_eq!(toolpath.stats.commands, 9);
        assert!((toolpath.stats.print_distance - 40.0).abs() < 1e-9);
        assert!((toolpath.stats.total_extrusion - 4.0 * 0.4571428571).abs() < 1e-6);
    }

    #[test]
    fn test_unretract_before_next_layer() {
        let (a, b) = (square_layer(0, 0.2), square_layer(1, 0.4));
        let toolpath = writer().write([&b, &a]);
        let lines: Vec<String> = toolpath.body.iter().map(|c| c.to_gcode()).collect();
        // Sorted by Z regardless of input order.
        assert_eq!(lines[1], "G0 Z0.2 F3000");
        assert_eq!(lines[10], "G0 Z0.4 F3000");
        assert_eq!(lines[11], "G1 E1 F2100");
        assert_eq!(toolpath.stats.layers, 2);
    }

    #[test]
    fn test_layer_comment_rounds_z() {
        // 3 * 0.1 in floating point is 0.30000000000000004.
        let toolpath = writer().write([&square_layer(2, 3.0 * 0.1)]);
        assert_eq!(toolpath.body[0].to_gcode(), "; layer 2 z=0.3");
    }

    #[test]
    fn test_open_polygons_skipped_by_default() {
        let open = Polygon::open(
            &[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)],
            Role::Open,
        );
        let layer = Layer::new(0, 0.2, 0.1, vec![open]);
        assert!(writer().write([&layer]).body.is_empty());

        let permissive = ToolpathWriter::new(
            WriterConfig::default().print_open(true),
            Extrusion::default(),
        );
        assert_eq!(permissive.write([&layer]).stats.layers, 1);
    }

    #[test]
    fn test_injected_blocks() {
        let config = WriterConfig::default()
            .startup(vec![ToolpathCommand::comment("hello")])
            .teardown(Vec::new());
        let toolpath = ToolpathWriter::new(config, Extrusion::default()).write([]);
        assert_eq!(toolpath.startup, vec![ToolpathCommand::comment("hello")]);
        assert!(toolpath.body.is_empty());
        assert!(toolpath.teardown.is_empty());
    }
}
