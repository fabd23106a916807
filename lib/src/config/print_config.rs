//! Slicing, writer and pipeline configuration types.
//!
//! All three structs are plain serde data with `Default` impls and builder
//! methods. [`PipelineConfig`] bundles the other two and is what the CLI
//! loads from JSON.

use crate::clipper::DEFAULT_MITER_LIMIT;
use crate::gcode::ToolpathCommand;
use crate::slice::surface::DEFAULT_MIN_SURFACE_AREA;
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Infill stripe pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfillKind {
    /// No infill.
    None,
    /// Parallel stripes along X.
    Single,
    /// Parallel stripes along Y.
    SingleRotated,
    /// Grid with doubled spacing.
    Rectangle,
    /// 0° + 90° grid.
    #[default]
    Square,
    /// 45° + 135° grid.
    Diamond,
    /// Three stripe sets concurrent at the centre.
    Triangles,
    /// Three stripe sets, the third shifted half a step.
    TriHexagons,
}

impl InfillKind {
    pub const ALL: [InfillKind; 8] = [
        InfillKind::None,
        InfillKind::Single,
        InfillKind::SingleRotated,
        InfillKind::Rectangle,
        InfillKind::Square,
        InfillKind::Diamond,
        InfillKind::Triangles,
        InfillKind::TriHexagons,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InfillKind::None => "none",
            InfillKind::Single => "single",
            InfillKind::SingleRotated => "single_rotated",
            InfillKind::Rectangle => "rectangle",
            InfillKind::Square => "square",
            InfillKind::Diamond => "diamond",
            InfillKind::Triangles => "triangles",
            InfillKind::TriHexagons => "tri_hexagons",
        }
    }
}

impl fmt::Display for InfillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InfillKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        InfillKind::ALL
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| Error::Config(format!("unknown infill kind '{}'", s)))
    }
}

/// Geometry settings for the slicing pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    // === Extrusion ===
    /// Nozzle diameter (mm). Also the extrusion width.
    pub nozzle_diameter: CoordF,
    /// Filament diameter (mm).
    pub filament_diameter: CoordF,

    // === Layers ===
    /// Layer height (mm).
    pub layer_height: CoordF,
    /// Fixed number of layers. Derived from the mesh height when absent.
    pub layer_count: Option<usize>,
    /// Drop empty layers below the first non-empty one.
    pub trim_leading_empty: bool,

    // === Walls ===
    /// Number of shells inside the eroded boundary.
    pub shell_count: usize,
    /// Miter limit for offset corners.
    pub miter_limit: f64,

    // === Infill ===
    pub infill_kind: InfillKind,
    /// Stripe spacing as a multiple of the nozzle diameter.
    pub infill_spacing: CoordF,
    /// Top/bottom pieces smaller than this are ignored (mm²).
    pub min_surface_area: CoordF,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            layer_height: 0.2,
            layer_count: None,
            trim_leading_empty: false,
            shell_count: 2,
            miter_limit: DEFAULT_MITER_LIMIT,
            infill_kind: InfillKind::Square,
            infill_spacing: 5.0,
            min_surface_area: DEFAULT_MIN_SURFACE_AREA,
        }
    }
}

impl SliceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nozzle_diameter(mut self, diameter: CoordF) -> Self {
        self.nozzle_diameter = diameter;
        self
    }

    pub fn filament_diameter(mut self, diameter: CoordF) -> Self {
        self.filament_diameter = diameter;
        self
    }

    pub fn layer_height(mut self, height: CoordF) -> Self {
        self.layer_height = height;
        self
    }

    pub fn layer_count(mut self, count: Option<usize>) -> Self {
        self.layer_count = count;
        self
    }

    pub fn trim_leading_empty(mut self, trim: bool) -> Self {
        self.trim_leading_empty = trim;
        self
    }

    pub fn shell_count(mut self, count: usize) -> Self {
        self.shell_count = count;
        self
    }

    pub fn infill_kind(mut self, kind: InfillKind) -> Self {
        self.infill_kind = kind;
        self
    }

    pub fn infill_spacing(mut self, spacing: CoordF) -> Self {
        self.infill_spacing = spacing;
        self
    }

    /// Check for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        positive("layer height", self.layer_height)?;
        positive("nozzle diameter", self.nozzle_diameter)?;
        positive("filament diameter", self.filament_diameter)?;
        positive("infill spacing", self.infill_spacing)?;
        if !self.miter_limit.is_finite() || self.miter_limit < 1.0 {
            return Err(Error::Config(format!(
                "miter limit must be at least 1, got {}",
                self.miter_limit
            )));
        }
        if !self.min_surface_area.is_finite() || self.min_surface_area < 0.0 {
            return Err(Error::Config(format!(
                "minimum surface area must not be negative, got {}",
                self.min_surface_area
            )));
        }
        if self.layer_count == Some(0) {
            return Err(Error::Config("layer count must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Display for SliceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SliceConfig(layer={:.2}mm, nozzle={:.2}mm, shells={}, infill={} x{})",
            self.layer_height,
            self.nozzle_diameter,
            self.shell_count,
            self.infill_kind,
            self.infill_spacing
        )
    }
}

/// Settings for toolpath output.
///
/// Feed rates are in mm/min, as written to the program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    // === Speeds ===
    pub print_feed: CoordF,
    pub travel_feed: CoordF,

    // === Retraction ===
    /// Filament pulled back at the end of each layer (mm).
    pub retract_length: CoordF,
    pub retract_feed: CoordF,
    /// Z raise after the end-of-layer retract (mm).
    pub lift: CoordF,

    /// Print unclosed chains as well.
    pub print_open: bool,

    // === Program blocks ===
    /// Commands emitted before the first layer.
    pub startup: Vec<ToolpathCommand>,
    /// Commands emitted after the last layer.
    pub teardown: Vec<ToolpathCommand>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            print_feed: 1500.0,
            travel_feed: 3000.0,
            retract_length: 1.0,
            retract_feed: 2100.0,
            lift: 0.4,
            print_open: false,
            startup: default_startup(),
            teardown: default_teardown(),
        }
    }
}

/// Home, absolute positioning, relative extrusion, heat up.
pub fn default_startup() -> Vec<ToolpathCommand> {
    vec![
        ToolpathCommand::Home {
            x: true,
            y: true,
            z: true,
        },
        ToolpathCommand::AbsolutePositioning,
        ToolpathCommand::RelativeExtrusion,
        ToolpathCommand::SetBedTempWait { s: 60 },
        ToolpathCommand::SetExtruderTempWait { s: 200 },
        ToolpathCommand::SetPosition {
            x: None,
            y: None,
            z: None,
            e: Some(0.0),
        },
        ToolpathCommand::SetFanSpeed { s: 255, fan: 0 },
    ]
}

/// Cool down, park and release the motors.
pub fn default_teardown() -> Vec<ToolpathCommand> {
    vec![
        ToolpathCommand::FanOff { fan: 0 },
        ToolpathCommand::SetExtruderTemp { s: 0 },
        ToolpathCommand::SetBedTemp { s: 0 },
        ToolpathCommand::Home {
            x: true,
            y: true,
            z: false,
        },
        ToolpathCommand::DisableMotors,
    ]
}

impl WriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_feed(mut self, feed: CoordF) -> Self {
        self.print_feed = feed;
        self
    }

    pub fn travel_feed(mut self, feed: CoordF) -> Self {
        self.travel_feed = feed;
        self
    }

    pub fn retract(mut self, length: CoordF, feed: CoordF) -> Self {
        self.retract_length = length;
        self.retract_feed = feed;
        self
    }

    pub fn lift(mut self, lift: CoordF) -> Self {
        self.lift = lift;
        self
    }

    pub fn print_open(mut self, enabled: bool) -> Self {
        self.print_open = enabled;
        self
    }

    pub fn startup(mut self, commands: Vec<ToolpathCommand>) -> Self {
        self.startup = commands;
        self
    }

    pub fn teardown(mut self, commands: Vec<ToolpathCommand>) -> Self {
        self.teardown = commands;
        self
    }

    pub fn validate(&self) -> Result<()> {
        positive("print feed", self.print_feed)?;
        positive("travel feed", self.travel_feed)?;
        non_negative("retract length", self.retract_length)?;
        if self.retract_length > 0.0 {
            positive("retract feed", self.retract_feed)?;
        }
        non_negative("lift", self.lift)?;
        Ok(())
    }
}

impl fmt::Display for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WriterConfig(print=F{}, travel=F{}, retract={:.2}mm, lift={:.2}mm)",
            self.print_feed, self.travel_feed, self.retract_length, self.lift
        )
    }
}

/// Everything the pipeline and writer need.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub slice: SliceConfig,
    pub writer: WriterConfig,
    /// Worker threads. Uses rayon's global pool when absent.
    pub threads: Option<usize>,
    /// Bound of the progress event channel.
    pub progress_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slice: SliceConfig::default(),
            writer: WriterConfig::default(),
            threads: None,
            progress_capacity: 64,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing fields keep defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder: set layer height.
    pub fn layer_height(mut self, height: CoordF) -> Self {
        self.slice.layer_height = height;
        self
    }

    /// Builder: set nozzle diameter.
    pub fn nozzle_diameter(mut self, diameter: CoordF) -> Self {
        self.slice.nozzle_diameter = diameter;
        self
    }

    /// Builder: set filament diameter.
    pub fn filament_diameter(mut self, diameter: CoordF) -> Self {
        self.slice.filament_diameter = diameter;
        self
    }

    /// Builder: set number of shells.
    pub fn shell_count(mut self, count: usize) -> Self {
        self.slice.shell_count = count;
        self
    }

    /// Builder: set infill pattern and spacing multiplier.
    pub fn infill(mut self, kind: InfillKind, spacing: CoordF) -> Self {
        self.slice.infill_kind = kind;
        self.slice.infill_spacing = spacing;
        self
    }

    /// Builder: fix the number of layers.
    pub fn layer_count(mut self, count: Option<usize>) -> Self {
        self.slice.layer_count = count;
        self
    }

    /// Builder: drop leading empty layers at the barrier.
    pub fn trim_leading_empty(mut self, trim: bool) -> Self {
        self.slice.trim_leading_empty = trim;
        self
    }

    /// Builder: set the worker thread count.
    pub fn threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.slice.validate()?;
        self.writer.validate()?;
        if self.threads == Some(0) {
            return Err(Error::Config("thread count must be positive".into()));
        }
        if self.progress_capacity == 0 {
            return Err(Error::Config("progress capacity must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.slice, self.writer)?;
        if let Some(n) = self.threads {
            write!(f, ", threads={}", n)?;
        }
        Ok(())
    }
}

fn positive(name: &str, value: CoordF) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: CoordF) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must not be negative, got {}",
            name, value
        )))
    }
}
