//! Toolpath command model and program output.
//!
//! Every command is a variant of [`ToolpathCommand`] with a fixed field
//! table returned by [`ToolpathCommand::params`]. Formatting walks that
//! table; nothing is looked up at runtime.
//!
//! Line grammar: `<TypeLetter><SubTypeNumber>[ <ParamLetter><value>]*`.
//!
//! - flags are written only when set, without a value
//! - enumerated codes are written only when non-zero
//! - other present values are written as `<Letter><value>`
//!
//! On movement commands X/Y/Z are rounded to 3 decimals and E to 5.

mod generator;
mod writer;

pub use generator::{Toolpath, ToolpathStats};
pub use writer::{extrusion_length, Extrusion, ToolpathWriter};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed value slot of one command parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Decimal(Option<f64>),
    Integer(Option<i64>),
    Flag(bool),
    /// Enumerated value, written only when non-zero.
    Code(u8),
}

/// One entry of a command's field table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Param {
    pub letter: char,
    pub value: ParamValue,
}

impl Param {
    const fn decimal(letter: char, value: Option<f64>) -> Self {
        Self {
            letter,
            value: ParamValue::Decimal(value),
        }
    }

    const fn integer(letter: char, value: Option<i64>) -> Self {
        Self {
            letter,
            value: ParamValue::Integer(value),
        }
    }

    const fn flag(letter: char, value: bool) -> Self {
        Self {
            letter,
            value: ParamValue::Flag(value),
        }
    }

    const fn code(letter: char, value: u8) -> Self {
        Self {
            letter,
            value: ParamValue::Code(value),
        }
    }

    /// Text for this parameter, or `None` when it is not emitted.
    pub fn render(&self, movement: bool) -> Option<String> {
        match self.value {
            ParamValue::Decimal(Some(v)) => {
                let v = match (movement, self.letter) {
                    (true, 'X' | 'Y' | 'Z') => round_to(v, 3),
                    (true, 'E') => round_to(v, 5),
                    _ => normalize_zero(v),
                };
                Some(format!("{}{}", self.letter, v))
            }
            ParamValue::Integer(Some(v)) => Some(format!("{}{}", self.letter, v)),
            ParamValue::Flag(true) => Some(self.letter.to_string()),
            ParamValue::Code(c) if c > 0 => Some(format!("{}{}", self.letter, c)),
            _ => None,
        }
    }
}

/// Round to `decimals` places as `(v * 10^n).round() / 10^n`.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    normalize_zero((v * factor).round() / factor)
}

fn normalize_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Machine instruction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ToolpathCommand {
    /// G0 - Rapid move (travel)
    RapidMove {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        f: Option<f64>,
    },
    /// G1 - Linear move (extrusion)
    LinearMove {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        f: Option<f64>,
    },
    /// G4 - Dwell (milliseconds)
    Dwell { p: Option<i64> },
    /// G28 - Home
    Home { x: bool, y: bool, z: bool },
    /// G90 - Absolute positioning
    AbsolutePositioning,
    /// G91 - Relative positioning
    RelativePositioning,
    /// G92 - Set position
    SetPosition {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
    },
    /// M82 - Absolute extrusion
    AbsoluteExtrusion,
    /// M83 - Relative extrusion
    RelativeExtrusion,
    /// M84 - Disable motors
    DisableMotors,
    /// M104 - Set extruder temperature (no wait)
    SetExtruderTemp { s: i64 },
    /// M109 - Set extruder temperature and wait
    SetExtruderTempWait { s: i64 },
    /// M140 - Set bed temperature (no wait)
    SetBedTemp { s: i64 },
    /// M190 - Set bed temperature and wait
    SetBedTempWait { s: i64 },
    /// M106 - Set fan speed, `fan` selects a secondary fan
    SetFanSpeed {
        s: i64,
        #[serde(default)]
        fan: u8,
    },
    /// M107 - Fan off
    FanOff {
        #[serde(default)]
        fan: u8,
    },
    /// T - Select tool
    SelectTool { tool: u8 },
    /// `; text`
    Comment { text: String },
}

impl ToolpathCommand {
    pub fn rapid_xy(x: f64, y: f64, f: Option<f64>) -> Self {
        ToolpathCommand::RapidMove {
            x: Some(x),
            y: Some(y),
            z: None,
            f,
        }
    }

    pub fn rapid_z(z: f64, f: Option<f64>) -> Self {
        ToolpathCommand::RapidMove {
            x: None,
            y: None,
            z: Some(z),
            f,
        }
    }

    pub fn extrude_to(x: f64, y: f64, e: f64, f: Option<f64>) -> Self {
        ToolpathCommand::LinearMove {
            x: Some(x),
            y: Some(y),
            z: None,
            e: Some(e),
            f,
        }
    }

    /// Filament-only move, negative to retract.
    pub fn feed(e: f64, f: f64) -> Self {
        ToolpathCommand::LinearMove {
            x: None,
            y: None,
            z: None,
            e: Some(e),
            f: Some(f),
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        ToolpathCommand::Comment { text: text.into() }
    }

    /// Type letter and sub-type number.
    pub fn code(&self) -> (char, u32) {
        use ToolpathCommand::*;
        match self {
            RapidMove { .. } => ('G', 0),
            LinearMove { .. } => ('G', 1),
            Dwell { .. } => ('G', 4),
            Home { .. } => ('G', 28),
            AbsolutePositioning => ('G', 90),
            RelativePositioning => ('G', 91),
            SetPosition { .. } => ('G', 92),
            AbsoluteExtrusion => ('M', 82),
            RelativeExtrusion => ('M', 83),
            DisableMotors => ('M', 84),
            SetExtruderTemp { .. } => ('M', 104),
            SetExtruderTempWait { .. } => ('M', 109),
            SetBedTemp { .. } => ('M', 140),
            SetBedTempWait { .. } => ('M', 190),
            SetFanSpeed { .. } => ('M', 106),
            FanOff { .. } => ('M', 107),
            SelectTool { tool } => ('T', u32::from(*tool)),
            Comment { .. } => (';', 0),
        }
    }

    /// Field table in output order.
    pub fn params(&self) -> Vec<Param> {
        use ToolpathCommand::*;
        match self {
            RapidMove { x, y, z, f } => vec![
                Param::decimal('X', *x),
                Param::decimal('Y', *y),
                Param::decimal('Z', *z),
                Param::decimal('F', *f),
            ],
            LinearMove { x, y, z, e, f } => vec![
                Param::decimal('X', *x),
                Param::decimal('Y', *y),
                Param::decimal('Z', *z),
                Param::decimal('E', *e),
                Param::decimal('F', *f),
            ],
            Dwell { p } => vec![Param::integer('P', *p)],
            Home { x, y, z } => vec![
                Param::flag('X', *x),
                Param::flag('Y', *y),
                Param::flag('Z', *z),
            ],
            SetPosition { x, y, z, e } => vec![
                Param::decimal('X', *x),
                Param::decimal('Y', *y),
                Param::decimal('Z', *z),
                Param::decimal('E', *e),
            ],
            SetExtruderTemp { s }
            | SetExtruderTempWait { s }
            | SetBedTemp { s }
            | SetBedTempWait { s } => vec![Param::integer('S', Some(*s))],
            SetFanSpeed { s, fan } => vec![Param::integer('S', Some(*s)), Param::code('P', *fan)],
            FanOff { fan } => vec![Param::code('P', *fan)],
            AbsolutePositioning | RelativePositioning | AbsoluteExtrusion | RelativeExtrusion
            | DisableMotors | SelectTool { .. } | Comment { .. } => Vec::new(),
        }
    }

    /// G0 and G1.
    pub fn is_movement(&self) -> bool {
        matches!(
            self,
            ToolpathCommand::RapidMove { .. } | ToolpathCommand::LinearMove { .. }
        )
    }

    /// One program line, without the newline.
    pub fn to_gcode(&self) -> String {
        if let ToolpathCommand::Comment { text } = self {
            return format!("; {}", text);
        }
        let (letter, number) = self.code();
        let movement = self.is_movement();
        let mut line = format!("{}{}", letter, number);
        for param in self.params() {
            if let Some(text) = param.render(movement) {
                line.push(' ');
                line.push_str(&text);
            }
        }
        line
    }
}

impl fmt::Display for ToolpathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gcode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_move_rounding() {
        let cmd = ToolpathCommand::LinearMove {
            x: Some(1.23456),
            y: None,
            z: Some(0.5),
            e: Some(0.123456),
            f: Some(1500.0),
        };
        assert_eq!(cmd.to_gcode(), "G1 X1.235 Z0.5 E0.12346 F1500");
    }

    #[test]
    fn test_rapid_move() {
        let cmd = ToolpathCommand::rapid_xy(10.0, 20.0, Some(3000.0));
        assert_eq!(cmd.to_gcode(), "G0 X10 Y20 F3000");
    }

    #[test]
    fn test_negative_zero_normalized() {
        let cmd = ToolpathCommand::rapid_xy(-0.0001, 2.0, None);
        assert_eq!(cmd.to_gcode(), "G0 X0 Y2");
    }

    #[test]
    fn test_feedrate_unrounded() {
        let cmd = ToolpathCommand::feed(-1.0, 2100.25);
        assert_eq!(cmd.to_gcode(), "G1 E-1 F2100.25");
    }

    #[test]
    fn test_flags_only_when_set() {
        let cmd = ToolpathCommand::Home {
            x: true,
            y: false,
            z: true,
        };
        assert_eq!(cmd.to_gcode(), "G28 X Z");
        let none = ToolpathCommand::Home {
            x: false,
            y: false,
            z: false,
        };
        assert_eq!(none.to_gcode(), "G28");
    }

    #[test]
    fn test_codes_only_when_nonzero() {
        assert_eq!(
            ToolpathCommand::SetFanSpeed { s: 255, fan: 0 }.to_gcode(),
            "M106 S255"
        );
        assert_eq!(
            ToolpathCommand::SetFanSpeed { s: 128, fan: 2 }.to_gcode(),
            "M106 S128 P2"
        );
        assert_eq!(ToolpathCommand::FanOff { fan: 0 }.to_gcode(), "M107");
    }

    #[test]
    fn test_temperature_commands() {
        assert_eq!(
            ToolpathCommand::SetExtruderTempWait { s: 210 }.to_gcode(),
            "M109 S210"
        );
        assert_eq!(ToolpathCommand::SetBedTemp { s: 0 }.to_gcode(), "M140 S0");
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(ToolpathCommand::RelativeExtrusion.to_gcode(), "M83");
        assert_eq!(ToolpathCommand::SelectTool { tool: 1 }.to_gcode(), "T1");
        assert_eq!(ToolpathCommand::Dwell { p: Some(500) }.to_gcode(), "G4 P500");
        assert_eq!(ToolpathCommand::comment("layer 3").to_gcode(), "; layer 3");
    }

    #[test]
    fn test_set_position_not_rounded() {
        let cmd = ToolpathCommand::SetPosition {
            x: None,
            y: None,
            z: None,
            e: Some(0.123456),
        };
        assert_eq!(cmd.to_gcode(), "G92 E0.123456");
    }

    #[test]
    fn test_serde_tagged() {
        let cmd = ToolpathCommand::SetFanSpeed { s: 100, fan: 0 };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"set_fan_speed\""));
        let back: ToolpathCommand =
            serde_json::from_str(r#"{"command":"set_fan_speed","s":100}"#).unwrap();
        assert_eq!(back, cmd);
    }
}
