//! Finished toolpath program.

use super::ToolpathCommand;
use crate::{CoordF, Result, VERSION};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Totals gathered while writing a program.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ToolpathStats {
    /// Commands in the print block.
    pub commands: usize,
    /// Layers that produced moves.
    pub layers: usize,
    /// Filament fed by print moves (mm), retracts excluded.
    pub total_extrusion: CoordF,
    /// XY distance of extruding moves (mm).
    pub print_distance: CoordF,
    /// XY distance of rapid moves (mm).
    pub travel_distance: CoordF,
}

impl fmt::Display for ToolpathStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} layers, {} commands, {:.2}mm filament, {:.1}mm printed, {:.1}mm travel",
            self.layers,
            self.commands,
            self.total_extrusion,
            self.print_distance,
            self.travel_distance
        )
    }
}

/// A complete program: header, startup, print and teardown blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Toolpath {
    pub startup: Vec<ToolpathCommand>,
    pub body: Vec<ToolpathCommand>,
    pub teardown: Vec<ToolpathCommand>,
    pub stats: ToolpathStats,
}

impl Toolpath {
    pub fn header() -> String {
        format!("; generated by stack-slicer {}", VERSION)
    }

    /// All commands in output order, header excluded.
    pub fn commands(&self) -> impl Iterator<Item = &ToolpathCommand> {
        self.startup
            .iter()
            .chain(self.body.iter())
            .chain(self.teardown.iter())
    }

    pub fn len(&self) -> usize {
        self.startup.len() + self.body.len() + self.teardown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the program text, one command per line.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", Self::header())?;
        for cmd in self.commands() {
            writeln!(out, "{}", cmd)?;
        }
        Ok(())
    }

    /// Write the program to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush()?;
        log::info!(
            "Wrote {} commands to {}",
            self.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Program text as one string.
    pub fn to_gcode(&self) -> String {
        let mut text = Self::header();
        text.push('\n');
        for cmd in self.commands() {
            text.push_str(&cmd.to_gcode());
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Toolpath {
        Toolpath {
            startup: vec![ToolpathCommand::RelativeExtrusion],
            body: vec![ToolpathCommand::rapid_z(0.2, Some(3000.0))],
            teardown: vec![ToolpathCommand::DisableMotors],
            stats: ToolpathStats::default(),
        }
    }

    #[test]
    fn test_block_order() {
        let text = sample().to_gcode();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("; generated by stack-slicer "));
        assert_eq!(&lines[1..], &["M83", "G0 Z0.2 F3000", "M84"]);
    }

    #[test]
    fn test_write_to_matches_to_gcode() {
        let toolpath = sample();
        let mut buf = Vec::new();
        toolpath.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), toolpath.to_gcode());
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = std::env::temp_dir().join("stack-slicer-no-such-dir").join("x");
        let err = sample().write_to_file(dir.join("out.gcode")).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
