//! Role-to-colour mapping and render strokes.
//!
//! Viewers draw layers as coloured line strokes. Nothing here talks to a
//! graphics API; strokes are plain data.

use crate::geometry::{Point, Polygon, Role};
use serde::{Deserialize, Serialize};

/// RGBA colour, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Role {
    /// Display colour for polygons of this role.
    pub const fn color(self) -> Color {
        match self {
            Role::Contour => Color::rgb(0xff, 0xff, 0x00),
            Role::Hole => Color::rgb(0xff, 0x80, 0x00),
            Role::Shell => Color::rgb(0x00, 0xc0, 0xff),
            Role::SparseInfill => Color::rgb(0xc0, 0x00, 0x00),
            Role::DenseInfill => Color::rgb(0xff, 0x40, 0x40),
            Role::Support => Color::rgb(0x00, 0xc0, 0x00),
            Role::Adhesion => Color::rgb(0x80, 0x80, 0x80),
            Role::Open => Color::rgb(0xff, 0x00, 0xff),
        }
    }
}

/// One drawable line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub from: Point,
    pub to: Point,
    pub color: Color,
    pub role: Role,
}

/// One stroke per segment, in polygon order.
pub fn strokes_for(polygons: &[Polygon]) -> Vec<Stroke> {
    polygons
        .iter()
        .flat_map(|p| {
            let role = p.role();
            let color = role.color();
            p.segments().iter().map(move |s| Stroke {
                from: s.start,
                to: s.end,
                color,
                role,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_distinct() {
        let colors: std::collections::HashSet<Color> =
            Role::ALL.iter().map(|r| r.color()).collect();
        assert_eq!(colors.len(), Role::ALL.len());
    }

    #[test]
    fn test_hex() {
        assert_eq!(Role::Shell.color().to_hex(), "#00c0ff");
    }

    #[test]
    fn test_strokes_follow_segments() {
        let polys = vec![
            Polygon::line(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Role::SparseInfill),
            Polygon::open(
                &[Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)],
                Role::Open,
            ),
        ];
        let strokes = strokes_for(&polys);
        assert_eq!(strokes.len(), 3);
        assert_eq!(strokes[0].color, Role::SparseInfill.color());
        assert_eq!(strokes[2].to, Point::new(2.0, 0.0));
        assert_eq!(strokes[2].role, Role::Open);
    }
}
