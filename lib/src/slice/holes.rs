//! Hole classification for stitched contours.

use crate::geometry::{Polygon, Role};

/// Mark closed boundary polygons as holes or solids and fix their winding.
///
/// Polygons with role [`Role::Contour`] or [`Role::Hole`] are visited from the
/// largest to the smallest area. Whenever every vertex of a later polygon B
/// lies inside an earlier polygon A, B takes the opposite of A's current
/// flag. Because containers are always visited first, a polygon nested
/// inside k others ends up a hole exactly when k is odd.
///
/// Solids are wound counter-clockwise, holes clockwise. Other roles are left
/// alone. Returns the number of holes.
pub fn classify_holes(polygons: &mut [Polygon]) -> usize {
    let mut order: Vec<usize> = polygons
        .iter()
        .enumerate()
        .filter(|(_, p)| p.role().is_boundary() && p.is_closed())
        .map(|(i, _)| i)
        .collect();

    let areas: Vec<f64> = polygons.iter().map(Polygon::area).collect();
    order.sort_by(|&a, &b| areas[b].total_cmp(&areas[a]).then(a.cmp(&b)));

    let mut hole = vec![false; polygons.len()];
    for (pos, &a) in order.iter().enumerate() {
        for &b in &order[pos + 1..] {
            if polygons[a].contains_polygon(&polygons[b]) {
                hole[b] = !hole[a];
            }
        }
    }

    let mut holes = 0;
    for &i in &order {
        let polygon = &mut polygons[i];
        if hole[i] {
            polygon.set_role(Role::Hole);
            polygon.make_clockwise();
            holes += 1;
        } else {
            polygon.set_role(Role::Contour);
            polygon.make_counter_clockwise();
        }
    }
    holes
}
