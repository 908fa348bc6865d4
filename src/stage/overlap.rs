//! Exact polygon overlap via boolean clipping
//!
//! Collision is decided by the true clipped intersection area of the player
//! quad against the wall quads of the current hazard, not by a distance or
//! bounding-box approximation. Inputs are `f32` world geometry; clipping runs
//! in `f64` to keep thin-sliver intersections stable.

use geo::{Area, BooleanOps, LineString, MultiPolygon, Polygon};
use glam::Vec2;

fn quad_polygon(quad: &[Vec2; 4]) -> Polygon<f64> {
    let exterior: Vec<(f64, f64)> = quad
        .iter()
        .map(|v| (f64::from(v.x), f64::from(v.y)))
        .collect();
    Polygon::new(LineString::from(exterior), vec![])
}

/// Percentage (0..100) of the player quad covered by the wall quads.
///
/// Returns 0 for a degenerate player quad.
pub fn overlap_percentage(wall_quads: &[[Vec2; 4]], player_quad: &[Vec2; 4]) -> f64 {
    if wall_quads.is_empty() {
        return 0.0;
    }
    let player = MultiPolygon::new(vec![quad_polygon(player_quad)]);
    let player_area = player.unsigned_area();
    if player_area <= f64::EPSILON {
        return 0.0;
    }
    let walls = MultiPolygon::new(wall_quads.iter().map(quad_polygon).collect());
    let clipped = walls.intersection(&player);
    clipped.unsigned_area() / player_area * 100.0
}
