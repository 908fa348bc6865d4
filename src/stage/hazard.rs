//! Hazard polygons in polar space
//!
//! A hazard is an immutable ring of wall segments generated for one onset.
//! Its wall pattern never changes after the build; only the runtime state
//! (radius, azimuth, destroy flag) owned by the stage geometry moves.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::polar_to_cartesian;

/// A vector in polar coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarVector {
    pub radius: f32,
    pub azimuth: f32,
}

impl PolarVector {
    pub fn new(radius: f32, azimuth: f32) -> Self {
        Self { radius, azimuth }
    }

    pub fn to_cartesian(self) -> Vec2 {
        polar_to_cartesian(self.radius, self.azimuth)
    }
}

/// An immutable hazard ring generated for a single onset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// One flag per side, `true` = wall present, `false` = opening
    pub walls: Vec<bool>,
    /// When the hazard reaches the impact radius (seconds from stage start)
    pub arrival_time: f32,
    /// Radial collapse speed plus any extra angular rate
    pub velocity: PolarVector,
    /// Radial thickness of the ring
    pub width: f32,
    /// Radius at which the hazard collapses and is consumed
    pub minimum_radius: f32,
    /// Orientation index the wall pattern was built from
    pub start: i64,
    /// Skip value the wall pattern was built from
    pub skip: u32,
}

impl Hazard {
    pub fn side_count(&self) -> usize {
        self.walls.len()
    }

    /// Angular extent of one side
    pub fn side_angle(&self) -> f32 {
        TAU / self.side_count() as f32
    }

    /// The radius at which the hazard is consumed
    pub fn impact_distance(&self) -> f32 {
        self.minimum_radius
    }

    /// Spawn radius chosen so the ring reaches the impact radius exactly at
    /// `arrival_time` when collapsing at `velocity.radius`.
    pub fn spawn_radius(&self) -> f32 {
        self.minimum_radius + self.velocity.radius * self.arrival_time
    }

    pub fn open_side_count(&self) -> usize {
        self.walls.iter().filter(|&&wall| !wall).count()
    }

    /// Mid-angle of the first opening, relative to the hazard's own azimuth.
    /// Every generated hazard has at least one opening.
    pub fn opening_angle(&self) -> f32 {
        let side = self
            .walls
            .iter()
            .position(|&wall| !wall)
            .unwrap_or_default();
        (side as f32 + 0.5) * self.side_angle()
    }

    /// Cartesian quads for every wall side at the given runtime position, for
    /// the overlap test and for rendering.
    pub fn wall_quads(&self, position: PolarVector) -> Vec<[Vec2; 4]> {
        let step = self.side_angle();
        let inner = position.radius;
        let outer = position.radius + self.width;
        self.walls
            .iter()
            .enumerate()
            .filter(|&(_, &wall)| wall)
            .map(|(i, _)| {
                let a0 = position.azimuth + i as f32 * step;
                let a1 = a0 + step;
                [
                    polar_to_cartesian(inner, a0),
                    polar_to_cartesian(outer, a0),
                    polar_to_cartesian(outer, a1),
                    polar_to_cartesian(inner, a1),
                ]
            })
            .collect()
    }
}

/// Runtime state for one hazard, owned by the stage geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardState {
    pub position: PolarVector,
    /// Set once the ring crosses its impact radius; never cleared
    pub destroy: bool,
}

impl HazardState {
    pub fn new(hazard: &Hazard) -> Self {
        Self {
            position: PolarVector::new(hazard.spawn_radius(), 0.0),
            destroy: false,
        }
    }

    /// Integrate the radial collapse for one step
    pub fn advance(&mut self, hazard: &Hazard, dt: f32) {
        if self.destroy {
            return;
        }
        self.position.radius -= hazard.velocity.radius * dt;
        if self.position.radius <= hazard.impact_distance() {
            self.destroy = true;
        }
    }

    /// Seconds until the ring reaches its impact radius
    pub fn time_to_impact(&self, hazard: &Hazard) -> f32 {
        (self.position.radius - hazard.impact_distance()) / hazard.velocity.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hazard(walls: Vec<bool>) -> Hazard {
        Hazard {
            walls,
            arrival_time: 1.0,
            velocity: PolarVector::new(600.0, 0.0),
            width: 50.0,
            minimum_radius: 125.0,
            start: 0,
            skip: 1,
        }
    }

    #[test]
    fn test_spawn_radius_meets_arrival_time() {
        let h = hazard(vec![true; 6]);
        let mut state = HazardState::new(&h);
        assert!((state.position.radius - 725.0).abs() < 1e-3);

        // Collapse for exactly the arrival time at 120 Hz.
        let dt = 1.0 / 120.0;
        for _ in 0..120 {
            state.advance(&h, dt);
        }
        assert!(state.destroy);
    }

    #[test]
    fn test_advance_stops_after_destroy() {
        let h = hazard(vec![true; 6]);
        let mut state = HazardState::new(&h);
        state.position.radius = h.impact_distance() + 1.0;
        state.advance(&h, 1.0);
        assert!(state.destroy);
        let settled = state.position.radius;
        state.advance(&h, 1.0);
        assert_eq!(state.position.radius, settled);
    }

    #[test]
    fn test_wall_quads_only_for_walls() {
        let mut walls = vec![true; 6];
        walls[2] = false;
        let h = hazard(walls);
        let quads = h.wall_quads(PolarVector::new(200.0, 0.0));
        assert_eq!(quads.len(), 5);
    }

    #[test]
    fn test_opening_angle_centers_first_opening() {
        let mut walls = vec![true; 6];
        walls[3] = false;
        let h = hazard(walls);
        let expected = 3.5 * TAU / 6.0;
        assert!((h.opening_angle() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_time_to_impact() {
        let h = hazard(vec![true; 6]);
        let state = HazardState {
            position: PolarVector::new(425.0, 0.0),
            destroy: false,
        };
        assert!((state.time_to_impact(&h) - 0.5).abs() < 1e-5);
    }
}
