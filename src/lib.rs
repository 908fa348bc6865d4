//! Beatfall - a rhythm-action stage engine
//!
//! Audio onsets and segment boundaries are turned into a deterministic course
//! of collapsing polygon hazards; the player must sit in the opening of each
//! hazard as it sweeps past, scored by exact polygon overlap.
//!
//! Core modules:
//! - `stage`: deterministic generation, simulation, collision, lifecycle
//! - `features`: onset/segment input model (supplied by an external detector)
//! - `audio`: playback transport trait + polled fade controller
//! - `loader`: one-shot background build with polled progress
//! - `difficulty`: velocity/width/rotation/score scaling profiles

pub mod audio;
pub mod color;
pub mod difficulty;
pub mod features;
pub mod loader;
pub mod scene;
pub mod seed;
pub mod stage;

pub use color::{Color, Hsl};
pub use difficulty::{DifficultyLevel, DifficultyOptions};
pub use features::{AudioFeatures, OnsetCollection, Segment};
pub use stage::{BuilderOptions, Stage, StageGeometry, StageGeometryBuilder, StageOptions};

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz, matches the host frame pump)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Radius of the decorative centre polygon
    pub const CENTER_POLYGON_RADIUS: f32 = 80.0;
    /// Radius of the backdrop polygon (far outside the playfield)
    pub const BACKGROUND_POLYGON_RADIUS: f32 = 5000.0;

    /// Player orbit radius
    pub const PLAYER_RADIUS: f32 = 180.0;
    /// Radial length of the player hitbox
    pub const PLAYER_LENGTH: f32 = 20.0;
    /// Angular width of the player hitbox (radians)
    pub const PLAYER_ARC_WIDTH: f32 = 0.14;
    /// Player angular speed (radians per second)
    pub const PLAYER_ANGULAR_SPEED: f32 = 6.0;
    /// Angular speed multiplier while the slow flag is held
    pub const PLAYER_SLOW_FACTOR: f32 = 0.4;

    /// Number of sample bytes hashed for the stage seed
    pub const SEED_HASH_BYTES: usize = 10_000;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}
