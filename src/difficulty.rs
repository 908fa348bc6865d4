//! Difficulty profiles
//!
//! A difficulty level scales hazard velocity and width, the global rotation
//! speed, and the score payout. The builder consumes these through
//! [`crate::stage::BuilderOptions::apply_difficulty`].

use serde::{Deserialize, Serialize};

/// Named difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
    Insane,
}

impl DifficultyLevel {
    pub fn options(self) -> DifficultyOptions {
        match self {
            DifficultyLevel::Easy => DifficultyOptions {
                polygon_velocity: 450.0,
                polygon_width: 60.0,
                rotation_speed: 0.35,
                score_multiplier: 0.75,
            },
            DifficultyLevel::Medium => DifficultyOptions::default(),
            DifficultyLevel::Hard => DifficultyOptions {
                polygon_velocity: 750.0,
                polygon_width: 45.0,
                rotation_speed: 0.7,
                score_multiplier: 1.5,
            },
            DifficultyLevel::Insane => DifficultyOptions {
                polygon_velocity: 900.0,
                polygon_width: 40.0,
                rotation_speed: 1.0,
                score_multiplier: 2.5,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "Easy",
            DifficultyLevel::Medium => "Medium",
            DifficultyLevel::Hard => "Hard",
            DifficultyLevel::Insane => "Insane",
        }
    }
}

/// Concrete scaling values for a difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyOptions {
    /// Radial collapse speed of hazards (units per second)
    pub polygon_velocity: f32,
    /// Radial thickness of hazards
    pub polygon_width: f32,
    /// Base rotation speed of the whole playfield (radians per second)
    pub rotation_speed: f32,
    /// Scales every score award
    pub score_multiplier: f32,
}

impl Default for DifficultyOptions {
    fn default() -> Self {
        Self {
            polygon_velocity: 600.0,
            polygon_width: 50.0,
            rotation_speed: 0.5,
            score_multiplier: 1.0,
        }
    }
}
