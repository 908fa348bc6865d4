//! Host scene identifiers and cross-scene messages
//!
//! The engine does not own a scene stack; the host loop does. These types
//! are the vocabulary the host and its scenes share.

use serde::{Deserialize, Serialize};

use crate::difficulty::DifficultyLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneKind {
    Menu,
    Loading,
    Game,
    Options,
}

impl SceneKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SceneKind::Menu => "Menu",
            SceneKind::Loading => "Loading",
            SceneKind::Game => "Game",
            SceneKind::Options => "Options",
        }
    }
}

/// What a scene hands back to the host loop after an update
#[derive(Debug, Clone, PartialEq)]
pub enum SceneMessage {
    Transition(SceneKind),
    SettingsChanged(SettingsChange),
    Quit,
}

/// A single setting changed in the options scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingsChange {
    Difficulty(DifficultyLevel),
    MaxVolume(f32),
    AttractMode(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_change_round_trips_through_json() {
        let change = SettingsChange::Difficulty(DifficultyLevel::Hard);
        let json = serde_json::to_string(&change).unwrap();
        let back: SettingsChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
    }
}
