//! Headless demo: builds a stage from a synthetic beat grid and lets the
//! autopilot play it through, logging a HUD line once a second and printing
//! the final snapshot as JSON.
//!
//! An optional JSON config path may be passed as the first argument.

use std::env;
use std::error::Error;
use std::fs;
use std::time::Duration;

use serde::Deserialize;

use beatfall::audio::{SilentTransport, StageAudio};
use beatfall::consts::{SEED_HASH_BYTES, SIM_DT};
use beatfall::loader::StageLoader;
use beatfall::{
    AudioFeatures, BuilderOptions, DifficultyLevel, Segment, Stage, StageOptions,
};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    difficulty: DifficultyLevel,
    track_seconds: f32,
    beat_interval: f32,
    max_volume: f32,
    /// Let the autopilot steer
    attract: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyLevel::Medium,
            track_seconds: 20.0,
            beat_interval: 0.25,
            max_volume: 1.0,
            attract: true,
        }
    }
}

/// A regular beat grid with a double-hit every eighth beat, split into three
/// colour segments. Stands in for the external onset detector.
fn synthetic_features(config: &DemoConfig) -> AudioFeatures {
    let mut onsets = Vec::new();
    let mut time = 0.5_f32;
    let mut beat = 0u32;
    while time < config.track_seconds {
        onsets.push(time);
        if beat % 8 == 4 {
            onsets.push(time + 0.1);
        }
        time += config.beat_interval;
        beat += 1;
    }

    let third = config.track_seconds / 3.0;
    let segments = vec![
        Segment::new(1, 0.0, third),
        Segment::new(2, third, 2.0 * third),
        Segment::new(3, 2.0 * third, 0.0),
    ];
    AudioFeatures::new(onsets, segments)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config: DemoConfig = match env::args().nth(1) {
        Some(path) => serde_json::from_str(&fs::read_to_string(&path)?)?,
        None => DemoConfig::default(),
    };
    log::info!("demo config: {config:?}");

    let difficulty = config.difficulty.options();
    let mut builder_options = BuilderOptions::default();
    builder_options.apply_difficulty(&difficulty);

    // A deterministic stand-in for decoded track samples.
    let sample_bytes: Vec<u8> = (0..SEED_HASH_BYTES)
        .map(|i| (i.wrapping_mul(31) % 251) as u8)
        .collect();

    let features = synthetic_features(&config);
    let mut loader = StageLoader::spawn(sample_bytes, move |_| features, builder_options);
    let loaded = loop {
        for message in loader.progress_messages() {
            log::info!("{message}");
        }
        if let Some(outcome) = loader.poll() {
            break outcome?;
        }
        std::thread::sleep(Duration::from_millis(5));
    };
    log::info!(
        "stage ready: seed {}, {} hazards",
        loaded.seed,
        loaded.built.hazards.len()
    );

    let mut audio = StageAudio::new(Box::new(SilentTransport::new(config.track_seconds)));
    audio.set_max_volume(config.max_volume);

    let mut stage = Stage::new(
        loaded.built,
        loaded.rng,
        audio,
        loaded.features.onsets,
        StageOptions::default(),
        difficulty,
    );
    stage.set_ai(config.attract);

    let max_frames = ((f64::from(config.track_seconds) + 30.0) / f64::from(SIM_DT)) as u64;
    let mut frame = 0u64;
    while !stage.is_ended() && frame < max_frames {
        stage.update(SIM_DT);
        frame += 1;
        if frame % 120 == 0 {
            let snap = stage.snapshot();
            log::info!(
                "t={:6.2}s {:?} hazard {}/{} x{} score {} overlap {:5.1}%",
                snap.total_time,
                snap.phase,
                snap.current_hazard,
                snap.hazard_count,
                snap.multiplier,
                snap.score,
                snap.overlap,
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&stage.snapshot())?);
    Ok(())
}
