//! Stage lifecycle
//!
//! Wraps the geometry, audio and camera feedback in the phase machine that
//! takes a stage from warmup countdown through ease-in to running and ended.
//! Time spent in warmup never reaches the simulation clock; the frame that
//! crosses the warmup boundary forwards only its remainder, so `total_time`
//! measures exactly the time since hazards started moving.

use serde::{Deserialize, Serialize};

use crate::audio::StageAudio;
use crate::difficulty::DifficultyOptions;
use crate::features::OnsetCollection;
use crate::stage::builder::BuiltStage;
use crate::stage::geometry::{StageColours, StageContext, StageGeometry};
use rand_pcg::Pcg32;

/// Camera zoom target while counting down
const WARMUP_SCALE: f32 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StagePhase {
    /// Countdown before the simulation clock starts
    Warmup,
    /// Hazards move but playback has not started yet
    EaseIn,
    Running,
    Ended,
}

/// Lifecycle tuning, serialisable for host config files
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageOptions {
    /// Countdown before the simulation clock starts (seconds)
    pub warmup_time: f64,
    /// Simulation time before playback starts at full volume (seconds)
    pub ease_in_time: f64,
    /// Consumption-frame RNG draws above this reverse the rotation;
    /// 0.95 gives a 5% chance per consumption event
    pub reversal_threshold: f64,
    /// How far ahead of the opening the autopilot aims (radians)
    pub ai_lead_angle: f32,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            warmup_time: 2.0,
            ease_in_time: 2.0,
            reversal_threshold: 0.95,
            ai_lead_angle: 30.0_f32.to_radians(),
        }
    }
}

/// Zoom targets for the host camera; the renderer interpolates toward them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFeedback {
    pub target_scale: f32,
    /// How fast to chase the target, driven by the local beat frequency
    pub scale_change_multiplier: f32,
}

impl Default for CameraFeedback {
    fn default() -> Self {
        Self {
            target_scale: 1.0,
            scale_change_multiplier: 1.0,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub phase: StagePhase,
    pub total_time: f64,
    pub current_hazard: usize,
    pub hazard_count: usize,
    pub multiplier: i32,
    pub overlap: f64,
    pub score: u64,
    pub hits: u32,
    pub direction: i32,
    pub center_text: String,
    pub camera: CameraFeedback,
    pub colours: StageColours,
}

/// A playable stage: geometry plus audio under the phase machine
pub struct Stage {
    geometry: StageGeometry,
    audio: StageAudio,
    onsets: OnsetCollection,
    options: StageOptions,
    difficulty: DifficultyOptions,

    phase: StagePhase,
    elapsed_warmup: f64,
    total_time: f64,
    end_time: Option<f64>,
    finished_ease_in: bool,

    multiplier: i32,
    overlap: f64,
    ai: bool,
    center_text: String,
    camera: CameraFeedback,
}

impl Stage {
    pub fn new(
        built: BuiltStage,
        rng: Pcg32,
        mut audio: StageAudio,
        onsets: OnsetCollection,
        options: StageOptions,
        difficulty: DifficultyOptions,
    ) -> Self {
        let geometry = StageGeometry::new(
            built,
            rng,
            difficulty.rotation_speed,
            options.reversal_threshold,
            options.ai_lead_angle,
        );
        audio.set_volume(0.0);

        Self {
            geometry,
            audio,
            onsets,
            options,
            difficulty,
            phase: StagePhase::Warmup,
            elapsed_warmup: 0.0,
            total_time: 0.0,
            end_time: None,
            finished_ease_in: false,
            multiplier: 0,
            overlap: 0.0,
            ai: false,
            center_text: String::new(),
            camera: CameraFeedback::default(),
        }
    }

    /// Advance the stage by one frame
    pub fn update(&mut self, dt: f32) {
        self.audio.update(dt);
        let mut sim_dt = f64::from(dt);

        if self.phase == StagePhase::Warmup {
            self.camera.target_scale = WARMUP_SCALE;
            self.elapsed_warmup += sim_dt;
            let remaining = self.options.warmup_time + self.options.ease_in_time
                - self.elapsed_warmup;
            self.center_text = format!("{}", remaining.ceil().max(0.0) as i64);
            if self.elapsed_warmup > self.options.warmup_time {
                // Forward only the remainder of the boundary frame.
                sim_dt = self.elapsed_warmup - self.options.warmup_time;
                self.phase = StagePhase::EaseIn;
                log::info!("warmup complete, easing in");
            }
        }

        let running = matches!(self.phase, StagePhase::EaseIn | StagePhase::Running);
        // The clock keeps counting after Ended so the results screen shows a
        // settled state; only warmup time never reaches it.
        if self.phase != StagePhase::Warmup {
            self.total_time += sim_dt;
        }
        if running {
            if self.finished_ease_in {
                let shown = self.multiplier.max(0);
                self.center_text = format!("{shown}x");

                if self.geometry.current_index() == self.geometry.hazard_count()
                    && self.audio.is_stopped()
                {
                    self.phase = StagePhase::Ended;
                    self.end_time = Some(self.total_time);
                    log::info!(
                        "stage ended after {:.2}s: score {}, {} hits",
                        self.total_time,
                        self.geometry.player.score,
                        self.geometry.player.hits
                    );
                }
            } else {
                let remaining = self.options.ease_in_time - self.total_time;
                self.center_text = format!("{}", remaining.ceil().max(0.0) as i64);
                if self.total_time > self.options.ease_in_time {
                    self.finished_ease_in = true;
                    self.phase = StagePhase::Running;
                    self.audio.set_volume(self.audio.max_volume());
                    self.audio.play();
                    log::info!("ease-in complete, playback started");
                }
            }

            if self.geometry.current_index() < self.geometry.hazard_count() {
                let index = self.geometry.current_index();
                let frequency = self.onsets.normalized_beat_frequency(index);
                self.camera.target_scale = 0.9 * (0.80 + frequency.min(1.0) * 0.5);
                if self.geometry.player.is_slow {
                    self.camera.target_scale *= 0.1;
                }
                self.camera.scale_change_multiplier =
                    self.onsets.beat_frequencies[index].min(2.0) * 2.0;
            }
        }

        let mut ctx = StageContext {
            running,
            ai: self.ai,
            total_time: self.total_time,
            score_multiplier: self.difficulty.score_multiplier,
            multiplier: &mut self.multiplier,
            overlap: &mut self.overlap,
        };
        self.geometry.update(sim_dt as f32, &mut ctx);
    }

    /// Rewind to warmup without rebuilding the geometry
    pub fn reset(&mut self, keep_score: bool) {
        self.audio.cancel_fades();
        self.audio.stop();
        self.audio.set_volume(0.0);
        self.geometry.reset(keep_score);
        self.phase = StagePhase::Warmup;
        self.elapsed_warmup = 0.0;
        self.total_time = 0.0;
        self.end_time = None;
        self.finished_ease_in = false;
        self.multiplier = 0;
        self.overlap = 0.0;
        self.center_text.clear();
        self.camera = CameraFeedback::default();
        log::info!("stage reset");
    }

    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            phase: self.phase,
            total_time: self.total_time,
            current_hazard: self.geometry.current_index(),
            hazard_count: self.geometry.hazard_count(),
            multiplier: self.multiplier,
            overlap: self.overlap,
            score: self.geometry.player.score,
            hits: self.geometry.player.hits,
            direction: self.geometry.direction(),
            center_text: self.center_text.clone(),
            camera: self.camera,
            colours: *self.geometry.colours(),
        }
    }

    pub fn phase(&self) -> StagePhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == StagePhase::Ended
    }

    /// Seconds since hazards started moving
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Simulation time at which the stage ended
    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    pub fn multiplier(&self) -> i32 {
        self.multiplier
    }

    /// Player overlap with the current hazard last frame (0..100)
    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    pub fn score(&self) -> u64 {
        self.geometry.player.score
    }

    pub fn hits(&self) -> u32 {
        self.geometry.player.hits
    }

    pub fn center_text(&self) -> &str {
        &self.center_text
    }

    pub fn camera(&self) -> CameraFeedback {
        self.camera
    }

    /// Hand control to the autopilot (attract mode)
    pub fn set_ai(&mut self, ai: bool) {
        self.ai = ai;
    }

    pub fn ai(&self) -> bool {
        self.ai
    }

    /// Steer the player toward an absolute azimuth
    pub fn steer_player(&mut self, azimuth: f32) {
        self.geometry.player.seek(azimuth);
    }

    pub fn set_player_slow(&mut self, slow: bool) {
        self.geometry.player.is_slow = slow;
    }

    pub fn geometry(&self) -> &StageGeometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut StageGeometry {
        &mut self.geometry
    }

    pub fn audio_mut(&mut self) -> &mut StageAudio {
        &mut self.audio
    }
}
