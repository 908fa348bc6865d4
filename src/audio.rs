//! Audio playback transport
//!
//! The engine never touches an audio device. It drives playback through the
//! [`AudioTransport`] trait and only ever polls simple scalar state
//! (`is_stopped`, current volume). Volume fades are stepped by the frame
//! update rather than a background thread; a new fade request cancels the
//! active one, and cancellation is a normal control path, never an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback transport state, polled by the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// What a fade does once it reaches its target volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadeEndAction {
    #[default]
    Nothing,
    Pause,
    Stop,
}

#[derive(Debug, Error)]
pub enum AudioError {
    /// Rejected rather than silently clamped, to surface misconfiguration
    #[error("fade-in target volume {requested} exceeds the maximum volume {max}")]
    FadeTargetAboveMax { requested: f32, max: f32 },
}

/// Host-supplied playback backend
pub trait AudioTransport {
    /// Called once per frame before fades are stepped; backends with their
    /// own clock ignore it
    fn tick(&mut self, _dt: f32) {}
    fn play(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Stop playback and rewind to the start of the track
    fn stop(&mut self);
    /// Seek to a fraction of the track length, 0..1
    fn seek(&mut self, percent: f32);
    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);
    fn state(&self) -> PlaybackState;
}

struct Fade {
    target: f32,
    step: f32,
    /// Seconds between volume steps
    interval: f32,
    accumulated: f32,
    rising: bool,
    end_action: FadeEndAction,
}

/// A transport wrapped with a max-volume clamp and frame-stepped fades
pub struct StageAudio {
    transport: Box<dyn AudioTransport>,
    max_volume: f32,
    fade: Option<Fade>,
}

impl StageAudio {
    pub fn new(transport: Box<dyn AudioTransport>) -> Self {
        Self {
            transport,
            max_volume: 1.0,
            fade: None,
        }
    }

    /// Maximum volume, clamped to [0, 1]
    pub fn set_max_volume(&mut self, max: f32) {
        self.max_volume = max.clamp(0.0, 1.0);
    }

    pub fn max_volume(&self) -> f32 {
        self.max_volume
    }

    pub fn volume(&self) -> f32 {
        self.transport.volume()
    }

    /// Volume is clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) {
        self.transport.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn is_stopped(&self) -> bool {
        self.transport.state() == PlaybackState::Stopped
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    pub fn resume(&mut self) {
        self.transport.resume();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn seek(&mut self, percent: f32) {
        self.transport.seek(percent.clamp(0.0, 1.0));
    }

    /// Fade the volume up to `target` over `duration_secs`, stepping by
    /// `step` each interval. Fails if the target exceeds the max volume.
    pub fn fade_in(
        &mut self,
        duration_secs: f32,
        target: f32,
        step: f32,
        end_action: FadeEndAction,
    ) -> Result<(), AudioError> {
        if target > self.max_volume {
            return Err(AudioError::FadeTargetAboveMax {
                requested: target,
                max: self.max_volume,
            });
        }
        self.begin_fade(duration_secs, target, step, true, end_action);
        Ok(())
    }

    /// Fade the volume down to `target` over `duration_secs`
    pub fn fade_out(&mut self, duration_secs: f32, target: f32, step: f32, end_action: FadeEndAction) {
        self.begin_fade(duration_secs, target, step, false, end_action);
    }

    fn begin_fade(
        &mut self,
        duration_secs: f32,
        target: f32,
        step: f32,
        rising: bool,
        end_action: FadeEndAction,
    ) {
        // A new fade request implicitly cancels the active one.
        let distance = (target - self.volume()).abs();
        let steps = (distance / step.max(1e-6)).max(1.0);
        self.fade = Some(Fade {
            target,
            step,
            interval: duration_secs / steps,
            accumulated: 0.0,
            rising,
            end_action,
        });
    }

    /// Cancel any in-flight fade without running its end action
    pub fn cancel_fades(&mut self) {
        self.fade = None;
    }

    /// Step the transport clock and the active fade forward by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        self.transport.tick(dt);
        let Some(fade) = self.fade.as_mut() else {
            return;
        };

        fade.accumulated += dt;
        let mut volume = self.transport.volume();
        while fade.accumulated >= fade.interval {
            fade.accumulated -= fade.interval;
            volume = if fade.rising {
                (volume + fade.step).min(fade.target)
            } else {
                (volume - fade.step).max(fade.target)
            };
            if volume == fade.target {
                break;
            }
        }
        self.transport.set_volume(volume.clamp(0.0, 1.0));

        if volume == fade.target {
            let end_action = fade.end_action;
            self.fade = None;
            match end_action {
                FadeEndAction::Nothing => {}
                FadeEndAction::Pause => self.pause(),
                FadeEndAction::Stop => self.stop(),
            }
            log::debug!("audio fade complete at volume {volume:.2}");
        }
    }
}

/// A transport with no device behind it, for tests and headless runs.
///
/// Tracks play position against a fixed track length and flips to `Stopped`
/// when the track runs out; [`SilentTransport::advance`] stands in for the
/// device clock.
pub struct SilentTransport {
    length_secs: f32,
    position_secs: f32,
    volume: f32,
    state: PlaybackState,
}

impl SilentTransport {
    pub fn new(length_secs: f32) -> Self {
        Self {
            length_secs,
            position_secs: 0.0,
            volume: 0.0,
            state: PlaybackState::Stopped,
        }
    }

    /// Advance the playback clock; stops at the end of the track
    pub fn advance(&mut self, dt: f32) {
        if self.state == PlaybackState::Playing {
            self.position_secs += dt;
            if self.position_secs >= self.length_secs {
                self.position_secs = self.length_secs;
                self.state = PlaybackState::Stopped;
            }
        }
    }
}

impl AudioTransport for SilentTransport {
    fn tick(&mut self, dt: f32) {
        self.advance(dt);
    }

    fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.position_secs = 0.0;
    }

    fn seek(&mut self, percent: f32) {
        self.position_secs = self.length_secs * percent;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn state(&self) -> PlaybackState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_audio() -> StageAudio {
        StageAudio::new(Box::new(SilentTransport::new(60.0)))
    }

    #[test]
    fn test_fade_in_above_max_is_rejected() {
        let mut audio = stage_audio();
        audio.set_max_volume(0.5);
        let err = audio.fade_in(1.0, 0.8, 0.01, FadeEndAction::Nothing);
        assert!(matches!(
            err,
            Err(AudioError::FadeTargetAboveMax { .. })
        ));
    }

    #[test]
    fn test_fade_in_reaches_target() {
        let mut audio = stage_audio();
        audio
            .fade_in(1.0, 0.8, 0.1, FadeEndAction::Nothing)
            .unwrap();
        for _ in 0..200 {
            audio.update(0.01);
        }
        assert!((audio.volume() - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_fade_out_end_action_stops() {
        let mut audio = stage_audio();
        audio.set_volume(1.0);
        audio.play();
        assert!(!audio.is_stopped());
        audio.fade_out(0.5, 0.0, 0.1, FadeEndAction::Stop);
        for _ in 0..200 {
            audio.update(0.01);
        }
        assert_eq!(audio.volume(), 0.0);
        assert!(audio.is_stopped());
    }

    #[test]
    fn test_cancel_leaves_volume_where_it_was() {
        let mut audio = stage_audio();
        audio
            .fade_in(10.0, 1.0, 0.01, FadeEndAction::Nothing)
            .unwrap();
        audio.update(0.5);
        let mid = audio.volume();
        assert!(mid > 0.0 && mid < 1.0);
        audio.cancel_fades();
        audio.update(5.0);
        assert_eq!(audio.volume(), mid);
    }

    #[test]
    fn test_new_fade_replaces_active_fade() {
        let mut audio = stage_audio();
        audio
            .fade_in(10.0, 1.0, 0.01, FadeEndAction::Nothing)
            .unwrap();
        audio.update(0.5);
        audio.fade_out(0.1, 0.0, 0.5, FadeEndAction::Nothing);
        for _ in 0..50 {
            audio.update(0.01);
        }
        assert_eq!(audio.volume(), 0.0);
    }

    #[test]
    fn test_volume_clamped() {
        let mut audio = stage_audio();
        audio.set_volume(2.0);
        assert_eq!(audio.volume(), 1.0);
        audio.set_volume(-1.0);
        assert_eq!(audio.volume(), 0.0);
    }
}
