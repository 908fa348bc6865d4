//! Onset and segment input model
//!
//! The onset detector is an external collaborator; it hands the engine a set
//! of onset timestamps (seconds from track start) and a set of segment
//! records covering the track. Everything here is plain data - the builder
//! validates it and the stage consumes it.

use serde::{Deserialize, Serialize};

/// A time range of the track assigned a stable colour-group identifier.
///
/// `end_time == 0` marks the open-ended last segment ("runs to the end of
/// the track").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Colour-group identifier, 1-based
    pub id: u32,
    pub start_time: f32,
    pub end_time: f32,
}

impl Segment {
    pub fn new(id: u32, start_time: f32, end_time: f32) -> Self {
        Self {
            id,
            start_time,
            end_time,
        }
    }

    /// True for the sentinel open-ended last segment
    pub fn is_open_ended(&self) -> bool {
        self.end_time == 0.0
    }
}

/// Onset timestamps plus the per-onset beat frequency used for camera feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetCollection {
    /// Onset times in seconds, sorted ascending
    pub times: Vec<f32>,
    /// Local beat frequency at each onset (Hz)
    pub beat_frequencies: Vec<f32>,
    pub min_beat_frequency: f32,
    pub max_beat_frequency: f32,
}

impl OnsetCollection {
    /// Build from raw (possibly unsorted) onset timestamps, deriving the
    /// beat-frequency track from onset spacing.
    pub fn from_times(mut times: Vec<f32>) -> Self {
        times.sort_by(f32::total_cmp);

        let mut beat_frequencies = Vec::with_capacity(times.len());
        for i in 0..times.len() {
            // Frequency of the gap leading into the next onset; the last
            // onset repeats the previous frequency.
            let gap = if i + 1 < times.len() {
                times[i + 1] - times[i]
            } else if i > 0 {
                times[i] - times[i - 1]
            } else {
                1.0
            };
            beat_frequencies.push(1.0 / gap.max(1e-3));
        }

        let min_beat_frequency = beat_frequencies.iter().copied().fold(f32::INFINITY, f32::min);
        let max_beat_frequency = beat_frequencies
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        Self {
            times,
            beat_frequencies,
            min_beat_frequency,
            max_beat_frequency,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Beat frequency at onset `index`, normalised against the observed
    /// min/max range of the track. Returns 0 for a flat track.
    pub fn normalized_beat_frequency(&self, index: usize) -> f32 {
        let range = self.max_beat_frequency - self.min_beat_frequency;
        if range <= f32::EPSILON {
            return 0.0;
        }
        (self.beat_frequencies[index] - self.min_beat_frequency) / range
    }
}

/// The full output of the external feature extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub onsets: OnsetCollection,
    pub segments: Vec<Segment>,
}

impl AudioFeatures {
    pub fn new(onset_times: Vec<f32>, segments: Vec<Segment>) -> Self {
        Self {
            onsets: OnsetCollection::from_times(onset_times),
            segments,
        }
    }
}
