//! Deterministic stage generation
//!
//! Turns the extracted onset/segment features into the full hazard sequence
//! and colour palette. Generation consumes RNG draws in a fixed order, so the
//! same features, options and RNG state always reproduce the same stage.

use rand::Rng;
use rand_pcg::Pcg32;
use thiserror::Error;

use crate::color::{normalize_degrees, Color, Hsl};
use crate::difficulty::DifficultyOptions;
use crate::features::{AudioFeatures, Segment};
use crate::stage::hazard::{Hazard, PolarVector};

/// Draws the wall-skip value for one hazard. The default biases heavily
/// toward 1 (single opening): `floor(3 * u^4) + 1` for uniform `u`.
pub type SkipFn = fn(&mut Pcg32) -> u32;

fn default_skip(rng: &mut Pcg32) -> u32 {
    (3.0 * rng.random::<f64>().powi(4)) as u32 + 1
}

/// Generation parameters for [`StageGeometryBuilder`]
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Sides per hazard ring
    pub max_sides: u32,
    /// Onset gaps below this reuse the previous pattern verbatim (seconds)
    pub very_close_distance: f32,
    /// Onset gaps below this rotate the previous pattern by one side
    pub close_distance: f32,
    /// Radial collapse speed of hazards
    pub polygon_velocity: f32,
    /// Radial thickness of hazards
    pub polygon_width: f32,
    /// Radius at which hazards collapse and are consumed
    pub polygon_minimum_radius: f32,
    /// Palette saturation (0..100)
    pub saturation: f64,
    /// Palette lightness (0..100)
    pub lightness: f64,
    /// Minimum hue step as a fraction of the maximum step
    pub minimum_colour_step_multiplier: f64,
    pub skip_function: SkipFn,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            max_sides: 6,
            very_close_distance: 0.2,
            close_distance: 0.4,
            polygon_velocity: 600.0,
            polygon_width: 50.0,
            polygon_minimum_radius: 125.0,
            saturation: 30.0,
            lightness: 40.0,
            minimum_colour_step_multiplier: 0.25,
            skip_function: default_skip,
        }
    }
}

impl BuilderOptions {
    /// Overlay the velocity and width from a difficulty profile
    pub fn apply_difficulty(&mut self, difficulty: &DifficultyOptions) {
        self.polygon_velocity = difficulty.polygon_velocity;
        self.polygon_width = difficulty.polygon_width;
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("no onsets were detected in the track")]
    NoOnsets,
    #[error("the track has no segments")]
    NoSegments,
    #[error("segment {id} ends at {end_time}s before it starts at {start_time}s")]
    InvalidSegment {
        id: u32,
        start_time: f32,
        end_time: f32,
    },
}

/// The finished, immutable output of a build
#[derive(Debug, Clone)]
pub struct BuiltStage {
    /// One hazard per onset, in onset order
    pub hazards: Vec<Hazard>,
    /// Segments sorted by start time
    pub segments: Vec<Segment>,
    /// One colour per segment identifier, indexed by `id - 1`
    pub palette: Vec<Color>,
}

/// Builds the hazard sequence and palette from extracted audio features
pub struct StageGeometryBuilder;

impl StageGeometryBuilder {
    pub fn build(
        features: &AudioFeatures,
        rng: &mut Pcg32,
        options: &BuilderOptions,
    ) -> Result<BuiltStage, BuildError> {
        if features.onsets.is_empty() {
            return Err(BuildError::NoOnsets);
        }
        if features.segments.is_empty() {
            return Err(BuildError::NoSegments);
        }
        for segment in &features.segments {
            if !segment.is_open_ended() && segment.end_time < segment.start_time {
                return Err(BuildError::InvalidSegment {
                    id: segment.id,
                    start_time: segment.start_time,
                    end_time: segment.end_time,
                });
            }
        }

        let mut segments = features.segments.clone();
        segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let hazards = Self::build_hazards(features, rng, options);
        let palette = Self::build_palette(&segments, rng, options);

        log::info!(
            "built stage: {} hazards, {} segments, {} palette colours",
            hazards.len(),
            segments.len(),
            palette.len()
        );

        Ok(BuiltStage {
            hazards,
            segments,
            palette,
        })
    }

    /// One hazard per onset. Onsets close together in time share a wall
    /// pattern (reused or rotated by one side) so rapid runs stay playable;
    /// distant onsets draw a fresh orientation.
    fn build_hazards(
        features: &AudioFeatures,
        rng: &mut Pcg32,
        options: &BuilderOptions,
    ) -> Vec<Hazard> {
        let max_sides = options.max_sides as i64;
        let mut hazards = Vec::with_capacity(features.onsets.len());

        let mut prev_start: i64 = 0;
        let mut prev_skip: u32 = 0;
        let mut prev_time: f32 = -1.0;

        for &time in &features.onsets.times {
            let mut skip = (options.skip_function)(rng);
            let gap = time - prev_time;

            let start = if gap < options.very_close_distance {
                skip = prev_skip;
                prev_start
            } else if gap < options.close_distance {
                // Rotate the previous pattern by one side in a random
                // direction; keep the skip so the shape reads the same.
                skip = prev_skip;
                let nudge: i64 = if rng.random_range(0..2u32) == 0 { -1 } else { 1 };
                prev_start + max_sides + nudge
            } else {
                i64::from(rng.random_range(0..options.max_sides - 1))
            };

            hazards.push(Hazard {
                walls: Self::wall_pattern(options.max_sides, start, skip),
                arrival_time: time,
                velocity: PolarVector::new(options.polygon_velocity, 0.0),
                width: options.polygon_width,
                minimum_radius: options.polygon_minimum_radius,
                start,
                skip,
            });

            prev_start = start;
            prev_skip = skip;
            prev_time = time;
        }

        hazards
    }

    /// Side `i` is a wall iff `(i + start) % skip == 0`, except that a skip
    /// of 1 closes every side but the single opening at `start % max_sides`.
    fn wall_pattern(max_sides: u32, start: i64, skip: u32) -> Vec<bool> {
        let n = max_sides as i64;
        (0..n)
            .map(|i| {
                if skip == 1 {
                    i != start.rem_euclid(n)
                } else {
                    (i + start) % i64::from(skip) == 0
                }
            })
            .collect()
    }

    /// Random walk around the hue wheel, one colour per segment identifier.
    /// Steps are bounded so adjacent segment colours stay distinct, and the
    /// muddy violet band (275..310 degrees) is stepped over.
    fn build_palette(segments: &[Segment], rng: &mut Pcg32, options: &BuilderOptions) -> Vec<Color> {
        let max_id = segments.iter().map(|s| s.id).max().unwrap_or(0);
        let max_step = 360.0 / f64::from(max_id + 1);
        let min_step = options.minimum_colour_step_multiplier * max_step;

        let start_angle = rng.random::<f64>() * 360.0;
        let mut prev_angle = start_angle - max_step;

        let mut palette = Vec::with_capacity(max_id as usize);
        for _ in 0..max_id {
            let step = rng.random::<f64>() * (max_step - min_step) + min_step;
            let mut angle = prev_angle;
            loop {
                angle = normalize_degrees(angle + step);
                if !(angle > 275.0 && angle < 310.0) {
                    break;
                }
            }
            palette.push(Hsl::new(angle, options.saturation, options.lightness).to_color());
            prev_angle = angle;
        }
        palette
    }
}
