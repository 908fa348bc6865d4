//! Stage geometry simulation
//!
//! Owns every moving entity: the hazard runtime states, the player, the
//! centre and backdrop polygons, and the per-segment derived colours. One
//! [`StageGeometry::update`] call advances a single fixed step; the stage
//! lifecycle passes frame-scoped flags and accumulators in through
//! [`StageContext`] rather than the geometry reaching back into its owner.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::color::Color;
use crate::consts::{
    BACKGROUND_POLYGON_RADIUS, CENTER_POLYGON_RADIUS, PLAYER_ANGULAR_SPEED, PLAYER_ARC_WIDTH,
    PLAYER_LENGTH, PLAYER_RADIUS, PLAYER_SLOW_FACTOR,
};
use crate::features::Segment;
use crate::stage::builder::BuiltStage;
use crate::stage::hazard::{Hazard, HazardState, PolarVector};
use crate::stage::overlap;
use crate::{normalize_angle, polar_to_cartesian};

/// Overlap above this percentage registers a hit
pub const HIT_OVERLAP_PERCENT: f64 = 80.0;
/// Base score for consuming one hazard, before multipliers
const HAZARD_BASE_SCORE: f64 = 100.0;

/// Frame-scoped inputs and accumulators for one geometry step
pub struct StageContext<'a> {
    /// Hazards only move radially while the stage is running
    pub running: bool,
    /// Steer the player into openings automatically
    pub ai: bool,
    /// Seconds since the stage left warmup
    pub total_time: f64,
    /// Difficulty score scaling
    pub score_multiplier: f32,
    /// Chain multiplier; reset to -1 on a hit, grows with consumption
    pub multiplier: &'a mut i32,
    /// Player overlap with the current hazard this frame (0..100)
    pub overlap: &'a mut f64,
}

/// The player marker orbiting the centre polygon
#[derive(Debug, Clone)]
pub struct Player {
    pub position: PolarVector,
    pub hits: u32,
    pub score: u64,
    pub is_slow: bool,
    pub direction: i32,
    target_azimuth: Option<f32>,
}

impl Player {
    fn new() -> Self {
        Self {
            position: PolarVector::new(PLAYER_RADIUS, 0.0),
            hits: 0,
            score: 0,
            is_slow: false,
            direction: 1,
            target_azimuth: None,
        }
    }

    /// Steer toward an absolute azimuth; cleared once reached
    pub fn seek(&mut self, azimuth: f32) {
        self.target_azimuth = Some(azimuth);
    }

    pub fn clear_target(&mut self) {
        self.target_azimuth = None;
    }

    /// Hitbox quad in cartesian space
    pub fn bounds(&self) -> [Vec2; 4] {
        let r0 = self.position.radius - PLAYER_LENGTH / 2.0;
        let r1 = self.position.radius + PLAYER_LENGTH / 2.0;
        let a0 = self.position.azimuth - PLAYER_ARC_WIDTH / 2.0;
        let a1 = self.position.azimuth + PLAYER_ARC_WIDTH / 2.0;
        [
            polar_to_cartesian(r0, a0),
            polar_to_cartesian(r1, a0),
            polar_to_cartesian(r1, a1),
            polar_to_cartesian(r0, a1),
        ]
    }

    fn update(&mut self, dt: f32) {
        let Some(target) = self.target_azimuth else {
            return;
        };
        let speed = if self.is_slow {
            PLAYER_ANGULAR_SPEED * PLAYER_SLOW_FACTOR
        } else {
            PLAYER_ANGULAR_SPEED
        };
        // Shortest arc toward the target.
        let diff = normalize_angle(target - self.position.azimuth);
        let step = speed * dt;
        if diff.abs() <= step {
            self.position.azimuth = normalize_angle(target);
            self.target_azimuth = None;
        } else {
            self.position.azimuth = normalize_angle(self.position.azimuth + step.copysign(diff));
        }
    }

    fn reset(&mut self, keep_score: bool) {
        let (score, hits) = if keep_score {
            (self.score, self.hits)
        } else {
            (0, 0)
        };
        *self = Player::new();
        self.score = score;
        self.hits = hits;
    }
}

/// The decorative polygon at the playfield centre; pulses on hazard impact
#[derive(Debug, Clone)]
pub struct CenterPolygon {
    pub position: PolarVector,
    pub direction: i32,
    pub pulse_width: f32,
    pulsing: bool,
}

impl CenterPolygon {
    const PULSE_WIDTH_MAX: f32 = 25.0;
    const PULSE_RATE: f32 = 150.0;
    /// Seconds before impact at which the pulse starts, so the bloom peaks
    /// as the hazard lands
    pub const PULSE_LEAD: f32 = Self::PULSE_WIDTH_MAX / Self::PULSE_RATE;

    fn new() -> Self {
        Self {
            position: PolarVector::new(CENTER_POLYGON_RADIUS, 0.0),
            direction: 1,
            pulse_width: 0.0,
            pulsing: false,
        }
    }

    pub fn begin_pulse(&mut self) {
        self.pulsing = true;
    }

    fn update(&mut self, dt: f32) {
        if self.pulsing {
            self.pulse_width += Self::PULSE_RATE * dt;
            if self.pulse_width >= Self::PULSE_WIDTH_MAX {
                self.pulse_width = Self::PULSE_WIDTH_MAX;
                self.pulsing = false;
            }
        } else {
            self.pulse_width = (self.pulse_width - Self::PULSE_RATE * dt).max(0.0);
        }
    }
}

/// The backdrop polygon far outside the playfield
#[derive(Debug, Clone)]
pub struct BackgroundPolygon {
    pub position: PolarVector,
}

impl BackgroundPolygon {
    fn new() -> Self {
        Self {
            position: PolarVector::new(BACKGROUND_POLYGON_RADIUS, 0.0),
        }
    }
}

/// Every colour the renderer needs for the current segment, derived from the
/// segment's palette entry
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageColours {
    pub background_even: Color,
    pub background_odd: Color,
    pub opposing_even: Color,
    pub opposing_odd: Color,
    pub outline_even: Color,
    pub outline_odd: Color,
    pub collision_even: Color,
    pub collision_odd: Color,
    pub collision_outline_even: Color,
    pub collision_outline_odd: Color,
    pub text: Color,
}

impl StageColours {
    pub fn derive(base: Color) -> Self {
        let even = base.to_hsl();
        let odd = even.shifted(0.0, 5.0, 5.0);

        let collision_even = even.shifted(0.0, 30.0, 20.0);
        let collision_odd = odd.shifted(0.0, 30.0, 20.0);

        let opposing_even = even.shifted(180.0, 0.0, 0.0).with_saturation(50.0);
        let opposing_odd = odd.shifted(180.0, 20.0, 0.0);

        let outline = |c: crate::color::Hsl| c.shifted(0.0, 20.0, 10.0);

        Self {
            background_even: even.to_color(),
            background_odd: odd.to_color(),
            opposing_even: opposing_even.to_color(),
            opposing_odd: opposing_odd.to_color(),
            outline_even: outline(opposing_even).to_color(),
            outline_odd: outline(opposing_odd).to_color(),
            collision_even: collision_even.to_color(),
            collision_odd: collision_odd.to_color(),
            collision_outline_even: outline(collision_even).to_color(),
            collision_outline_odd: outline(collision_odd).to_color(),
            text: Color::WHITE,
        }
    }
}

/// The complete simulated playfield for one stage
pub struct StageGeometry {
    hazards: Vec<Hazard>,
    states: Vec<HazardState>,
    segments: Vec<Segment>,
    palette: Vec<Color>,
    rng: Pcg32,

    pub player: Player,
    pub center: CenterPolygon,
    pub background: BackgroundPolygon,
    colours: StageColours,

    direction: i32,
    rotation_speed: f32,
    /// RNG draws above this on a consumption frame reverse the rotation
    reversal_threshold: f64,
    /// How far ahead of the opening the autopilot aims (radians)
    ai_lead_angle: f32,

    current_index: usize,
    /// Consumption observed this frame, applied to `current_index` at the
    /// start of the next frame
    pending_consumed: usize,
    collided_index: Option<usize>,
    segment_index: usize,
    colour_index: usize,
}

impl StageGeometry {
    pub fn new(
        built: BuiltStage,
        rng: Pcg32,
        rotation_speed: f32,
        reversal_threshold: f64,
        ai_lead_angle: f32,
    ) -> Self {
        let BuiltStage {
            hazards,
            segments,
            palette,
        } = built;
        let states = hazards.iter().map(HazardState::new).collect();
        let colour_index = (segments[0].id.max(1) - 1) as usize;
        let base = palette.get(colour_index).copied().unwrap_or(Color::WHITE);

        Self {
            hazards,
            states,
            segments,
            palette,
            rng,
            player: Player::new(),
            center: CenterPolygon::new(),
            background: BackgroundPolygon::new(),
            colours: StageColours::derive(base),
            direction: 1,
            rotation_speed,
            reversal_threshold,
            ai_lead_angle,
            current_index: 0,
            pending_consumed: 0,
            collided_index: None,
            segment_index: 0,
            colour_index,
        }
    }

    /// Advance one fixed step.
    ///
    /// Order matters and is observable: pending consumption is applied first,
    /// then all live hazards move (azimuth slaved to the centre polygon),
    /// then this frame's consumption is tallied (multiplier, score, possible
    /// direction reversal), then the overlap/hit test runs against the
    /// current hazard, then the autopilot, entities and segment colour state.
    pub fn update(&mut self, dt: f32, ctx: &mut StageContext<'_>) {
        let rotate = dt * self.rotation_speed * self.direction as f32;

        self.current_index += self.pending_consumed;
        self.pending_consumed = 0;

        self.center.position.azimuth = normalize_angle(self.center.position.azimuth + rotate);

        for i in self.current_index..self.hazards.len() {
            let hazard = &self.hazards[i];
            let state = &mut self.states[i];
            state.position.azimuth = self.center.position.azimuth;
            if ctx.running {
                state.advance(hazard, dt);
                if !state.destroy && state.time_to_impact(hazard) < CenterPolygon::PULSE_LEAD {
                    self.center.begin_pulse();
                }
            }
        }

        // Hazards are consumed strictly in onset order, so only the
        // contiguous destroyed prefix counts.
        let consumed = self.states[self.current_index..]
            .iter()
            .take_while(|state| state.destroy)
            .count();
        self.pending_consumed = consumed;

        if consumed > 0 {
            if self.rng.random::<f64>() > self.reversal_threshold {
                self.direction = -self.direction;
                log::debug!("rotation direction reversed");
            }
            *ctx.multiplier += consumed as i32;
            let award = consumed as f64
                * f64::from((*ctx.multiplier).max(0))
                * HAZARD_BASE_SCORE
                * f64::from(ctx.score_multiplier);
            self.player.score += award as u64;
        }

        self.update_player_overlap(ctx);

        if ctx.ai {
            if let Some(hazard) = self.hazards.get(self.current_index) {
                let target = hazard.opening_angle()
                    + self.center.position.azimuth
                    + (rotate + self.ai_lead_angle) * self.direction as f32;
                self.player.seek(normalize_angle(target));
            }
        }

        self.player.direction = self.direction;
        self.center.direction = self.direction;
        self.player.position.azimuth = normalize_angle(self.player.position.azimuth + rotate);
        self.player.update(dt);
        self.center.update(dt);
        self.background.position.azimuth = self.center.position.azimuth;

        self.update_segments(ctx.total_time);
    }

    /// Exact clipped overlap of the player against the current hazard.
    /// At most one hit registers per hazard.
    fn update_player_overlap(&mut self, ctx: &mut StageContext<'_>) {
        let idx = self.current_index;
        if idx >= self.hazards.len() || self.collided_index == Some(idx) {
            *ctx.overlap = 0.0;
            return;
        }
        let quads = self.hazards[idx].wall_quads(self.states[idx].position);
        let overlap = overlap::overlap_percentage(&quads, &self.player.bounds());
        *ctx.overlap = overlap;
        if overlap > HIT_OVERLAP_PERCENT {
            *ctx.multiplier = -1;
            self.player.hits += 1;
            self.collided_index = Some(idx);
            log::debug!("player hit hazard {idx} at {overlap:.1}% overlap");
        }
    }

    /// Advance to the next segment once its predecessor's end time passes,
    /// rederiving the colour set. The open-ended last segment never advances.
    fn update_segments(&mut self, total_time: f64) {
        let segment = &self.segments[self.segment_index];
        if !segment.is_open_ended()
            && f64::from(segment.end_time) < total_time
            && self.segment_index + 1 < self.segments.len()
        {
            self.segment_index += 1;
            let id = self.segments[self.segment_index].id;
            self.colour_index = (id.max(1) - 1) as usize;
            self.colours = StageColours::derive(self.base_colour());
            log::debug!("segment {} active, colour group {id}", self.segment_index);
        }
    }

    fn base_colour(&self) -> Color {
        self.palette
            .get(self.colour_index)
            .copied()
            .unwrap_or(Color::WHITE)
    }

    /// Rewind to the start of the stage without rebuilding
    pub fn reset(&mut self, keep_score: bool) {
        self.states = self.hazards.iter().map(HazardState::new).collect();
        self.current_index = 0;
        self.pending_consumed = 0;
        self.collided_index = None;
        self.direction = 1;
        self.segment_index = 0;
        self.colour_index = (self.segments[0].id.max(1) - 1) as usize;
        self.colours = StageColours::derive(self.base_colour());
        self.player.reset(keep_score);
        self.center = CenterPolygon::new();
        self.background = BackgroundPolygon::new();
    }

    /// Index of the hazard the player is currently facing; equals
    /// [`Self::hazard_count`] once every hazard is consumed
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn hazard_count(&self) -> usize {
        self.hazards.len()
    }

    pub fn is_complete(&self) -> bool {
        self.current_index + self.pending_consumed >= self.hazards.len()
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    pub fn hazard_state(&self, index: usize) -> &HazardState {
        &self.states[index]
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn colours(&self) -> &StageColours {
        &self.colours
    }

    pub fn direction(&self) -> i32 {
        self.direction
    }

    pub fn collided_index(&self) -> Option<usize> {
        self.collided_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::stage::builder::BuiltStage;
    use rand::SeedableRng;
    use std::f32::consts::PI;

    const NEVER_REVERSE: f64 = 2.0;
    const ALWAYS_REVERSE: f64 = -1.0;

    fn hazard(arrival_time: f32, open_side: usize) -> Hazard {
        let mut walls = vec![true; 6];
        walls[open_side] = false;
        Hazard {
            walls,
            arrival_time,
            velocity: PolarVector::new(600.0, 0.0),
            width: 50.0,
            minimum_radius: 125.0,
            start: open_side as i64,
            skip: 1,
        }
    }

    fn geometry(hazards: Vec<Hazard>, reversal_threshold: f64) -> StageGeometry {
        let built = BuiltStage {
            hazards,
            segments: vec![Segment::new(1, 0.0, 0.0)],
            palette: vec![Color::new(0.4, 0.3, 0.3, 1.0)],
        };
        StageGeometry::new(
            built,
            Pcg32::seed_from_u64(99),
            0.0,
            reversal_threshold,
            0.0,
        )
    }

    fn step(geometry: &mut StageGeometry, multiplier: &mut i32, secs: f32) -> f64 {
        let mut overlap = 0.0;
        let steps = (secs / SIM_DT).round() as u32;
        for _ in 0..steps {
            let mut ctx = StageContext {
                running: true,
                ai: false,
                total_time: 0.0,
                score_multiplier: 1.0,
                multiplier: &mut *multiplier,
                overlap: &mut overlap,
            };
            geometry.update(SIM_DT, &mut ctx);
        }
        overlap
    }

    #[test]
    fn test_consumption_advances_cursor_and_multiplier() {
        let mut g = geometry(vec![hazard(0.5, 0)], NEVER_REVERSE);
        // Park the player in the opening so the hazard passes cleanly.
        g.player.position.azimuth = g.hazards()[0].opening_angle();

        let mut multiplier = 0;
        step(&mut g, &mut multiplier, 0.6);

        assert_eq!(g.current_index(), 1);
        assert!(g.is_complete());
        assert_eq!(multiplier, 1);
        assert_eq!(g.player.score, 100);
        assert_eq!(g.player.hits, 0);
    }

    #[test]
    fn test_consumption_batches_grow_the_multiplier() {
        let mut g = geometry(vec![hazard(0.5, 0), hazard(0.8, 0)], NEVER_REVERSE);
        g.player.position.azimuth = g.hazards()[0].opening_angle();

        let mut multiplier = 0;
        step(&mut g, &mut multiplier, 1.0);

        assert_eq!(g.current_index(), 2);
        assert_eq!(multiplier, 2);
        // First batch pays 1 * 1 * 100, second pays 1 * 2 * 100.
        assert_eq!(g.player.score, 300);
    }

    #[test]
    fn test_hit_resets_multiplier_and_registers_once() {
        let mut g = geometry(vec![hazard(0.5, 0)], NEVER_REVERSE);
        // Park the player behind a wall, opposite the opening.
        g.player.position.azimuth = PI;

        let mut multiplier = 3;
        step(&mut g, &mut multiplier, 0.45);
        assert_eq!(g.player.hits, 1);
        assert_eq!(multiplier, -1);
        assert_eq!(g.collided_index(), Some(0));

        // The hazard is still consumed afterwards: -1 + 1 = 0.
        step(&mut g, &mut multiplier, 0.2);
        assert_eq!(g.player.hits, 1);
        assert_eq!(multiplier, 0);
        assert_eq!(g.current_index(), 1);
        // A batch landing on a negative multiplier pays nothing.
        assert_eq!(g.player.score, 0);
    }

    #[test]
    fn test_cursor_never_decreases() {
        let mut g = geometry(
            vec![hazard(0.3, 0), hazard(0.5, 2), hazard(0.9, 4)],
            NEVER_REVERSE,
        );
        g.player.position.azimuth = g.hazards()[0].opening_angle();

        let mut multiplier = 0;
        let mut overlap = 0.0;
        let mut last = 0;
        for _ in 0..180 {
            let mut ctx = StageContext {
                running: true,
                ai: true,
                total_time: 0.0,
                score_multiplier: 1.0,
                multiplier: &mut multiplier,
                overlap: &mut overlap,
            };
            g.update(SIM_DT, &mut ctx);
            assert!(g.current_index() >= last);
            assert!(g.current_index() <= g.hazard_count());
            last = g.current_index();
        }
        assert_eq!(g.current_index(), 3);
    }

    #[test]
    fn test_reversal_flips_direction_on_consumption() {
        let mut g = geometry(vec![hazard(0.5, 0)], ALWAYS_REVERSE);
        g.player.position.azimuth = g.hazards()[0].opening_angle();
        assert_eq!(g.direction(), 1);

        let mut multiplier = 0;
        step(&mut g, &mut multiplier, 0.6);
        assert_eq!(g.direction(), -1);
    }

    #[test]
    fn test_hazards_frozen_until_running() {
        let mut g = geometry(vec![hazard(0.5, 0)], NEVER_REVERSE);
        let spawn = g.hazard_state(0).position.radius;

        let mut multiplier = 0;
        let mut overlap = 0.0;
        for _ in 0..60 {
            let mut ctx = StageContext {
                running: false,
                ai: false,
                total_time: 0.0,
                score_multiplier: 1.0,
                multiplier: &mut multiplier,
                overlap: &mut overlap,
            };
            g.update(SIM_DT, &mut ctx);
        }
        assert_eq!(g.hazard_state(0).position.radius, spawn);
        assert_eq!(g.current_index(), 0);
    }

    #[test]
    fn test_segment_change_rederives_colours() {
        let built = BuiltStage {
            hazards: vec![hazard(10.0, 0)],
            segments: vec![Segment::new(1, 0.0, 1.0), Segment::new(2, 1.0, 0.0)],
            palette: vec![
                Color::new(0.5, 0.3, 0.3, 1.0),
                Color::new(0.3, 0.3, 0.5, 1.0),
            ],
        };
        let mut g = StageGeometry::new(built, Pcg32::seed_from_u64(1), 0.0, NEVER_REVERSE, 0.0);
        let before = *g.colours();

        let mut multiplier = 0;
        let mut overlap = 0.0;
        let mut ctx = StageContext {
            running: true,
            ai: false,
            total_time: 1.5,
            score_multiplier: 1.0,
            multiplier: &mut multiplier,
            overlap: &mut overlap,
        };
        g.update(SIM_DT, &mut ctx);

        assert_eq!(g.segment_index(), 1);
        assert_ne!(*g.colours(), before);
    }

    #[test]
    fn test_autopilot_reaches_the_opening() {
        let mut g = geometry(vec![hazard(1.5, 3)], NEVER_REVERSE);
        let opening = g.hazards()[0].opening_angle();

        let mut multiplier = 0;
        let mut overlap = 0.0;
        for _ in 0..180 {
            let mut ctx = StageContext {
                running: true,
                ai: true,
                total_time: 0.0,
                score_multiplier: 1.0,
                multiplier: &mut multiplier,
                overlap: &mut overlap,
            };
            g.update(SIM_DT, &mut ctx);
        }
        let error = normalize_angle(g.player.position.azimuth - opening).abs();
        assert!(error < 0.1, "player is {error} rad from the opening");
        assert_eq!(g.player.hits, 0);
    }

    #[test]
    fn test_reset_rewinds_without_rebuilding() {
        let mut g = geometry(vec![hazard(0.5, 0)], NEVER_REVERSE);
        g.player.position.azimuth = g.hazards()[0].opening_angle();
        let mut multiplier = 0;
        step(&mut g, &mut multiplier, 0.6);
        assert!(g.is_complete());

        g.reset(false);
        assert_eq!(g.current_index(), 0);
        assert!(!g.is_complete());
        assert_eq!(g.player.score, 0);
        assert!(!g.hazard_state(0).destroy);
    }

    #[test]
    fn test_derived_colours_relationships() {
        let colours = StageColours::derive(Color::new(0.45, 0.3, 0.3, 1.0));
        let bg = colours.background_even.to_hsl();
        let odd = colours.background_odd.to_hsl();
        assert!(odd.l > bg.l);

        let collision = colours.collision_even.to_hsl();
        assert!(collision.l > bg.l);
        assert!(collision.s > bg.s);

        let opposing = colours.opposing_even.to_hsl();
        let hue_delta = (opposing.h - bg.h).rem_euclid(360.0);
        assert!((hue_delta - 180.0).abs() < 1.0);
        assert!((opposing.s - 50.0).abs() < 1.0);
    }
}
