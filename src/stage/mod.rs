//! Stage generation, simulation and lifecycle
//!
//! `builder` turns audio features into the immutable hazard sequence and
//! palette, `geometry` simulates the playfield one fixed step at a time,
//! `overlap` provides the exact clipped collision test, and `lifecycle`
//! wraps it all in the warmup / ease-in / running / ended phase machine.

pub mod builder;
pub mod geometry;
pub mod hazard;
pub mod lifecycle;
pub mod overlap;

pub use builder::{BuildError, BuilderOptions, BuiltStage, StageGeometryBuilder};
pub use geometry::{
    CenterPolygon, Player, StageColours, StageContext, StageGeometry, HIT_OVERLAP_PERCENT,
};
pub use hazard::{Hazard, HazardState, PolarVector};
pub use lifecycle::{CameraFeedback, Stage, StageOptions, StagePhase, StageSnapshot};
pub use overlap::overlap_percentage;
