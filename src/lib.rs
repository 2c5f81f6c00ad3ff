//! Range-only planar localization.
//!
//! Estimates a target's position relative to an anchor from range and the
//! target's own velocity, resolving the two-fold mirror ambiguity once the
//! target turns and then tracking it, optionally through a Kalman filter.

pub mod config;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod history;
pub mod localization;
pub mod metrics;
pub mod resolver;
pub mod smoothing;
pub mod trigger;
pub mod types;

pub use config::{LocalizerConfig, SmoothingConfig};
pub use error::{LocResult, LocalizationError};
pub use filters::{KalmanState, TrackFilter, TrackFilterConfig};
pub use history::TrackHistory;
pub use localization::{Localizer, MotionBasedLocalizer, PositionTracker};
pub use types::{
    CandidatePair, LocalizationState, RangeSample, StepInput, StepOutput, StepSnapshot, Vec2,
};
