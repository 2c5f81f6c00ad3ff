//! Linear algebra type system for the localizer
//!
//! Provides compile-time dimension checking and clean type aliases
//! for the planar geometry and the track filter.

use nalgebra::{SMatrix, SVector, Vector2};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 4; // [x, y, vx, vy]

// ===== Measurement Dimensions =====
pub const MEASURE_DIM: usize = 4; // chosen (x, y) + measured (vx, vy)

/// Planar position or velocity.
pub type Vec2 = Vector2<f64>;

// ===== Track Filter Types =====
pub type StateVec4 = SVector<f64, STATE_DIM>;
pub type StateMat4 = SMatrix<f64, STATE_DIM, STATE_DIM>;

pub type MeasVec4 = SVector<f64, MEASURE_DIM>;
pub type MeasNoise4 = SMatrix<f64, MEASURE_DIM, MEASURE_DIM>;

// Kalman gain / observation model (identity observation, kept explicit)
pub type KalmanGain4 = SMatrix<f64, STATE_DIM, MEASURE_DIM>;
pub type ObservationMat4 = SMatrix<f64, MEASURE_DIM, STATE_DIM>;

/// Stack a position and a velocity into one state-shaped vector.
pub fn stack(position: &Vec2, velocity: &Vec2) -> StateVec4 {
    StateVec4::new(position.x, position.y, velocity.x, velocity.y)
}
