//! Constant-velocity linear Kalman filter for the resolved track
//!
//! State Vector (4D):
//! [0-1]: Position (x, y) [m]
//! [2-3]: Velocity (vx, vy) [m/s]
//!
//! Measurement (4D, identity observation):
//! [0-1]: Resolved candidate position
//! [2-3]: Measured velocity
//!
//! The filter holds only the model; each predict/update takes a
//! `KalmanState` and returns the next one.

use nalgebra::SymmetricEigen;
use ndarray::Array2;

use crate::error::{LocResult, LocalizationError};
use crate::types::{
    stack, KalmanGain4, MeasNoise4, MeasVec4, ObservationMat4, StateMat4, StateVec4, Vec2,
    STATE_DIM,
};

const SYMMETRY_TOL: f64 = 1e-9;
const EIGEN_TOL: f64 = 1e-9;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Filter matrices as supplied by the caller (offline calibration output).
#[derive(Clone, Debug, PartialEq)]
pub struct TrackFilterConfig {
    /// F, 4x4
    pub transition: Array2<f64>,
    /// Q, 4x4 symmetric PSD
    pub process_noise: Array2<f64>,
    /// R, 4x4 symmetric PSD
    pub measurement_noise: Array2<f64>,
    /// P₀, 4x4 symmetric PSD
    pub initial_covariance: Array2<f64>,
}

impl TrackFilterConfig {
    /// Constant-velocity model with per-axis white-noise acceleration.
    /// The initial covariance defaults to the measurement noise.
    pub fn constant_velocity(
        dt: f64,
        accel_std: (f64, f64),
        measurement_noise: Array2<f64>,
    ) -> Self {
        Self {
            transition: constant_velocity_transition(dt),
            process_noise: white_noise_acceleration(dt, accel_std),
            initial_covariance: measurement_noise.clone(),
            measurement_noise,
        }
    }

    pub fn with_initial_covariance(mut self, initial_covariance: Array2<f64>) -> Self {
        self.initial_covariance = initial_covariance;
        self
    }

    pub fn with_transition(mut self, transition: Array2<f64>) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_process_noise(mut self, process_noise: Array2<f64>) -> Self {
        self.process_noise = process_noise;
        self
    }
}

/// F = [[I, dt·I], [0, I]]
pub fn constant_velocity_transition(dt: f64) -> Array2<f64> {
    let mut f = Array2::<f64>::eye(STATE_DIM);
    f[[0, 2]] = dt;
    f[[1, 3]] = dt;
    f
}

/// Discretized white-noise acceleration, one block per axis:
/// σ² · [[dt⁴/4, dt³/2], [dt³/2, dt²]] on (position, velocity).
pub fn white_noise_acceleration(dt: f64, accel_std: (f64, f64)) -> Array2<f64> {
    let dt2 = dt * dt;
    let dt3 = dt2 * dt;
    let dt4 = dt3 * dt;

    let mut q = Array2::<f64>::zeros((STATE_DIM, STATE_DIM));
    for (axis, sigma) in [accel_std.0, accel_std.1].into_iter().enumerate() {
        let var = sigma * sigma;
        let (p, v) = (axis, axis + 2);
        q[[p, p]] = dt4 / 4.0 * var;
        q[[p, v]] = dt3 / 2.0 * var;
        q[[v, p]] = dt3 / 2.0 * var;
        q[[v, v]] = dt2 * var;
    }
    q
}

/// diag(σ²ₚ, σ²ₚ, σ²ᵥ, σ²ᵥ)
pub fn diagonal_measurement_noise(position_var: f64, velocity_var: f64) -> Array2<f64> {
    Array2::from_diag(&ndarray::arr1(&[
        position_var,
        position_var,
        velocity_var,
        velocity_var,
    ]))
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KalmanState {
    pub x: StateVec4,
    pub p: StateMat4,
}

impl KalmanState {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x[0], self.x[1])
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.x[2], self.x[3])
    }

    pub fn covariance_trace(&self) -> f64 {
        self.p.trace()
    }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct TrackFilter {
    f: StateMat4,
    q: StateMat4,
    r: MeasNoise4,
    h: ObservationMat4,
    p0: StateMat4,
}

impl TrackFilter {
    /// Validate and convert the configuration. Every matrix must be 4x4 and
    /// finite; Q, R and P₀ must also be symmetric positive semi-definite.
    pub fn new(config: TrackFilterConfig) -> LocResult<Self> {
        let f = fixed_from_nd("transition", &config.transition)?;
        let q = covariance_from_nd("process_noise", &config.process_noise)?;
        let r = covariance_from_nd("measurement_noise", &config.measurement_noise)?;
        let p0 = covariance_from_nd("initial_covariance", &config.initial_covariance)?;

        Ok(Self {
            f,
            q,
            r,
            h: ObservationMat4::identity(),
            p0,
        })
    }

    /// State straight from a measurement, covariance P₀. No predict/update.
    pub fn initialize(&self, position: &Vec2, velocity: &Vec2) -> KalmanState {
        KalmanState {
            x: stack(position, velocity),
            p: self.p0,
        }
    }

    /// x⁻ = F·x, P⁻ = F·P·Fᵀ + Q
    pub fn predict(&self, state: &KalmanState) -> KalmanState {
        KalmanState {
            x: self.f * state.x,
            p: self.f * state.p * self.f.transpose() + self.q,
        }
    }

    /// Fuse [position, velocity]. Joseph-form covariance update.
    pub fn update(
        &self,
        state: &KalmanState,
        position: &Vec2,
        velocity: &Vec2,
    ) -> LocResult<KalmanState> {
        let z: MeasVec4 = stack(position, velocity);
        let innovation = z - self.h * state.x;

        let s = self.h * state.p * self.h.transpose() + self.r;
        let s_inv = s
            .try_inverse()
            .ok_or(LocalizationError::SingularInnovation)?;
        let k: KalmanGain4 = state.p * self.h.transpose() * s_inv;

        let x = state.x + k * innovation;

        let i_kh = StateMat4::identity() - k * self.h;
        let p = i_kh * state.p * i_kh.transpose() + k * self.r * k.transpose();
        let p = (p + p.transpose()) * 0.5;

        Ok(KalmanState { x, p })
    }

    pub fn measurement_noise(&self) -> &MeasNoise4 {
        &self.r
    }

    pub fn initial_covariance(&self) -> &StateMat4 {
        &self.p0
    }
}

fn fixed_from_nd(name: &'static str, array: &Array2<f64>) -> LocResult<StateMat4> {
    let (rows, cols) = array.dim();
    if rows != STATE_DIM || cols != STATE_DIM {
        return Err(LocalizationError::FilterConfiguration {
            matrix: name,
            reason: format!("expected {0}x{0}, got {1}x{2}", STATE_DIM, rows, cols),
        });
    }
    if array.iter().any(|v| !v.is_finite()) {
        return Err(LocalizationError::FilterConfiguration {
            matrix: name,
            reason: "contains non-finite entries".to_string(),
        });
    }
    Ok(StateMat4::from_fn(|r, c| array[[r, c]]))
}

fn covariance_from_nd(name: &'static str, array: &Array2<f64>) -> LocResult<StateMat4> {
    let m = fixed_from_nd(name, array)?;

    let scale = m.amax().max(1.0);
    if (m - m.transpose()).amax() > SYMMETRY_TOL * scale {
        return Err(LocalizationError::FilterConfiguration {
            matrix: name,
            reason: "not symmetric".to_string(),
        });
    }

    let min_eigen = SymmetricEigen::new(m).eigenvalues.min();
    if min_eigen < -EIGEN_TOL * scale {
        return Err(LocalizationError::FilterConfiguration {
            matrix: name,
            reason: format!("not positive semi-definite (min eigenvalue {:.3e})", min_eigen),
        });
    }
    Ok(m)
}
