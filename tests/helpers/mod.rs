//! Closed-form trajectories and measurement noise for scenario tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use range_localizer::{Localizer, StepInput, TrackHistory, Vec2};

pub const DT: f64 = 0.1;

/// Ground truth sampled once per step.
pub struct Trajectory {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
}

impl Trajectory {
    /// Piecewise-constant velocity. `legs` lists (first step, velocity);
    /// position k is position k-1 advanced by velocity k.
    pub fn piecewise(start: Vec2, legs: &[(usize, Vec2)], steps: usize) -> Self {
        let mut positions = Vec::with_capacity(steps);
        let mut velocities = Vec::with_capacity(steps);
        let mut p = start;
        for k in 0..steps {
            let v = legs
                .iter()
                .filter(|(from, _)| *from <= k)
                .last()
                .map(|(_, v)| *v)
                .unwrap_or_else(Vec2::zeros);
            if k > 0 {
                p += v * DT;
            }
            positions.push(p);
            velocities.push(v);
        }
        Self {
            positions,
            velocities,
        }
    }

    /// Straight out from the anchor along `heading`, then a circular orbit
    /// (angular rate `omega`) about the anchor from step `turn` on.
    pub fn radial_then_orbit(
        anchor: Vec2,
        heading: f64,
        omega: f64,
        turn: usize,
        steps: usize,
    ) -> Self {
        let (r0, speed) = (1.0, 1.0);
        let u = Vec2::new(heading.cos(), heading.sin());
        let orbit_radius = r0 + speed * (turn as f64 - 1.0) * DT;

        let mut positions = Vec::with_capacity(steps);
        let mut velocities = Vec::with_capacity(steps);
        for k in 0..steps {
            if k < turn {
                positions.push(anchor + (r0 + speed * k as f64 * DT) * u);
                velocities.push(speed * u);
            } else {
                let phase = heading + omega * (k - turn + 1) as f64 * DT;
                let (s, c) = phase.sin_cos();
                positions.push(anchor + orbit_radius * Vec2::new(c, s));
                velocities.push(orbit_radius * omega * Vec2::new(-s, c));
            }
        }
        Self {
            positions,
            velocities,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Exact measurements against a fixed anchor.
    pub fn exact_inputs(&self, anchor: Vec2) -> Vec<StepInput> {
        self.positions
            .iter()
            .zip(&self.velocities)
            .map(|(p, v)| StepInput::new((p - anchor).norm(), *v, anchor))
            .collect()
    }

    /// Treat this trajectory as anchor-relative and carry it along with an
    /// anchor moving at constant velocity. Returns the inputs (velocity
    /// relative to the anchor) and the absolute target positions.
    pub fn about_moving_anchor(
        &self,
        anchor_start: Vec2,
        anchor_velocity: Vec2,
    ) -> (Vec<StepInput>, Vec<Vec2>) {
        self.positions
            .iter()
            .zip(&self.velocities)
            .enumerate()
            .map(|(k, (p, v))| {
                let anchor = anchor_start + anchor_velocity * (k as f64 * DT);
                (StepInput::new(p.norm(), *v, anchor), anchor + p)
            })
            .unzip()
    }

    /// Gaussian noise on range and on each velocity component.
    pub fn noisy_inputs(
        &self,
        anchor: Vec2,
        range_std: f64,
        velocity_std: f64,
        seed: u64,
    ) -> Vec<StepInput> {
        let mut rng = StdRng::seed_from_u64(seed);
        let range_noise = Normal::new(0.0, range_std).unwrap();
        let velocity_noise = Normal::new(0.0, velocity_std).unwrap();

        self.exact_inputs(anchor)
            .into_iter()
            .map(|mut input| {
                input.range += range_noise.sample(&mut rng);
                input.velocity += Vec2::new(
                    velocity_noise.sample(&mut rng),
                    velocity_noise.sample(&mut rng),
                );
                input
            })
            .collect()
    }
}

pub fn run(localizer: &mut dyn Localizer, inputs: &[StepInput]) -> TrackHistory {
    let mut history = TrackHistory::new();
    for input in inputs {
        history.push(localizer.step(input));
    }
    history
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
