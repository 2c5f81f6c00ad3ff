//! Streaming localization pipeline
//!
//! Per step: smooth range → two mirror candidates → trigger / resolve →
//! optional track filter. State carried between steps is bounded: the
//! smoothing window, the previous candidate pair and velocity, the trailing
//! estimate window, and the filter state.

use log::{debug, info, warn};

use crate::config::LocalizerConfig;
use crate::error::{LocResult, LocalizationError};
use crate::filters::{KalmanState, TrackFilter};
use crate::geometry::{candidate_positions, closest_to};
use crate::resolver::AmbiguityResolver;
use crate::smoothing::RangeRateEstimator;
use crate::trigger::{LocalizationStateMachine, LocalizationTrigger};
use crate::types::{
    require_rate, CandidatePair, LocalizationState, RangeSample, StepInput, StepOutput, Vec2,
};

/// A disambiguation strategy driven one step at a time.
pub trait Localizer {
    /// Consume one step's measurements. Never fails; per-step conditions
    /// are reported inside the output.
    fn step(&mut self, input: &StepInput) -> StepOutput;

    fn state(&self) -> LocalizationState;

    /// Steps consumed so far (the next step's index)
    fn steps(&self) -> usize;
}

// ─── Shared pieces ───────────────────────────────────────────────────────────

/// Optional filter plus the state it threads between steps.
#[derive(Clone, Debug)]
struct TrackFusion {
    filter: Option<TrackFilter>,
    state: Option<KalmanState>,
}

impl TrackFusion {
    fn new(filter: Option<TrackFilter>) -> Self {
        Self {
            filter,
            state: None,
        }
    }

    /// Fuse a resolved position. The first call initializes the filter and
    /// returns the measurement; later calls predict then update.
    fn fuse(&mut self, index: usize, chosen: Vec2, velocity: &Vec2) -> Vec2 {
        let filter = match &self.filter {
            Some(filter) => filter,
            None => return chosen,
        };

        let next = match self.state {
            None => filter.initialize(&chosen, velocity),
            Some(state) => {
                let predicted = filter.predict(&state);
                match filter.update(&predicted, &chosen, velocity) {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!("step {}: {}; keeping predicted state", index, e);
                        predicted
                    }
                }
            }
        };
        self.state = Some(next);
        next.position()
    }

    /// Advance the filter clock without a measurement.
    fn coast(&mut self) {
        if let (Some(filter), Some(state)) = (&self.filter, self.state) {
            self.state = Some(filter.predict(&state));
        }
    }

    fn state(&self) -> Option<KalmanState> {
        self.state
    }
}

/// Smooth one range and derive the step's candidates. A negative or
/// non-finite range never enters the smoothing window.
fn measure(
    estimator: &mut RangeRateEstimator,
    input: &StepInput,
    min_speed: f64,
) -> (RangeSample, LocResult<CandidatePair>) {
    if !(input.range.is_finite() && input.range >= 0.0) {
        return (
            RangeSample::rejected(input.range),
            Err(LocalizationError::InvalidRange { range: input.range }),
        );
    }

    let sample = estimator.push(input.range);
    let candidates = require_rate(&sample, estimator.len()).and_then(|rate| {
        candidate_positions(
            sample.filtered,
            rate,
            &input.velocity,
            &input.anchor,
            min_speed,
        )
    });
    (sample, candidates)
}

// ─── Motion-based localizer ──────────────────────────────────────────────────

/// Waits for a heading change, resolves the mirror ambiguity once by
/// directional continuity, then tracks by proximity to recent estimates.
pub struct MotionBasedLocalizer {
    config: LocalizerConfig,
    estimator: RangeRateEstimator,
    machine: LocalizationStateMachine,
    resolver: AmbiguityResolver,
    fusion: TrackFusion,
    previous_candidates: Option<CandidatePair>,
    steps: usize,
}

impl MotionBasedLocalizer {
    pub fn new(config: LocalizerConfig, filter: Option<TrackFilter>) -> LocResult<Self> {
        config.validate()?;

        Ok(Self {
            estimator: RangeRateEstimator::new(config.dt, config.noisy, &config.smoothing),
            machine: LocalizationStateMachine::new(LocalizationTrigger::new(
                config.warm_up_steps,
                config.similarity_threshold,
            )),
            resolver: AmbiguityResolver::new(config.trailing_window),
            fusion: TrackFusion::new(filter),
            previous_candidates: None,
            steps: 0,
            config,
        })
    }

    pub fn filter_state(&self) -> Option<KalmanState> {
        self.fusion.state()
    }

    pub fn resolver(&self) -> &AmbiguityResolver {
        &self.resolver
    }

    fn try_localize(
        &mut self,
        index: usize,
        candidates: &LocResult<CandidatePair>,
        velocity: &Vec2,
    ) -> Option<Vec2> {
        let (previous, current) = match (&self.previous_candidates, candidates) {
            (Some(previous), Ok(current)) => (previous, current),
            _ => {
                debug!(
                    "step {}: heading change without two candidate pairs; transition deferred",
                    index
                );
                return None;
            }
        };

        let chosen = AmbiguityResolver::resolve_transition(previous, current);
        self.machine.localize(index);
        info!(
            "Localized at step {} ({:.3}, {:.3})",
            index, chosen.x, chosen.y
        );

        self.resolver.begin(index, chosen);
        Some(self.fusion.fuse(index, chosen, velocity))
    }
}

impl Localizer for MotionBasedLocalizer {
    fn step(&mut self, input: &StepInput) -> StepOutput {
        let index = self.steps;
        self.steps += 1;

        let (range, candidates) = measure(&mut self.estimator, input, self.config.min_speed);

        let mut chosen = None;
        let mut estimate = None;

        match self.machine.state() {
            LocalizationState::Unlocalized => {
                if self.machine.evaluate(index, &input.velocity) {
                    estimate = self.try_localize(index, &candidates, &input.velocity);
                    // At the transition the filter is only initialized
                    chosen = estimate;
                }
            }
            LocalizationState::Localized { .. } => match &candidates {
                Ok(pair) => {
                    chosen = self.resolver.resolve_tracking(pair);
                    if let Some(pick) = chosen {
                        let fused = self.fusion.fuse(index, pick, &input.velocity);
                        self.resolver.record(index, fused);
                        estimate = Some(fused);
                    }
                }
                Err(e) => {
                    warn!("step {}: {}; no position this step", index, e);
                    self.fusion.coast();
                }
            },
        }

        self.previous_candidates = candidates.as_ref().ok().copied();

        StepOutput {
            index,
            range,
            candidates,
            chosen,
            estimate,
            state: self.machine.state(),
        }
    }

    fn state(&self) -> LocalizationState {
        self.machine.state()
    }

    fn steps(&self) -> usize {
        self.steps
    }
}

// ─── Position tracker ────────────────────────────────────────────────────────

/// Tracking from a known starting position: localized from step 0, each
/// step keeps the candidate nearest the previous estimate.
pub struct PositionTracker {
    config: LocalizerConfig,
    estimator: RangeRateEstimator,
    fusion: TrackFusion,
    last_estimate: Vec2,
    steps: usize,
}

impl PositionTracker {
    pub fn new(
        config: LocalizerConfig,
        initial_position: Vec2,
        initial_anchor: Vec2,
        filter: Option<TrackFilter>,
    ) -> LocResult<Self> {
        config.validate()?;

        let mut estimator = RangeRateEstimator::new(config.dt, config.noisy, &config.smoothing);
        estimator.seed((initial_position - initial_anchor).norm());

        Ok(Self {
            estimator,
            fusion: TrackFusion::new(filter),
            last_estimate: initial_position,
            steps: 0,
            config,
        })
    }

    pub fn filter_state(&self) -> Option<KalmanState> {
        self.fusion.state()
    }
}

impl Localizer for PositionTracker {
    fn step(&mut self, input: &StepInput) -> StepOutput {
        let index = self.steps;
        self.steps += 1;

        let (range, candidates) = measure(&mut self.estimator, input, self.config.min_speed);

        let (chosen, estimate) = match &candidates {
            Ok(pair) => {
                let pick = closest_to(&self.last_estimate, pair);
                let fused = self.fusion.fuse(index, pick, &input.velocity);
                self.last_estimate = fused;
                (Some(pick), Some(fused))
            }
            Err(e) => {
                warn!("step {}: {}; no position this step", index, e);
                self.fusion.coast();
                (None, None)
            }
        };

        StepOutput {
            index,
            range,
            candidates,
            chosen,
            estimate,
            state: self.state(),
        }
    }

    fn state(&self) -> LocalizationState {
        LocalizationState::Localized { index: 0 }
    }

    fn steps(&self) -> usize {
        self.steps
    }
}
