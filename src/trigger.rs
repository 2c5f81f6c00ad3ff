use log::debug;

use crate::geometry::cosine_similarity;
use crate::types::{LocalizationState, Vec2};

/// One-shot heading-change detector.
///
/// A straight-line target leaves both candidate tracks self-consistent, so
/// localization waits for the velocity direction to swing away from the
/// previous step's by more than `threshold` (cosine similarity).
#[derive(Clone, Debug)]
pub struct LocalizationTrigger {
    pub warm_up_steps: usize,
    pub threshold: f64,
    previous_velocity: Option<Vec2>,
}

impl LocalizationTrigger {
    pub fn new(warm_up_steps: usize, threshold: f64) -> Self {
        Self {
            warm_up_steps,
            threshold,
            previous_velocity: None,
        }
    }

    /// Feed this step's velocity. True when the heading change qualifies.
    ///
    /// The velocity always becomes the next step's "previous", including
    /// during warm-up.
    pub fn observe(&mut self, index: usize, velocity: &Vec2) -> bool {
        let previous = self.previous_velocity.replace(*velocity);
        if index <= self.warm_up_steps {
            return false;
        }

        match previous.and_then(|prev| cosine_similarity(velocity, &prev)) {
            Some(similarity) => {
                debug!(
                    "step {}: heading similarity {:.4} (threshold {})",
                    index, similarity, self.threshold
                );
                similarity < self.threshold
            }
            None => false,
        }
    }
}

/// Unlocalized → Localized lifecycle, never reversed.
#[derive(Clone, Debug)]
pub struct LocalizationStateMachine {
    state: LocalizationState,
    trigger: LocalizationTrigger,
}

impl LocalizationStateMachine {
    pub fn new(trigger: LocalizationTrigger) -> Self {
        Self {
            state: LocalizationState::Unlocalized,
            trigger,
        }
    }

    /// Consult the trigger. Once localized this is a no-op returning false.
    pub fn evaluate(&mut self, index: usize, velocity: &Vec2) -> bool {
        match self.state {
            LocalizationState::Unlocalized => self.trigger.observe(index, velocity),
            LocalizationState::Localized { .. } => false,
        }
    }

    /// Commit the transition. Returns false (and changes nothing) when
    /// already localized.
    pub fn localize(&mut self, index: usize) -> bool {
        match self.state {
            LocalizationState::Unlocalized => {
                self.state = LocalizationState::Localized { index };
                true
            }
            LocalizationState::Localized { .. } => false,
        }
    }

    pub fn state(&self) -> LocalizationState {
        self.state
    }
}
