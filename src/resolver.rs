use std::collections::VecDeque;

use crate::geometry::{closest_to, cosine_similarity, mean_position};
use crate::types::{CandidatePair, Vec2};

/// Picks one of the two mirror candidates per step.
///
/// At the transition step the pick is by directional continuity with the
/// previous step's candidates. Afterwards it is by proximity to the mean of
/// a short trailing window of estimates that never reaches back past the
/// localization index.
#[derive(Clone, Debug)]
pub struct AmbiguityResolver {
    window: VecDeque<(usize, Vec2)>,
    capacity: usize,
}

impl AmbiguityResolver {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Current candidate with the highest cosine similarity to any previous
    /// candidate. Earlier candidates win ties; with no defined similarity the
    /// first current candidate is returned.
    pub fn resolve_transition(previous: &CandidatePair, current: &CandidatePair) -> Vec2 {
        let mut best: Option<(f64, Vec2)> = None;
        for cur in current.iter() {
            for prev in previous.iter() {
                if let Some(sim) = cosine_similarity(cur, prev) {
                    if best.map_or(true, |(top, _)| sim > top) {
                        best = Some((sim, *cur));
                    }
                }
            }
        }
        best.map_or(current.first, |(_, pick)| pick)
    }

    /// Start tracking from the localization step.
    pub fn begin(&mut self, index: usize, position: Vec2) {
        self.window.clear();
        self.window.push_back((index, position));
    }

    pub fn predicted_position(&self) -> Option<Vec2> {
        mean_position(self.window.iter().map(|(_, p)| p))
    }

    /// Candidate nearest the trailing mean; `None` before `begin`.
    pub fn resolve_tracking(&self, current: &CandidatePair) -> Option<Vec2> {
        self.predicted_position()
            .map(|predicted| closest_to(&predicted, current))
    }

    pub fn record(&mut self, index: usize, position: Vec2) {
        self.window.push_back((index, position));
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    pub fn window_indices(&self) -> Vec<usize> {
        self.window.iter().map(|(i, _)| *i).collect()
    }
}
