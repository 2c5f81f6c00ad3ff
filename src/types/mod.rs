pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

use crate::error::{LocResult, LocalizationError};

/// One step's worth of measurements from the motion/measurement source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepInput {
    /// Raw range between anchor and target [m]
    pub range: f64,
    /// Raw target velocity relative to the anchor [m/s]
    /// (the target's own velocity when the anchor is static)
    pub velocity: Vec2,
    /// Anchor position at this step
    pub anchor: Vec2,
}

impl StepInput {
    pub fn new(range: f64, velocity: Vec2, anchor: Vec2) -> Self {
        Self {
            range,
            velocity,
            anchor,
        }
    }
}

/// Range as measured, as smoothed, and its estimated time derivative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeSample {
    pub raw: f64,
    pub filtered: f64,
    /// `None` until at least two samples exist
    pub rate: Option<f64>,
}

impl RangeSample {
    /// A measurement kept out of the smoothing window.
    pub fn rejected(raw: f64) -> Self {
        Self {
            raw,
            filtered: raw,
            rate: None,
        }
    }
}

/// The two mirror-symmetric positions consistent with one step's range,
/// range-rate and heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidatePair {
    /// Rotated by +θ from the heading
    pub first: Vec2,
    /// Rotated by −θ from the heading
    pub second: Vec2,
}

impl CandidatePair {
    pub fn new(first: Vec2, second: Vec2) -> Self {
        Self { first, second }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec2> {
        [&self.first, &self.second].into_iter()
    }
}

/// Two-state localization lifecycle. Only ever moves Unlocalized → Localized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalizationState {
    #[default]
    Unlocalized,
    Localized {
        index: usize,
    },
}

impl LocalizationState {
    pub fn is_localized(&self) -> bool {
        matches!(self, LocalizationState::Localized { .. })
    }

    pub fn localization_index(&self) -> Option<usize> {
        match self {
            LocalizationState::Localized { index } => Some(*index),
            LocalizationState::Unlocalized => None,
        }
    }
}

/// Everything one call to `Localizer::step` reports.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutput {
    pub index: usize,
    pub range: RangeSample,
    pub candidates: LocResult<CandidatePair>,
    /// Resolver's pick, before any filtering
    pub chosen: Option<Vec2>,
    /// Final estimate (post-filter when a filter is attached)
    pub estimate: Option<Vec2>,
    pub state: LocalizationState,
}

impl StepOutput {
    pub fn is_localized(&self) -> bool {
        self.state.is_localized()
    }

    pub fn localization_index(&self) -> Option<usize> {
        self.state.localization_index()
    }

    /// True only on the step where the state machine transitioned.
    pub fn is_transition(&self) -> bool {
        self.state.localization_index() == Some(self.index)
    }

    pub fn snapshot(&self) -> StepSnapshot {
        let (candidates, candidate_error) = match &self.candidates {
            Ok(pair) => (Some((to_tuple(&pair.first), to_tuple(&pair.second))), None),
            Err(e) => (None, Some(e.to_string())),
        };

        StepSnapshot {
            index: self.index,
            range_raw: self.range.raw,
            range_filtered: self.range.filtered,
            range_rate: self.range.rate,
            candidates,
            candidate_error,
            chosen: self.chosen.as_ref().map(to_tuple),
            estimate: self.estimate.as_ref().map(to_tuple),
            localized: self.state.is_localized(),
            localization_index: self.state.localization_index(),
        }
    }
}

/// Serializable per-step report for the reporting side (CLI output, plots).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub index: usize,
    pub range_raw: f64,
    pub range_filtered: f64,
    pub range_rate: Option<f64>,
    pub candidates: Option<((f64, f64), (f64, f64))>,
    pub candidate_error: Option<String>,
    pub chosen: Option<(f64, f64)>,
    pub estimate: Option<(f64, f64)>,
    pub localized: bool,
    pub localization_index: Option<usize>,
}

fn to_tuple(v: &Vec2) -> (f64, f64) {
    (v.x, v.y)
}

/// Shared precondition used by the per-step stages.
pub(crate) fn require_rate(sample: &RangeSample, available: usize) -> LocResult<f64> {
    sample.rate.ok_or(LocalizationError::InsufficientHistory {
        available,
        required: 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_defaults_to_unlocalized() {
        let state = LocalizationState::default();
        assert!(!state.is_localized());
        assert_eq!(state.localization_index(), None);
    }

    #[test]
    fn test_snapshot_carries_error_text() {
        let output = StepOutput {
            index: 0,
            range: RangeSample {
                raw: 3.0,
                filtered: 3.0,
                rate: None,
            },
            candidates: Err(LocalizationError::InsufficientHistory {
                available: 1,
                required: 2,
            }),
            chosen: None,
            estimate: None,
            state: LocalizationState::Unlocalized,
        };

        let snap = output.snapshot();
        assert!(snap.candidates.is_none());
        assert!(snap.candidate_error.unwrap().contains("Insufficient history"));
        assert!(!snap.localized);
    }

    #[test]
    fn test_transition_flag() {
        let output = StepOutput {
            index: 25,
            range: RangeSample {
                raw: 5.0,
                filtered: 5.0,
                rate: Some(0.1),
            },
            candidates: Ok(CandidatePair::new(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0))),
            chosen: Some(Vec2::new(1.0, 0.0)),
            estimate: Some(Vec2::new(1.0, 0.0)),
            state: LocalizationState::Localized { index: 25 },
        };
        assert!(output.is_transition());

        let snap = output.snapshot();
        assert_eq!(snap.chosen, Some((1.0, 0.0)));
        assert_eq!(snap.localization_index, Some(25));
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"localized\":true"));
    }
}
