use crate::geometry::closest_to;
use crate::metrics::rmse_per_axis;
use crate::types::{StepOutput, StepSnapshot, Vec2};

/// Full-run record of step outputs for the reporting side.
///
/// The localizers themselves only keep a bounded window; this is what a
/// caller keeps when it wants the whole run (plots, error figures).
#[derive(Clone, Debug, Default)]
pub struct TrackHistory {
    steps: Vec<StepOutput>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, output: StepOutput) {
        self.steps.push(output);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepOutput] {
        &self.steps
    }

    pub fn localization_index(&self) -> Option<usize> {
        self.steps.last().and_then(StepOutput::localization_index)
    }

    pub fn estimates(&self) -> Vec<Option<Vec2>> {
        self.steps.iter().map(|s| s.estimate).collect()
    }

    pub fn chosen(&self) -> Vec<Option<Vec2>> {
        self.steps.iter().map(|s| s.chosen).collect()
    }

    pub fn snapshots(&self) -> Vec<StepSnapshot> {
        self.steps.iter().map(StepOutput::snapshot).collect()
    }

    /// Estimates with the pre-localization steps filled in after the fact.
    ///
    /// Walks back from the localization index, giving each earlier step the
    /// candidate nearest its successor's position. Stops at the first step
    /// with no candidates. The recorded outputs are left untouched.
    pub fn backfilled_estimates(&self) -> Vec<Option<Vec2>> {
        let mut estimates = self.estimates();
        let localized_at = match self.localization_index() {
            Some(index) if index < estimates.len() => index,
            _ => return estimates,
        };

        for i in (0..localized_at).rev() {
            let successor = match estimates[i + 1] {
                Some(position) => position,
                None => break,
            };
            match &self.steps[i].candidates {
                Ok(pair) => estimates[i] = Some(closest_to(&successor, pair)),
                Err(_) => break,
            }
        }
        estimates
    }

    /// Per-axis RMSE of the estimates against ground truth.
    pub fn rmse_against(&self, truth: &[Vec2]) -> Option<Vec2> {
        rmse_per_axis(&self.estimates(), truth)
    }
}
