//! Range/range-rate geometry
//!
//! Converts one step's range, range-rate and velocity into the two positions
//! consistent with them, plus the similarity and proximity helpers the
//! resolver builds on.

use crate::error::{LocResult, LocalizationError};
use crate::types::{CandidatePair, Vec2};

/// Candidate target positions for one step.
///
/// With heading α = atan2(vy, vx) and bearing offset θ = acos(ṙ / |v|):
///   first  = anchor + r·(cos(α+θ), sin(α+θ))
///   second = anchor + r·(cos(α−θ), sin(α−θ))
///
/// Both lie at distance `range` from `anchor`, mirrored across the line
/// through the anchor along `velocity`.
pub fn candidate_positions(
    range: f64,
    range_rate: f64,
    velocity: &Vec2,
    anchor: &Vec2,
    min_speed: f64,
) -> LocResult<CandidatePair> {
    let speed = velocity.norm();
    if !speed.is_finite() || speed <= min_speed {
        return Err(LocalizationError::DegenerateVelocity { speed });
    }

    let heading = velocity.y.atan2(velocity.x);
    // Clamp absorbs rounding past ±1, not a data condition
    let offset = (range_rate / speed).clamp(-1.0, 1.0).acos();

    let first = anchor + range * Vec2::new((heading + offset).cos(), (heading + offset).sin());
    let second = anchor + range * Vec2::new((heading - offset).cos(), (heading - offset).sin());

    Ok(CandidatePair::new(first, second))
}

/// Cosine of the angle between two vectors; `None` if either is zero.
pub fn cosine_similarity(a: &Vec2, b: &Vec2) -> Option<f64> {
    let denom = a.norm() * b.norm();
    if denom > 0.0 && denom.is_finite() {
        Some(a.dot(b) / denom)
    } else {
        None
    }
}

/// The candidate nearest `target` (Euclidean). Ties go to `first`.
pub fn closest_to(target: &Vec2, candidates: &CandidatePair) -> Vec2 {
    let d_first = (candidates.first - target).norm();
    let d_second = (candidates.second - target).norm();
    if d_second < d_first {
        candidates.second
    } else {
        candidates.first
    }
}

pub fn mean_position<'a>(positions: impl IntoIterator<Item = &'a Vec2>) -> Option<Vec2> {
    let (sum, count) = positions
        .into_iter()
        .fold((Vec2::zeros(), 0usize), |(sum, n), p| (sum + p, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
