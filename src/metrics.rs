use crate::types::Vec2;

/// Per-axis root-mean-square error over the steps that have an estimate.
/// Pairs beyond the shorter of the two slices are ignored.
pub fn rmse_per_axis(estimates: &[Option<Vec2>], truth: &[Vec2]) -> Option<Vec2> {
    let (sum, count) = paired_errors(estimates, truth)
        .fold((Vec2::zeros(), 0usize), |(sum, n), e| {
            (sum + e.component_mul(&e), n + 1)
        });
    if count == 0 {
        return None;
    }
    Some((sum / count as f64).map(f64::sqrt))
}

/// Euclidean RMSE: sqrt(mean |estimate − truth|²).
pub fn rmse(estimates: &[Option<Vec2>], truth: &[Vec2]) -> Option<f64> {
    let (sum, count) = paired_errors(estimates, truth)
        .fold((0.0, 0usize), |(sum, n), e| (sum + e.norm_squared(), n + 1));
    if count == 0 {
        return None;
    }
    Some((sum / count as f64).sqrt())
}

fn paired_errors<'a>(
    estimates: &'a [Option<Vec2>],
    truth: &'a [Vec2],
) -> impl Iterator<Item = Vec2> + 'a {
    estimates
        .iter()
        .zip(truth.iter())
        .filter_map(|(est, t)| est.map(|e| e - t))
}
