use std::collections::{HashMap, VecDeque};

use nalgebra::DMatrix;

use crate::config::SmoothingConfig;
use crate::types::RangeSample;

/// Causal range smoother and differentiator.
///
/// Clean measurements pass through unchanged and the rate is the backward
/// difference of the last two samples. Noisy measurements are fitted with a
/// local least-squares polynomial over a trailing window; the fit is evaluated
/// at the newest sample, so only past and current samples are used.
pub struct RangeRateEstimator {
    window: VecDeque<f64>,
    capacity: usize,
    dt: f64,
    noisy: bool,
    window_cap: usize,
    early_value_window_cap: usize,
    early_sample_count: usize,
    poly_order: usize,
    coefficient_cache: HashMap<usize, FitCoefficients>,
}

/// Rows of the least-squares pseudo-inverse for one window length.
/// Dotting a window with `value` gives the fitted value at the newest sample;
/// dotting with `slope` gives the fitted derivative per sample.
#[derive(Clone, Debug)]
struct FitCoefficients {
    value: Vec<f64>,
    slope: Option<Vec<f64>>,
}

impl RangeRateEstimator {
    pub fn new(dt: f64, noisy: bool, smoothing: &SmoothingConfig) -> Self {
        let capacity = smoothing
            .window_cap
            .max(smoothing.early_sample_count)
            .max(2);

        RangeRateEstimator {
            window: VecDeque::with_capacity(capacity),
            capacity,
            dt,
            noisy,
            window_cap: smoothing.window_cap,
            early_value_window_cap: smoothing.early_value_window_cap,
            early_sample_count: smoothing.early_sample_count,
            poly_order: smoothing.poly_order,
            coefficient_cache: HashMap::new(),
        }
    }

    /// Pre-load a sample that is known rather than measured (e.g. the range
    /// implied by a known initial position). Produces no output.
    pub fn seed(&mut self, range: f64) {
        self.window.push_back(range);
        self.trim();
    }

    /// Consume one raw range and return the filtered range and its rate.
    pub fn push(&mut self, raw: f64) -> RangeSample {
        self.window.push_back(raw);
        self.trim();

        if !self.noisy {
            return self.backward_difference(raw);
        }

        let n = self.window.len();
        let (value_len, rate_len) = if n < self.early_sample_count {
            (n.min(self.early_value_window_cap), n)
        } else {
            let w = n.min(self.window_cap);
            (w, w)
        };

        let (filtered, mut rate) = self.evaluate(value_len);
        if rate_len != value_len {
            rate = self.evaluate(rate_len).1;
        }

        RangeSample {
            raw,
            filtered,
            rate,
        }
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    fn trim(&mut self) {
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    fn backward_difference(&self, raw: f64) -> RangeSample {
        let n = self.window.len();
        let rate = if n >= 2 {
            Some((self.window[n - 1] - self.window[n - 2]) / self.dt)
        } else {
            None
        };
        RangeSample {
            raw,
            filtered: raw,
            rate,
        }
    }

    /// Fit the newest `length` samples; returns (value, rate).
    fn evaluate(&mut self, length: usize) -> (f64, Option<f64>) {
        let order = self.poly_order;
        let coeffs = self
            .coefficient_cache
            .entry(length)
            .or_insert_with(|| compute_fit_coefficients(length, order));

        let start = self.window.len() - length;
        let samples = self.window.range(start..);

        let value: f64 = samples
            .clone()
            .zip(coeffs.value.iter())
            .map(|(y, c)| y * c)
            .sum();
        let rate = coeffs.slope.as_ref().map(|slope| {
            samples
                .zip(slope.iter())
                .map(|(y, c)| y * c)
                .sum::<f64>()
                / self.dt
        });

        (value, rate)
    }
}

/// Least-squares polynomial coefficients on the grid t = -(length-1)..=0.
/// The degree drops when the window is too short or the normal equations are
/// singular.
fn compute_fit_coefficients(length: usize, order: usize) -> FitCoefficients {
    let order = order.min(length.saturating_sub(1));
    if order == 0 {
        return FitCoefficients {
            value: vec![1.0 / length as f64; length],
            slope: None,
        };
    }

    let newest = length as f64 - 1.0;
    let vandermonde = DMatrix::from_fn(length, order + 1, |row, col| {
        (row as f64 - newest).powi(col as i32)
    });
    let vt = vandermonde.transpose();

    match (&vt * &vandermonde).cholesky() {
        Some(chol) => {
            // (JᵀJ)⁻¹Jᵀ, one row per polynomial coefficient
            let pinv = chol.solve(&vt);
            FitCoefficients {
                value: pinv.row(0).iter().copied().collect(),
                slope: Some(pinv.row(1).iter().copied().collect()),
            }
        }
        None => compute_fit_coefficients(length, order - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimator(noisy: bool) -> RangeRateEstimator {
        RangeRateEstimator::new(0.1, noisy, &SmoothingConfig::default())
    }

    #[test]
    fn test_first_sample_has_no_rate() {
        for noisy in [false, true] {
            let mut est = estimator(noisy);
            let sample = est.push(5.0);
            assert_eq!(sample.filtered, 5.0);
            assert!(sample.rate.is_none());
        }
    }

    #[test]
    fn test_clean_backward_difference() {
        let mut est = estimator(false);
        est.push(5.0);
        est.push(5.2);
        let sample = est.push(5.5);
        assert_eq!(sample.filtered, 5.5);
        assert_relative_eq!(sample.rate.unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_noisy_two_samples_is_difference() {
        let mut est = estimator(true);
        est.push(2.0);
        let sample = est.push(2.5);
        assert_relative_eq!(sample.filtered, 2.5, epsilon = 1e-12);
        assert_relative_eq!(sample.rate.unwrap(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_noisy_fit_is_exact_on_ramp() {
        let mut est = estimator(true);
        let mut last = None;
        for k in 0..40 {
            last = Some(est.push(1.0 + 0.3 * k as f64 * 0.1));
        }
        let sample = last.unwrap();
        assert_relative_eq!(sample.filtered, 1.0 + 0.3 * 3.9, epsilon = 1e-9);
        assert_relative_eq!(sample.rate.unwrap(), 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_noisy_fit_suppresses_alternating_noise() {
        let mut est = estimator(true);
        let mut last = None;
        for k in 0..40 {
            let noise = if k % 2 == 0 { 0.05 } else { -0.05 };
            last = Some(est.push(10.0 + noise));
        }
        let sample = last.unwrap();
        // Raw backward difference would be ±1.0 m/s
        assert!(sample.rate.unwrap().abs() < 0.1);
        assert!((sample.filtered - 10.0).abs() < 0.05);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut est = estimator(true);
        for k in 0..100 {
            est.push(k as f64);
        }
        assert_eq!(est.len(), 20);
    }

    #[test]
    fn test_coefficient_cache_reused() {
        let mut est = estimator(true);
        for k in 0..60 {
            est.push(k as f64);
        }
        // Lengths 1..=20 at most
        assert!(est.coefficient_cache.len() <= 20);
        assert!(est.coefficient_cache.contains_key(&20));
    }

    #[test]
    fn test_seed_provides_prior_sample() {
        let mut est = estimator(false);
        est.seed(4.0);
        let sample = est.push(4.1);
        assert_relative_eq!(sample.rate.unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quadratic_fit_exact_at_edge() {
        let config = SmoothingConfig {
            poly_order: 2,
            ..SmoothingConfig::default()
        };
        let mut est = RangeRateEstimator::new(1.0, true, &config);
        let mut last = None;
        for k in 0..25 {
            let t = k as f64;
            last = Some(est.push(0.5 * t * t + 2.0));
        }
        let sample = last.unwrap();
        assert_relative_eq!(sample.filtered, 0.5 * 24.0 * 24.0 + 2.0, epsilon = 1e-6);
        assert_relative_eq!(sample.rate.unwrap(), 24.0, epsilon = 1e-6);
    }

    #[test]
    fn test_early_value_and_rate_windows_differ() {
        let config = SmoothingConfig {
            early_sample_count: 6,
            early_value_window_cap: 2,
            ..SmoothingConfig::default()
        };
        let mut est = RangeRateEstimator::new(1.0, true, &config);
        let mut last = None;
        for t in 0..4 {
            last = Some(est.push((t * t) as f64));
        }
        let sample = last.unwrap();
        // Value from the last two samples (4, 9); rate from all four
        assert_relative_eq!(sample.filtered, 9.0, epsilon = 1e-9);
        assert_relative_eq!(sample.rate.unwrap(), 3.0, epsilon = 1e-9);

        est.push(16.0);
        let sample = est.push(25.0);
        // Six samples: both windows span all of them
        assert_relative_eq!(sample.filtered, 65.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(sample.rate.unwrap(), 5.0, epsilon = 1e-9);
    }
}
