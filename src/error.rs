use thiserror::Error;

/// Localizer error types
///
/// Per-step conditions (`DegenerateVelocity`, `InsufficientHistory`,
/// `InvalidRange`) are carried inside a step's output and never abort a run.
/// Construction errors (`FilterConfiguration`, `InvalidConfig`) are returned
/// before any step runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalizationError {
    #[error("Degenerate velocity: speed {speed:e} leaves the heading undefined")]
    DegenerateVelocity { speed: f64 },

    #[error("Insufficient history: {available} sample(s) available, {required} required")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Invalid range measurement: {range}")]
    InvalidRange { range: f64 },

    #[error("Invalid filter configuration ({matrix}): {reason}")]
    FilterConfiguration { matrix: &'static str, reason: String },

    #[error("Innovation covariance is singular")]
    SingularInnovation,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for localizer operations
pub type LocResult<T> = Result<T, LocalizationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_message() {
        let text = LocalizationError::InvalidRange { range: f64::NAN }.to_string();
        assert!(text.contains("Invalid range"));
        assert!(text.contains("NaN"));
    }

    #[test]
    fn test_messages_name_the_matrix() {
        let err = LocalizationError::FilterConfiguration {
            matrix: "measurement_noise",
            reason: "expected 4x4, got 2x2".into(),
        };
        let text = err.to_string();
        assert!(text.contains("measurement_noise"));
        assert!(text.contains("4x4"));
    }
}
