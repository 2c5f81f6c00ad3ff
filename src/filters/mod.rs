pub mod track_filter;

pub use track_filter::{KalmanState, TrackFilter, TrackFilterConfig};
