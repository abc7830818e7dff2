#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crime forecasting and risk-scoring engine.
//!
//! Every public function is a pure computation over an immutable snapshot
//! of [`IncidentRecord`](crime_forecast_models::IncidentRecord)s:
//!
//! * [`history`] buckets records into monthly counts and pattern tallies.
//! * [`trend`] extrapolates the monthly series with least squares.
//! * [`daily`] produces a jittered, pattern-based per-day forecast.
//! * [`insight`] reduces a daily forecast into peaks, risk and
//!   recommendations.
//!
//! The only source of non-determinism is the [`jitter::JitterSource`]
//! handed to the daily forecaster by the caller.

pub mod daily;
pub mod history;
pub mod insight;
pub mod jitter;
pub mod trend;

use thiserror::Error;

/// Errors surfaced by the forecasting engine.
///
/// Degenerate arithmetic (zero variance, zero denominators) is never
/// reported here; those cases resolve to documented neutral defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// The snapshot was empty, or filtering left nothing to work with.
    #[error("No incident data available: {message}")]
    DataUnavailable {
        /// Description of what was missing.
        message: String,
    },

    /// Fewer inputs than the operation needs.
    #[error("Insufficient data: need at least {required} {what}, found {actual}")]
    InsufficientData {
        /// Minimum required.
        required: u64,
        /// Number actually available.
        actual: u64,
        /// What was being counted (e.g. `"records"`).
        what: &'static str,
    },
}
