#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion boundary for the forecasting engine.
//!
//! The record supplier hands over loosely-shaped JSON objects whose field
//! names vary between producers (`type` vs `crimeType` vs `crime_type`, a
//! plain `location` string vs a nested location object, and so on).
//! [`normalize::normalize_record`] maps each one onto the canonical
//! [`IncidentRecord`](crime_forecast_models::IncidentRecord) so nothing
//! downstream has to know about legacy names.

pub mod normalize;
pub mod parsing;

use std::path::{Path, PathBuf};

use crime_forecast_models::IncidentRecord;
use thiserror::Error;

/// Errors that can occur while reading a record snapshot.
#[derive(Debug, Error)]
pub enum SupplierError {
    /// Reading the snapshot failed.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The snapshot was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The snapshot was valid JSON but not an array of records.
    #[error("Malformed snapshot: {message}")]
    Malformed {
        /// Description of what was wrong.
        message: String,
    },
}

/// Something that can hand over every incident record in one read.
pub trait RecordSupplier: Send + Sync {
    /// Returns the raw records of the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError`] if the snapshot cannot be read.
    fn fetch_all(&self) -> Result<Vec<serde_json::Value>, SupplierError>;

    /// Reads the snapshot and normalizes every record.
    ///
    /// # Errors
    ///
    /// Returns [`SupplierError`] if the snapshot cannot be read.
    fn fetch_normalized(&self) -> Result<Vec<IncidentRecord>, SupplierError> {
        Ok(normalize::normalize_records(&self.fetch_all()?))
    }
}

/// A snapshot stored as a JSON file, re-read on every fetch.
///
/// Accepts either a bare array of records or an object with a
/// `records` / `incidents` / `reports` array.
#[derive(Debug, Clone)]
pub struct JsonFileSupplier {
    path: PathBuf,
}

impl JsonFileSupplier {
    /// Creates a supplier reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSupplier for JsonFileSupplier {
    fn fetch_all(&self) -> Result<Vec<serde_json::Value>, SupplierError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| SupplierError::Io {
            path: self.path.clone(),
            source,
        })?;
        let records = parse_snapshot(&text)?;
        log::debug!(
            "Read {} raw records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Wrapper keys under which a snapshot array may be nested.
const SNAPSHOT_KEYS: &[&str] = &["records", "incidents", "reports"];

/// Parses snapshot text into its raw record objects.
///
/// # Errors
///
/// Returns [`SupplierError`] if the text is not JSON or holds no record
/// array.
pub fn parse_snapshot(text: &str) -> Result<Vec<serde_json::Value>, SupplierError> {
    match serde_json::from_str(text)? {
        serde_json::Value::Array(records) => Ok(records),
        serde_json::Value::Object(mut map) => SNAPSHOT_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(serde_json::Value::Array(records)) => Some(records),
                _ => None,
            })
            .ok_or_else(|| SupplierError::Malformed {
                message: format!("expected an array or one of {SNAPSHOT_KEYS:?}"),
            }),
        other => Err(SupplierError::Malformed {
            message: format!("expected an array of records, found {other}"),
        }),
    }
}
