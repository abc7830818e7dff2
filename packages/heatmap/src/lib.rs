#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial density aggregation.
//!
//! Geolocated incidents inside a look-back window are grouped by their
//! coordinates rounded to four decimal places (roughly 11 m), and every
//! group becomes one [`HeatCell`] with a bounded intensity.
//!
//! Records with missing, zero, NaN or out-of-range coordinates are dropped
//! silently and only counted.

pub mod aliases;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use crime_forecast_models::{GeoPoint, HeatCell, Heatmap, IncidentRecord, TimeWindow};
use thiserror::Error;

pub use aliases::CategoryAliases;

/// Decimal places kept when snapping coordinates to the grid.
pub const GRID_PRECISION: i32 = 4;

/// Incidents in one cell at which base intensity saturates.
pub const SATURATION_COUNT: f64 = 10.0;

/// Lowest intensity dial setting.
pub const MIN_INTENSITY: u8 = 1;

/// Highest intensity dial setting.
pub const MAX_INTENSITY: u8 = 10;

/// Errors raised by the heat-map aggregator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeatmapError {
    /// A coordinate was missing, degenerate or outside the valid range.
    #[error("Invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate {
        /// Latitude as received.
        latitude: f64,
        /// Longitude as received.
        longitude: f64,
    },

    /// The category alias table could not be parsed.
    #[error("Invalid category aliases: {0}")]
    InvalidAliases(String),
}

/// Caller-owned heat-map settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapParams {
    /// Look-back window, measured back from `now`.
    pub window: TimeWindow,
    /// Category filter. `None` / `"All"` keeps everything.
    pub category: Option<String>,
    /// Intensity dial, clamped to `1..=10`.
    pub intensity: u8,
    /// Render radius, passed through unmodified.
    pub radius: u32,
    /// Reference time for the window cutoff.
    pub now: DateTime<Utc>,
}

/// Validates a coordinate pair against the lat/lng bounding box.
///
/// # Errors
///
/// Returns [`HeatmapError::InvalidCoordinate`] if either component is NaN,
/// exactly zero, or out of range.
pub fn validate_coordinate(point: GeoPoint) -> Result<GeoPoint, HeatmapError> {
    let GeoPoint {
        latitude,
        longitude,
    } = point;

    let degenerate = |v: f64| v.is_nan() || v == 0.0;
    if degenerate(latitude)
        || degenerate(longitude)
        || !(-90.0..=90.0).contains(&latitude)
        || !(-180.0..=180.0).contains(&longitude)
    {
        return Err(HeatmapError::InvalidCoordinate {
            latitude,
            longitude,
        });
    }

    Ok(point)
}

/// Rounds a coordinate component to [`GRID_PRECISION`] decimal places.
#[must_use]
pub fn snap(value: f64) -> f64 {
    let scale = 10_f64.powi(GRID_PRECISION);
    (value * scale).round() / scale
}

/// The grid key of a snapped coordinate.
#[must_use]
pub fn cell_key(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.4},{longitude:.4}")
}

/// Intensity of a cell holding `count` incidents under dial `dial`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cell_intensity(count: u64, dial: u8) -> f64 {
    let base = (count as f64 / SATURATION_COUNT).min(1.0);
    let dial = f64::from(dial.clamp(MIN_INTENSITY, MAX_INTENSITY));
    (base * dial / 10.0).clamp(0.0, 1.0)
}

/// Returns `true` if `record` is inside the look-back window.
///
/// With [`TimeWindow::All`] every record qualifies, including untimed ones.
#[must_use]
pub fn in_window(record: &IncidentRecord, window: TimeWindow, now: DateTime<Utc>) -> bool {
    window.duration().is_none_or(|duration| {
        record
            .timestamp
            .is_some_and(|timestamp| timestamp >= now - duration)
    })
}

/// Returns `true` if `category` satisfies `filter`.
///
/// Matches on case-insensitive equality, substring containment or a shared
/// alias group. A `None`, empty or `"All"` filter matches everything.
#[must_use]
pub fn category_matches(category: &str, filter: Option<&str>, aliases: &CategoryAliases) -> bool {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return true;
    };
    if filter.eq_ignore_ascii_case("all") {
        return true;
    }

    let category = category.trim().to_lowercase();
    let filter = filter.to_lowercase();

    category.contains(&filter) || aliases.matches(&category, &filter)
}

/// Aggregates records into heat cells using the embedded alias table.
#[must_use]
pub fn aggregate_heatmap(records: &[IncidentRecord], params: &HeatmapParams) -> Heatmap {
    aggregate_heatmap_with(records, params, CategoryAliases::embedded())
}

/// Aggregates records into heat cells.
#[must_use]
pub fn aggregate_heatmap_with(
    records: &[IncidentRecord],
    params: &HeatmapParams,
    aliases: &CategoryAliases,
) -> Heatmap {
    let intensity = params.intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
    let mut grid: BTreeMap<String, (f64, f64, u64)> = BTreeMap::new();
    let mut dropped = 0_u64;

    for record in records
        .iter()
        .filter(|r| in_window(r, params.window, params.now))
        .filter(|r| category_matches(&r.category, params.category.as_deref(), aliases))
    {
        let point = match record.geo.map(validate_coordinate) {
            Some(Ok(point)) => point,
            Some(Err(e)) => {
                log::trace!("Dropping record '{}': {e}", record.id);
                dropped += 1;
                continue;
            }
            None => {
                dropped += 1;
                continue;
            }
        };

        let latitude = snap(point.latitude);
        let longitude = snap(point.longitude);
        grid.entry(cell_key(latitude, longitude))
            .or_insert((latitude, longitude, 0))
            .2 += 1;
    }

    log::debug!(
        "Heat map: {} cells, {dropped} records without a valid coordinate",
        grid.len()
    );

    Heatmap {
        cells: grid
            .into_iter()
            .map(|(key, (latitude, longitude, count))| HeatCell {
                key,
                latitude,
                longitude,
                count,
                intensity: cell_intensity(count, intensity),
            })
            .collect(),
        radius: params.radius,
        intensity,
        dropped,
    }
}
