//! Maps raw supplier records onto [`IncidentRecord`].
//!
//! Each canonical field is resolved from an ordered list of accepted
//! source field names; the first usable value wins. Missing fields resolve
//! to empty strings or `None`. Records are never dropped here, only
//! non-object values are.

use crime_forecast_models::{GeoPoint, IncidentRecord};
use serde_json::Value;

use crate::parsing::{parse_number, parse_timestamp};

/// Accepted identifier field names, in priority order.
pub const ID_FIELDS: &[&str] = &["id", "incidentId", "incident_id"];

/// Accepted category field names, in priority order.
pub const CATEGORY_FIELDS: &[&str] = &["type", "crimeType", "crime_type", "category"];

/// Accepted location field names, in priority order.
pub const LOCATION_FIELDS: &[&str] = &["location", "location_address", "address"];

/// Accepted timestamp field names, in priority order.
pub const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "createdAt", "created_at", "date", "reportedAt"];

const LAT_FIELDS: &[&str] = &["lat", "latitude"];
const LNG_FIELDS: &[&str] = &["lng", "lon", "longitude"];

/// Normalizes one raw record. Returns `None` only for non-object values.
#[must_use]
pub fn normalize_record(raw: &Value) -> Option<IncidentRecord> {
    if !raw.is_object() {
        return None;
    }

    Some(IncidentRecord {
        id: extract_id(raw),
        category: first_non_empty_str(raw, CATEGORY_FIELDS)
            .unwrap_or_default()
            .to_string(),
        location: extract_location(raw),
        timestamp: TIMESTAMP_FIELDS
            .iter()
            .filter_map(|f| raw.get(*f))
            .find_map(parse_timestamp),
        status: raw
            .get("status")
            .and_then(Value::as_str)
            .and_then(non_empty)
            .map(ToString::to_string),
        geo: extract_geo(raw),
    })
}

/// Normalizes a batch of raw records, skipping non-objects.
#[must_use]
pub fn normalize_records(raw: &[Value]) -> Vec<IncidentRecord> {
    let records: Vec<IncidentRecord> = raw.iter().filter_map(normalize_record).collect();

    let untimed = records.iter().filter(|r| r.timestamp.is_none()).count();
    log::debug!(
        "Normalized {} of {} raw records ({untimed} without a usable timestamp)",
        records.len(),
        raw.len()
    );

    records
}

fn extract_id(raw: &Value) -> String {
    ID_FIELDS
        .iter()
        .filter_map(|f| raw.get(*f))
        .find_map(|v| match v {
            Value::String(s) => non_empty(s).map(ToString::to_string),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn extract_location(raw: &Value) -> String {
    LOCATION_FIELDS
        .iter()
        .filter_map(|f| raw.get(*f))
        .find_map(|v| match v {
            Value::String(s) => non_empty(s),
            Value::Object(_) => first_non_empty_str(v, &["address", "name"]),
            _ => None,
        })
        .unwrap_or_default()
        .to_string()
}

/// Nested location object, then top-level fields, then `coordinates`.
fn extract_geo(raw: &Value) -> Option<GeoPoint> {
    raw.get("location")
        .filter(|v| v.is_object())
        .and_then(lat_lng)
        .or_else(|| top_level_lat_lng(raw))
        .or_else(|| raw.get("coordinates").and_then(coordinates))
}

fn top_level_lat_lng(raw: &Value) -> Option<GeoPoint> {
    let latitude = raw.get("latitude").and_then(parse_number);
    let longitude = raw.get("longitude").and_then(parse_number);
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => {
            let latitude = raw.get("lat").and_then(parse_number)?;
            let longitude = raw.get("lng").and_then(parse_number)?;
            Some(GeoPoint::new(latitude, longitude))
        }
    }
}

/// A `coordinates` value: an object with lat/lng members or a GeoJSON
/// `[lng, lat]` pair.
fn coordinates(value: &Value) -> Option<GeoPoint> {
    match value {
        Value::Object(_) => lat_lng(value),
        Value::Array(pair) if pair.len() == 2 => {
            let longitude = parse_number(&pair[0])?;
            let latitude = parse_number(&pair[1])?;
            Some(GeoPoint::new(latitude, longitude))
        }
        _ => None,
    }
}

fn lat_lng(obj: &Value) -> Option<GeoPoint> {
    let latitude = LAT_FIELDS
        .iter()
        .filter_map(|f| obj.get(*f))
        .find_map(parse_number)?;
    let longitude = LNG_FIELDS
        .iter()
        .filter_map(|f| obj.get(*f))
        .find_map(parse_number)?;
    Some(GeoPoint::new(latitude, longitude))
}

fn first_non_empty_str<'a>(raw: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|f| raw.get(*f)?.as_str())
        .find_map(non_empty)
}

/// Returns `s` unchanged unless it is blank.
fn non_empty(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}
