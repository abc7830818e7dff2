//! Historical aggregation.
//!
//! Buckets canonical incident records into chronologically ordered monthly
//! counts and into the hour / weekday / week-of-month tallies the daily
//! forecaster scales its baseline with.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use crime_forecast_models::{CategoryCount, IncidentRecord, MonthlyBucket, PatternTables};

use crate::ForecastError;

/// Category value meaning "every category".
pub const ALL_CATEGORIES: &str = "All";

/// Category / location filter applied before monthly bucketing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Exact category label to keep. `None` or `"All"` keeps everything.
    pub category: Option<String>,
    /// Exact location label to keep. `None` keeps everything.
    pub location: Option<String>,
}

impl HistoryFilter {
    /// Creates a filter on category only.
    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            location: None,
        }
    }

    /// Returns `true` if the record passes both filters.
    #[must_use]
    pub fn matches(&self, record: &IncidentRecord) -> bool {
        matches_category(record, self.category.as_deref())
            && self
                .location
                .as_deref()
                .is_none_or(|location| record.location == location)
    }
}

/// Returns `true` if `category` selects every category.
#[must_use]
pub fn is_all_categories(category: Option<&str>) -> bool {
    category.is_none_or(|c| c.is_empty() || c.eq_ignore_ascii_case(ALL_CATEGORIES))
}

/// Exact category match, with `None` / `"All"` matching everything.
#[must_use]
pub fn matches_category(record: &IncidentRecord, category: Option<&str>) -> bool {
    if is_all_categories(category) {
        return true;
    }
    category.is_some_and(|c| record.category == c)
}

/// Formats the `YYYY-MM` label of a timestamp.
#[must_use]
pub fn month_label(timestamp: &DateTime<Utc>) -> String {
    format!("{:04}-{:02}", timestamp.year(), timestamp.month())
}

/// Groups filtered, timestamped records into monthly buckets, oldest first.
///
/// Months without incidents are absent rather than zero-filled.
///
/// # Errors
///
/// Returns [`ForecastError::DataUnavailable`] if `records` is empty or no
/// timestamped record passes `filter`.
pub fn monthly_buckets(
    records: &[IncidentRecord],
    filter: &HistoryFilter,
) -> Result<Vec<MonthlyBucket>, ForecastError> {
    if records.is_empty() {
        return Err(ForecastError::DataUnavailable {
            message: "the incident snapshot is empty".to_string(),
        });
    }

    let mut months: BTreeMap<String, u64> = BTreeMap::new();
    let mut skipped = 0_u64;

    for record in records.iter().filter(|r| filter.matches(r)) {
        let Some(timestamp) = record.timestamp else {
            skipped += 1;
            continue;
        };
        *months.entry(month_label(&timestamp)).or_insert(0) += 1;
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} matching records without a usable timestamp");
    }

    if months.is_empty() {
        return Err(ForecastError::DataUnavailable {
            message: describe_filter(filter),
        });
    }

    Ok(months
        .into_iter()
        .map(|(label, count)| MonthlyBucket { label, count })
        .collect())
}

fn describe_filter(filter: &HistoryFilter) -> String {
    let category = filter
        .category
        .as_deref()
        .filter(|c| !is_all_categories(Some(*c)));
    match (category, filter.location.as_deref()) {
        (Some(c), Some(l)) => format!("no records for category '{c}' at '{l}'"),
        (Some(c), None) => format!("no records for category '{c}'"),
        (None, Some(l)) => format!("no records at '{l}'"),
        (None, None) => "no records with a usable timestamp".to_string(),
    }
}

/// Tallies hour-of-day, weekday and week-of-month occurrences.
///
/// Records without a timestamp are ignored. Weekday index 0 is Sunday;
/// week-of-month index is `(day_of_month - 1) / 7`.
#[must_use]
pub fn pattern_tables<'a>(records: impl IntoIterator<Item = &'a IncidentRecord>) -> PatternTables {
    let mut tables = PatternTables::default();

    for timestamp in records.into_iter().filter_map(|r| r.timestamp) {
        tables.hourly[timestamp.hour() as usize] += 1;
        tables.day_of_week[timestamp.weekday().num_days_from_sunday() as usize] += 1;
        tables.week_of_month[week_of_month(timestamp.day())] += 1;
        tables.total += 1;

        tables.first = Some(tables.first.map_or(timestamp, |f| f.min(timestamp)));
        tables.last = Some(tables.last.map_or(timestamp, |l| l.max(timestamp)));
    }

    tables
}

/// Zero-based week of month for a one-based day of month.
#[must_use]
pub const fn week_of_month(day_of_month: u32) -> usize {
    (day_of_month.saturating_sub(1) / 7) as usize
}

/// Inclusive number of calendar days covered by the tallied history.
///
/// Always at least 1.
#[must_use]
pub fn days_spanned(tables: &PatternTables) -> u64 {
    match (tables.first, tables.last) {
        (Some(first), Some(last)) => {
            let days = (last.date_naive() - first.date_naive()).num_days() + 1;
            u64::try_from(days).unwrap_or(1).max(1)
        }
        _ => 1,
    }
}

/// Counts records per category label, busiest first (ties by label).
#[must_use]
pub fn category_breakdown(records: &[IncidentRecord]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(record.category.as_str()).or_insert(0) += 1;
    }

    let mut breakdown: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count));
    breakdown
}
