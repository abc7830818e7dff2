//! Forecast insight synthesis.
//!
//! Reduces a daily forecast (statistical or model-produced) into totals,
//! an overall risk level, the busiest hours and days, and a short list of
//! rule-based recommendations.

use std::collections::BTreeMap;

use crime_forecast_models::{DailyForecast, ForecastInsight, PeakDay, PeakHour, RiskLevel};

/// Number of peak hours and peak days reported.
pub const PEAK_COUNT: usize = 3;

/// Overall risk is `High` when more than this share of days is `High`.
pub const HIGH_DAY_SHARE: f64 = 0.3;

/// Overall risk is `Medium` when more than this share of days is `High`.
pub const MEDIUM_DAY_SHARE: f64 = 0.1;

/// Hours at or after this are night hours.
pub const NIGHT_START_HOUR: u8 = 18;

/// Hours at or before this are night hours.
pub const NIGHT_END_HOUR: u8 = 6;

const PATROL_RECOMMENDATION: &str =
    "Increase patrol presence in high-risk areas during the forecast period.";
const RESOURCE_RECOMMENDATION: &str =
    "Allocate additional response resources to the predicted high-risk days.";
const NIGHT_RECOMMENDATION: &str =
    "Strengthen night-time security and lighting: peak activity is expected after dark.";
const WEEKEND_RECOMMENDATION: &str =
    "Prepare additional staffing for the weekend: Friday and Saturday are among the peak days.";
const AWARENESS_RECOMMENDATION: &str =
    "Run community awareness campaigns to encourage prevention and prompt reporting.";

/// Summarizes a daily forecast.
///
/// `historical_total` is the size of the history the forecast was derived
/// from; the community-awareness rule fires when the forecast total exceeds
/// half of it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn synthesize(days: &[DailyForecast], historical_total: u64) -> ForecastInsight {
    let total_predicted: u64 = days.iter().map(|d| d.predicted).sum();
    let overall_risk = overall_risk(days);
    let peak_hours = peak_hours(days);
    let peak_days = peak_days(days);

    let mut recommendations = Vec::new();

    if overall_risk == RiskLevel::High {
        recommendations.push(PATROL_RECOMMENDATION.to_string());
        recommendations.push(RESOURCE_RECOMMENDATION.to_string());
    }

    if peak_hours.iter().any(|p| is_night_hour(p.hour)) {
        recommendations.push(NIGHT_RECOMMENDATION.to_string());
    }

    if peak_days
        .iter()
        .any(|d| d.day_of_week == "Friday" || d.day_of_week == "Saturday")
    {
        recommendations.push(WEEKEND_RECOMMENDATION.to_string());
    }

    if total_predicted as f64 > historical_total as f64 / 2.0 {
        recommendations.push(AWARENESS_RECOMMENDATION.to_string());
    }

    ForecastInsight {
        total_predicted,
        overall_risk,
        peak_hours,
        peak_days,
        recommendations,
    }
}

/// Risk level of a forecast as a whole, from its share of `High` days.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overall_risk(days: &[DailyForecast]) -> RiskLevel {
    if days.is_empty() {
        return RiskLevel::Low;
    }

    let high = days
        .iter()
        .filter(|d| d.risk_level == RiskLevel::High)
        .count();
    let share = high as f64 / days.len() as f64;

    if share > HIGH_DAY_SHARE {
        RiskLevel::High
    } else if share > MEDIUM_DAY_SHARE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// The busiest hours summed across all days.
///
/// Sorted by count descending, ties by ascending hour. Hours with no
/// predicted incidents are never peaks.
#[must_use]
pub fn peak_hours(days: &[DailyForecast]) -> Vec<PeakHour> {
    let mut totals: BTreeMap<u8, u64> = BTreeMap::new();
    for day in days {
        for (&hour, &count) in &day.hourly_breakdown {
            *totals.entry(hour).or_insert(0) += count;
        }
    }

    let mut hours: Vec<PeakHour> = totals
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .map(|(hour, count)| PeakHour { hour, count })
        .collect();
    hours.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
    hours.truncate(PEAK_COUNT);
    hours
}

/// The busiest days, ties by ascending date. Days predicting zero
/// incidents are never peaks.
#[must_use]
pub fn peak_days(days: &[DailyForecast]) -> Vec<PeakDay> {
    let mut sorted: Vec<&DailyForecast> = days.iter().filter(|d| d.predicted > 0).collect();
    sorted.sort_by(|a, b| b.predicted.cmp(&a.predicted).then(a.date.cmp(&b.date)));

    sorted
        .into_iter()
        .take(PEAK_COUNT)
        .map(|d| PeakDay {
            date: d.date,
            day_of_week: d.day_of_week.clone(),
            predicted: d.predicted,
        })
        .collect()
}

/// Returns `true` for hours in the night window (18:00-06:59).
#[must_use]
pub const fn is_night_hour(hour: u8) -> bool {
    hour >= NIGHT_START_HOUR || hour <= NIGHT_END_HOUR
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike as _, NaiveDate};
    use crime_forecast_models::day_name;

    use super::*;

    fn day(offset: u32, predicted: u64, risk: RiskLevel, hours: &[(u8, u64)]) -> DailyForecast {
        // 2024-04-01 is a Monday.
        let date = NaiveDate::from_ymd_opt(2024, 4, 1 + offset).unwrap();
        DailyForecast {
            date,
            day_of_week: day_name(date.weekday()).to_string(),
            predicted,
            hourly_breakdown: hours.iter().copied().collect(),
            risk_level: risk,
        }
    }

    fn ten_days(high: u32) -> Vec<DailyForecast> {
        (0..10)
            .map(|i| {
                let risk = if i < high {
                    RiskLevel::High
                } else {
                    RiskLevel::Low
                };
                day(i, 1, risk, &[(10, 1)])
            })
            .collect()
    }

    #[test]
    fn four_of_ten_high_days_is_high() {
        let insight = synthesize(&ten_days(4), 1_000);
        assert_eq!(insight.overall_risk, RiskLevel::High);
        assert_eq!(insight.recommendations[0], PATROL_RECOMMENDATION);
        assert_eq!(insight.recommendations[1], RESOURCE_RECOMMENDATION);
    }

    #[test]
    fn three_of_ten_high_days_is_medium() {
        assert_eq!(overall_risk(&ten_days(3)), RiskLevel::Medium);
        assert_eq!(overall_risk(&ten_days(2)), RiskLevel::Medium);
        assert_eq!(overall_risk(&ten_days(1)), RiskLevel::Low);
        assert_eq!(overall_risk(&[]), RiskLevel::Low);
    }

    #[test]
    fn totals_and_peak_days() {
        let days = vec![
            day(0, 3, RiskLevel::Low, &[]),
            day(1, 9, RiskLevel::High, &[]),
            day(2, 5, RiskLevel::Low, &[]),
            day(3, 9, RiskLevel::High, &[]),
        ];
        let insight = synthesize(&days, 1_000);
        assert_eq!(insight.total_predicted, 26);
        let dates: Vec<u32> = insight.peak_days.iter().map(|d| d.date.day()).collect();
        assert_eq!(dates, [2, 4, 3]);
        assert_eq!(insight.peak_days[0].day_of_week, "Tuesday");
    }

    #[test]
    fn peak_hour_ties_break_by_ascending_hour() {
        let days = vec![
            day(0, 6, RiskLevel::Low, &[(14, 2), (9, 2), (3, 1), (20, 1)]),
            day(1, 2, RiskLevel::Low, &[(20, 1), (3, 1)]),
        ];
        let peaks = peak_hours(&days);
        assert_eq!(
            peaks,
            [
                PeakHour { hour: 3, count: 2 },
                PeakHour { hour: 9, count: 2 },
                PeakHour { hour: 14, count: 2 },
            ]
        );
    }

    #[test]
    fn night_peak_triggers_night_recommendation() {
        let days = vec![day(0, 4, RiskLevel::Low, &[(23, 3), (12, 1)])];
        let insight = synthesize(&days, 1_000);
        assert_eq!(insight.recommendations, [NIGHT_RECOMMENDATION]);
    }

    #[test]
    fn weekend_peak_triggers_weekend_recommendation() {
        // Offset 4 is Friday 2024-04-05.
        let days = vec![
            day(0, 1, RiskLevel::Low, &[(12, 1)]),
            day(4, 8, RiskLevel::Low, &[(12, 8)]),
        ];
        let insight = synthesize(&days, 1_000);
        assert_eq!(insight.recommendations, [WEEKEND_RECOMMENDATION]);
    }

    #[test]
    fn large_forecast_triggers_awareness_recommendation() {
        let days = vec![day(0, 6, RiskLevel::Low, &[(12, 6)])];
        assert_eq!(
            synthesize(&days, 10).recommendations,
            [AWARENESS_RECOMMENDATION]
        );
        assert!(synthesize(&days, 12).recommendations.is_empty());
    }

    #[test]
    fn empty_forecast_has_no_insight() {
        let insight = synthesize(&[], 0);
        assert_eq!(insight.total_predicted, 0);
        assert_eq!(insight.overall_risk, RiskLevel::Low);
        assert!(insight.peak_hours.is_empty());
        assert!(insight.peak_days.is_empty());
        assert!(insight.recommendations.is_empty());
    }

    #[test]
    fn all_zero_forecast_has_no_peaks_or_recommendations() {
        // Offsets 4 and 5 are Friday and Saturday.
        let zero_hours: Vec<(u8, u64)> = (0..24).map(|h| (h, 0)).collect();
        let days: Vec<DailyForecast> = (0..7)
            .map(|i| day(i, 0, RiskLevel::Low, &zero_hours))
            .collect();
        let insight = synthesize(&days, 0);
        assert_eq!(insight.total_predicted, 0);
        assert!(insight.peak_hours.is_empty());
        assert!(insight.peak_days.is_empty());
        assert!(insight.recommendations.is_empty());
    }

    #[test]
    fn zero_count_hours_do_not_fill_peak_slots() {
        let days = vec![day(0, 2, RiskLevel::Low, &[(0, 0), (1, 0), (12, 2)])];
        assert_eq!(peak_hours(&days), [PeakHour { hour: 12, count: 2 }]);
        assert!(synthesize(&days, 1_000).recommendations.is_empty());
    }

    #[test]
    fn night_window_bounds() {
        assert!(is_night_hour(18));
        assert!(is_night_hour(0));
        assert!(is_night_hour(6));
        assert!(!is_night_hour(7));
        assert!(!is_night_hour(17));
    }
}
