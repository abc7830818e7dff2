//! Model-first daily forecasting with a statistical fallback.

use std::collections::BTreeMap;

use chrono::Datelike as _;
use crime_forecast::ForecastError;
use crime_forecast::daily::{
    DailyForecastParams, baseline_rate, classify_risk, forecast_daily, hourly_breakdown,
};
use crime_forecast::history::{ALL_CATEGORIES, is_all_categories, matches_category, pattern_tables};
use crime_forecast::jitter::JitterSource;
use crime_forecast::trend::clamp_round;
use crime_forecast_models::{
    DailyForecast, DailyForecastSet, ForecastSource, IncidentRecord, PatternTables, RiskLevel,
    day_name,
};

use crate::{ModelDay, PredictionError, PredictionService};

/// Forecasts with the prediction service when one is configured, falling
/// back to the pattern-based forecaster on any service failure.
///
/// The service failure itself is only logged.
///
/// # Errors
///
/// Returns [`ForecastError`] only from the statistical path:
/// `DataUnavailable` for an empty snapshot, `InsufficientData` for too few
/// qualifying records.
pub async fn forecast_with_fallback(
    service: Option<&dyn PredictionService>,
    records: &[IncidentRecord],
    params: &DailyForecastParams,
    jitter: &mut dyn JitterSource,
) -> Result<(DailyForecastSet, ForecastSource), ForecastError> {
    if records.is_empty() {
        return Err(ForecastError::DataUnavailable {
            message: "the incident snapshot is empty".to_string(),
        });
    }

    if let Some(service) = service {
        let category = params
            .category
            .as_deref()
            .filter(|c| !is_all_categories(Some(*c)))
            .unwrap_or(ALL_CATEGORIES);
        let tables = pattern_tables(
            records
                .iter()
                .filter(|r| matches_category(r, params.category.as_deref())),
        );

        match service
            .predict(category, params.days)
            .await
            .and_then(|days| model_forecast(days, &tables, params.days))
        {
            Ok(set) => return Ok((set, ForecastSource::Model)),
            Err(e) => log::warn!("Prediction service unavailable, using statistical forecast: {e}"),
        }
    }

    forecast_daily(records, params, jitter).map(|set| (set, ForecastSource::Statistical))
}

/// Converts service predictions into a [`DailyForecastSet`].
///
/// Missing day names are derived from the date, missing or unknown risk
/// levels are classified against the historical baseline, and missing
/// hourly breakdowns, or ones that do not add up to the day's count within
/// one, are synthesized from the historical hour-of-day tallies. At most
/// `horizon` days are kept.
///
/// # Errors
///
/// Returns [`PredictionError::InvalidResponse`] if there are no days, a
/// count is negative or not finite, or an hourly breakdown names an hour
/// outside 0-23.
pub fn model_forecast(
    mut days: Vec<ModelDay>,
    tables: &PatternTables,
    horizon: u32,
) -> Result<DailyForecastSet, PredictionError> {
    days.sort_by_key(|d| d.date);
    days.truncate(usize::try_from(horizon).unwrap_or(usize::MAX));

    if days.is_empty() {
        return Err(PredictionError::InvalidResponse {
            message: "no predictions returned".to_string(),
        });
    }

    let baseline = if tables.total == 0 {
        0.0
    } else {
        baseline_rate(tables)
    };

    let days = days
        .into_iter()
        .map(|day| model_day(day, tables, baseline))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DailyForecastSet {
        days,
        baseline_rate: baseline,
        historical_total: tables.total,
    })
}

fn model_day(
    day: ModelDay,
    tables: &PatternTables,
    baseline: f64,
) -> Result<DailyForecast, PredictionError> {
    if !day.predicted.is_finite() || day.predicted < 0.0 {
        return Err(PredictionError::InvalidResponse {
            message: format!("invalid prediction {} for {}", day.predicted, day.date),
        });
    }
    let predicted = clamp_round(day.predicted);

    let risk_level = day
        .risk_level
        .as_deref()
        .and_then(|r| r.trim().parse::<RiskLevel>().ok())
        .unwrap_or_else(|| classify_risk(day.predicted, baseline));

    let hourly_breakdown = match day.hourly_breakdown {
        Some(hours) => {
            if let Some((hour, count)) = hours
                .iter()
                .find(|&(&hour, &count)| hour >= 24 || !count.is_finite() || count < 0.0)
            {
                return Err(PredictionError::InvalidResponse {
                    message: format!(
                        "invalid hourly count {count} at hour {hour} for {}",
                        day.date
                    ),
                });
            }
            let hours: BTreeMap<u8, u64> = hours
                .into_iter()
                .map(|(hour, count)| (hour, clamp_round(count)))
                .collect();
            if hours.values().sum::<u64>().abs_diff(predicted) > 1 {
                log::debug!(
                    "Hourly breakdown for {} does not add up to {predicted}, rebuilding it",
                    day.date
                );
                hourly_breakdown(predicted, tables)
            } else {
                hours
            }
        }
        None => hourly_breakdown(predicted, tables),
    };

    Ok(DailyForecast {
        date: day.date,
        day_of_week: day
            .day_of_week
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| day_name(day.date.weekday()).to_string()),
        predicted,
        hourly_breakdown,
        risk_level,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{NaiveDate, TimeZone as _, Utc};
    use crime_forecast::jitter::ConstantJitter;

    use super::*;
    use crate::{ModelStatus, TrainingReport};

    struct FakeService {
        predictions: Option<Vec<ModelDay>>,
        asked: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn new(predictions: Option<Vec<ModelDay>>) -> Self {
            Self {
                predictions,
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl PredictionService for FakeService {
        async fn predict(
            &self,
            category: &str,
            _days: u32,
        ) -> Result<Vec<ModelDay>, PredictionError> {
            self.asked.lock().unwrap().push(category.to_string());
            self.predictions
                .clone()
                .ok_or_else(|| PredictionError::Service {
                    message: "connection refused".to_string(),
                })
        }

        async fn status(&self) -> Result<ModelStatus, PredictionError> {
            Ok(ModelStatus::default())
        }

        async fn train(
            &self,
            _records: &[IncidentRecord],
        ) -> Result<TrainingReport, PredictionError> {
            Ok(TrainingReport::default())
        }
    }

    fn fortnight() -> Vec<IncidentRecord> {
        (1..=14)
            .map(|d| IncidentRecord {
                id: d.to_string(),
                category: "Theft".to_string(),
                location: String::new(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).single(),
                status: None,
                geo: None,
            })
            .collect()
    }

    fn params(category: Option<&str>) -> DailyForecastParams {
        DailyForecastParams {
            days: 3,
            category: category.map(ToString::to_string),
            start: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        }
    }

    fn predicted_day(date: &str, predicted: f64, risk: Option<&str>) -> ModelDay {
        ModelDay {
            date: date.parse().unwrap(),
            day_of_week: None,
            predicted,
            risk_level: risk.map(ToString::to_string),
            hourly_breakdown: None,
        }
    }

    #[tokio::test]
    async fn no_service_uses_statistical_forecast() {
        let (set, source) =
            forecast_with_fallback(None, &fortnight(), &params(None), &mut ConstantJitter::NONE)
                .await
                .unwrap();
        assert_eq!(source, ForecastSource::Statistical);
        let expected =
            forecast_daily(&fortnight(), &params(None), &mut ConstantJitter::NONE).unwrap();
        assert_eq!(set, expected);
    }

    #[tokio::test]
    async fn failing_service_falls_back() {
        let service = FakeService::new(None);
        let (set, source) = forecast_with_fallback(
            Some(&service),
            &fortnight(),
            &params(Some("All")),
            &mut ConstantJitter::NONE,
        )
        .await
        .unwrap();
        assert_eq!(source, ForecastSource::Statistical);
        assert_eq!(set.days.len(), 3);
        assert_eq!(*service.asked.lock().unwrap(), ["All"]);
    }

    #[tokio::test]
    async fn model_predictions_are_completed_locally() {
        let service = FakeService::new(Some(vec![
            predicted_day("2024-02-02", 5.0, None),
            predicted_day("2024-02-01", 2.4, Some("medium")),
        ]));
        let (set, source) = forecast_with_fallback(
            Some(&service),
            &fortnight(),
            &params(Some("Theft")),
            &mut ConstantJitter::NONE,
        )
        .await
        .unwrap();

        assert_eq!(source, ForecastSource::Model);
        assert_eq!(*service.asked.lock().unwrap(), ["Theft"]);
        assert_eq!(set.historical_total, 14);

        let first = &set.days[0];
        assert_eq!(first.date.to_string(), "2024-02-01");
        assert_eq!(first.day_of_week, "Thursday");
        assert_eq!(first.predicted, 2);
        assert_eq!(first.risk_level, RiskLevel::Medium);

        let second = &set.days[1];
        assert_eq!(second.predicted, 5);
        assert_eq!(second.risk_level, RiskLevel::High);
        assert_eq!(second.hourly_breakdown.values().sum::<u64>(), 5);
    }

    #[tokio::test]
    async fn invalid_model_output_falls_back() {
        let service = FakeService::new(Some(vec![predicted_day("2024-02-01", -3.0, None)]));
        let (_, source) = forecast_with_fallback(
            Some(&service),
            &fortnight(),
            &params(None),
            &mut ConstantJitter::NONE,
        )
        .await
        .unwrap();
        assert_eq!(source, ForecastSource::Statistical);
    }

    #[tokio::test]
    async fn empty_snapshot_is_unavailable_even_with_a_service() {
        let service = FakeService::new(Some(vec![predicted_day("2024-02-01", 1.0, None)]));
        let err = forecast_with_fallback(
            Some(&service),
            &[],
            &params(None),
            &mut ConstantJitter::NONE,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable { .. }));
        assert!(service.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_hours_fall_back() {
        let mut day = predicted_day("2024-02-01", 3.0, None);
        day.hourly_breakdown = Some(BTreeMap::from([(30, 3.0), (200, 7.0)]));
        let service = FakeService::new(Some(vec![day]));
        let (set, source) = forecast_with_fallback(
            Some(&service),
            &fortnight(),
            &params(None),
            &mut ConstantJitter::NONE,
        )
        .await
        .unwrap();
        assert_eq!(source, ForecastSource::Statistical);
        assert!(set.days.iter().all(|d| d.hourly_breakdown.keys().all(|&h| h < 24)));
    }

    #[test]
    fn negative_hourly_count_is_rejected() {
        let mut day = predicted_day("2024-02-01", 3.0, None);
        day.hourly_breakdown = Some(BTreeMap::from([(1, -1.0), (2, 4.0)]));
        let err = model_forecast(vec![day], &PatternTables::default(), 1).unwrap_err();
        assert!(matches!(err, PredictionError::InvalidResponse { .. }));
    }

    #[test]
    fn mismatched_hourly_total_is_rebuilt() {
        let tables = pattern_tables(&fortnight());
        let mut day = predicted_day("2024-02-01", 3.0, None);
        day.hourly_breakdown = Some(BTreeMap::from([(12, 9.0)]));
        let set = model_forecast(vec![day], &tables, 1).unwrap();
        let hours = &set.days[0].hourly_breakdown;
        assert_eq!(hours.len(), 24);
        assert_eq!(hours.values().sum::<u64>(), 3);
    }

    #[test]
    fn close_hourly_total_is_kept() {
        let mut day = predicted_day("2024-02-01", 3.0, None);
        day.hourly_breakdown = Some(BTreeMap::from([(21, 2.0), (22, 2.0)]));
        let set = model_forecast(vec![day], &PatternTables::default(), 1).unwrap();
        assert_eq!(
            set.days[0].hourly_breakdown,
            BTreeMap::from([(21, 2), (22, 2)])
        );
    }

    #[test]
    fn horizon_truncates_model_days() {
        let tables = pattern_tables(&fortnight());
        let days = (1..=5)
            .map(|d| predicted_day(&format!("2024-02-0{d}"), 1.0, None))
            .collect();
        let set = model_forecast(days, &tables, 2).unwrap();
        assert_eq!(set.days.len(), 2);
    }
}
