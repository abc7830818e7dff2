#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the crime forecasting engine.
//!
//! Reads a JSON incident snapshot, runs one analysis and prints the result
//! as pretty JSON on stdout. Logs go to stderr via `RUST_LOG`.

mod commands;

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use crime_forecast::daily::DailyForecastParams;
use crime_forecast::history::HistoryFilter;
use crime_forecast::jitter::SeededJitter;
use crime_forecast_models::TimeWindow;
use crime_forecast_prediction::{HttpPredictionService, PredictionService, create_service_from_env};
use crime_forecast_server_models::{
    DEFAULT_FORECAST_DAYS, DEFAULT_INTENSITY, DEFAULT_RADIUS, DEFAULT_TREND_MONTHS,
    MAX_FORECAST_DAYS, MAX_TREND_MONTHS,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "crime_forecast", about = "Crime forecasting and risk-scoring tool")]
struct Cli {
    /// JSON snapshot of incident records
    #[arg(long, global = true, default_value = "data/incidents.json")]
    input: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly history with a linear projection
    Trend {
        /// Category to forecast (omit or "All" for every category)
        #[arg(long)]
        category: Option<String>,
        /// Exact location label to restrict to
        #[arg(long)]
        location: Option<String>,
        /// Months to project
        #[arg(long, default_value_t = DEFAULT_TREND_MONTHS,
              value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TREND_MONTHS)))]
        months: u32,
    },
    /// Per-day predictions with hourly breakdown and risk levels
    Daily {
        #[command(flatten)]
        forecast: ForecastArgs,
    },
    /// Peaks, overall risk and recommendations for the daily forecast
    Insights {
        #[command(flatten)]
        forecast: ForecastArgs,
    },
    /// Coordinate-rounded heat cells
    Heatmap {
        /// Look-back window (day, week, month, year, all)
        #[arg(long, default_value_t = TimeWindow::Month, value_parser = parse_window)]
        window: TimeWindow,
        /// Category filter, matched through the alias table
        #[arg(long)]
        category: Option<String>,
        /// Intensity dial, clamped to 1-10
        #[arg(long, default_value_t = DEFAULT_INTENSITY)]
        intensity: u8,
        /// Render radius passed through to the output
        #[arg(long, default_value_t = DEFAULT_RADIUS)]
        radius: u32,
    },
    /// Record counts and category breakdown of the snapshot
    Summary,
}

fn parse_window(value: &str) -> Result<TimeWindow, String> {
    value
        .parse()
        .map_err(|_| format!("unknown window '{value}' (expected day, week, month, year or all)"))
}

#[derive(clap::Args)]
struct ForecastArgs {
    /// Category to forecast (omit or "All" for every category)
    #[arg(long)]
    category: Option<String>,
    /// Days to forecast
    #[arg(long, default_value_t = DEFAULT_FORECAST_DAYS,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_FORECAST_DAYS)))]
    days: u32,
    /// Seed for the daily jitter (defaults to the clock)
    #[arg(long)]
    seed: Option<u64>,
    /// Skip the prediction service even if `ML_SERVICE_URL` is set
    #[arg(long)]
    offline: bool,
}

impl ForecastArgs {
    fn params(&self) -> DailyForecastParams {
        DailyForecastParams {
            days: self.days,
            category: self.category.clone(),
            start: Utc::now().date_naive(),
        }
    }

    fn jitter(&self) -> SeededJitter {
        self.seed
            .map_or_else(SeededJitter::from_clock, SeededJitter::from_seed)
    }

    fn service(&self) -> Option<HttpPredictionService> {
        if self.offline {
            return None;
        }
        create_service_from_env()
            .inspect_err(|e| log::warn!("Prediction service disabled: {e}"))
            .ok()
            .flatten()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let records = commands::load(&cli.input)?;

    let output: Value = match cli.command {
        Commands::Trend {
            category,
            location,
            months,
        } => {
            let filter = HistoryFilter { category, location };
            commands::trend(&records, &filter, months, Utc::now().date_naive())?
        }
        Commands::Daily { forecast } => {
            let service = forecast.service();
            let mut jitter = forecast.jitter();
            commands::daily(
                service.as_ref().map(|s| s as &dyn PredictionService),
                &records,
                &forecast.params(),
                &mut jitter,
            )
            .await?
        }
        Commands::Insights { forecast } => {
            let service = forecast.service();
            let mut jitter = forecast.jitter();
            commands::insights(
                service.as_ref().map(|s| s as &dyn PredictionService),
                &records,
                &forecast.params(),
                &mut jitter,
            )
            .await?
        }
        Commands::Heatmap {
            window,
            category,
            intensity,
            radius,
        } => commands::heatmap(&records, window, category, intensity, radius, Utc::now())?,
        Commands::Summary => serde_json::to_value(commands::summary(&records))?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
