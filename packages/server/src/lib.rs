#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the crime forecasting engine.
//!
//! Every request re-reads the incident snapshot from the record supplier
//! and recomputes its answer from scratch; nothing is cached between
//! requests. Daily forecasts prefer the optional prediction service and
//! fall back to the statistical forecaster.

mod error;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use crime_forecast::jitter::SeededJitter;
use crime_forecast_ingest::{JsonFileSupplier, RecordSupplier};
use crime_forecast_prediction::{PredictionService, create_service_from_env};

pub use error::ApiError;

/// Snapshot path used when `INCIDENTS_PATH` is unset.
pub const DEFAULT_INCIDENTS_PATH: &str = "data/incidents.json";

/// Shared application state.
pub struct AppState {
    /// Where incident records come from.
    pub supplier: Arc<dyn RecordSupplier>,
    /// Optional machine-learning prediction service.
    pub prediction: Option<Arc<dyn PredictionService>>,
    /// Fixed jitter seed. `None` seeds every request from the clock.
    pub seed: Option<u64>,
}

impl AppState {
    /// Jitter source for one daily forecast.
    #[must_use]
    pub fn jitter(&self) -> SeededJitter {
        self.seed
            .map_or_else(SeededJitter::from_clock, SeededJitter::from_seed)
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/forecast/trend", web::get().to(handlers::trend))
            .route("/forecast/daily", web::get().to(handlers::daily))
            .route("/forecast/insights", web::get().to(handlers::insights))
            .route("/heatmap", web::get().to(handlers::heatmap))
            .route("/model/status", web::get().to(handlers::model_status))
            .route("/model/train", web::post().to(handlers::train)),
    );
}

/// Starts the forecast API server.
///
/// Reads its configuration from the environment (`BIND_ADDR`, `PORT`,
/// `INCIDENTS_PATH`, `FORECAST_SEED`, and the prediction service's
/// `ML_SERVICE_URL` / `ML_SERVICE_TIMEOUT_MS`). The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let incidents_path = std::env::var("INCIDENTS_PATH")
        .map_or_else(|_| PathBuf::from(DEFAULT_INCIDENTS_PATH), PathBuf::from);
    log::info!("Reading incidents from {}", incidents_path.display());

    let prediction: Option<Arc<dyn PredictionService>> = match create_service_from_env() {
        Ok(service) => service.map(|s| Arc::new(s) as Arc<dyn PredictionService>),
        Err(e) => {
            log::error!("Prediction service disabled: {e}");
            None
        }
    };

    let seed = std::env::var("FORECAST_SEED").ok().and_then(|s| {
        s.trim()
            .parse::<u64>()
            .inspect_err(|e| log::warn!("Ignoring FORECAST_SEED '{s}': {e}"))
            .ok()
    });
    if let Some(seed) = seed {
        log::info!("Daily forecast jitter pinned to seed {seed}");
    }

    let state = web::Data::new(AppState {
        supplier: Arc::new(JsonFileSupplier::new(incidents_path)),
        prediction,
        seed,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
