//! Data types produced by the tile forecaster.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which model produced a predicted series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    /// Holt additive-trend exponential smoothing.
    Holt,
    /// Least-squares line against the day index.
    Linear,
    /// Last observation repeated.
    LastValue,
}

/// Predictions for one series, with the model that made them.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesForecast {
    pub values: Vec<f64>,
    pub model: ForecastModel,
}

/// Forecast for a single tile. Both prediction vectors have one entry per
/// day after `last_observed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileForecast {
    pub tile_lat: f64,
    pub tile_lon: f64,
    pub last_observed: NaiveDate,
    pub observed_days: usize,
    pub waste_count_pred: Vec<f64>,
    pub mass_pred: Vec<f64>,
    pub waste_count_model: ForecastModel,
    pub mass_model: ForecastModel,
}

/// Full forecast run, serialized as `forecasts.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub horizon_days: usize,
    /// Keyed by `"{tile_lat}_{tile_lon}"`.
    pub tiles: BTreeMap<String, TileForecast>,
}

/// Summary entry for the forecast index listing.
#[derive(Debug, Serialize)]
pub struct ForecastIndexEntry {
    pub tile: String,
    pub tile_lat: f64,
    pub tile_lon: f64,
    pub last_observed: NaiveDate,
    pub observed_days: usize,
    pub next_day_waste_count: Option<f64>,
    pub next_day_mass: Option<f64>,
}

/// Top-level index of all tile forecasts, served as `forecasts/tiles.json`.
#[derive(Debug, Serialize)]
pub struct ForecastIndex {
    pub generated_at: DateTime<Utc>,
    pub horizon_days: usize,
    pub tiles: Vec<ForecastIndexEntry>,
}
