//! Short-horizon forecasting of per-tile daily series.
//!
//! Each tile's `waste_count` and `total_mass` series is projected forward
//! with Holt exponential smoothing. When the smoother cannot be fitted the
//! series falls back to a least-squares line, and a single observation is
//! simply repeated.

pub mod holt;
pub mod linear;
pub mod types;

pub use holt::HoltLinear;
pub use linear::LinearTrend;
pub use types::{
    ForecastIndex, ForecastIndexEntry, ForecastModel, ForecastReport, SeriesForecast,
    TileForecast,
};

use crate::tiles::{DailyAggregate, TileKey};
use anyhow::{Result, bail};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

/// Version of the JSON layout written by [`ForecastReport`].
pub const SCHEMA_VERSION: u8 = 1;

/// Common trait for the series models.
pub trait Predictor {
    /// Fit the model to historical data
    fn fit(&mut self, data: &[f64]) -> Result<()>;

    /// Predict `steps` values following the fitted data
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;

    fn is_fitted(&self) -> bool;
}

fn fit_and_predict<P: Predictor>(mut model: P, series: &[f64], horizon: usize) -> Result<Vec<f64>> {
    model.fit(series)?;
    model.predict(horizon)
}

/// Projects `series` forward by `horizon` steps.
///
/// Never fails: a smoothing failure falls back to a line, and fewer than two
/// points fall back to repeating the last one. Returns `None` only for an
/// empty series.
pub fn forecast_series(series: &[f64], horizon: usize) -> Option<SeriesForecast> {
    let last = *series.last()?;

    let (values, model) = match fit_and_predict(HoltLinear::new(), series, horizon) {
        Ok(values) => (values, ForecastModel::Holt),
        Err(holt_err) => {
            debug!(error = %holt_err, len = series.len(), "Smoothing unavailable, fitting a line");
            match fit_and_predict(LinearTrend::new(), series, horizon) {
                Ok(values) => (values, ForecastModel::Linear),
                Err(line_err) => {
                    debug!(error = %line_err, "Line unavailable, repeating last value");
                    (vec![last; horizon], ForecastModel::LastValue)
                }
            }
        }
    };

    Some(SeriesForecast { values, model })
}

/// Forecasts every tile in `aggregates` `horizon_days` ahead.
///
/// # Errors
///
/// Fails when two rows share the same tile and date, which means the table
/// did not come from a single aggregation run.
pub fn forecast_tiles(
    aggregates: &[DailyAggregate],
    horizon_days: usize,
) -> Result<BTreeMap<TileKey, TileForecast>> {
    let mut by_tile: BTreeMap<TileKey, Vec<&DailyAggregate>> = BTreeMap::new();
    for row in aggregates {
        by_tile.entry(row.tile()).or_default().push(row);
    }

    let mut out = BTreeMap::new();

    for (tile, mut rows) in by_tile {
        rows.sort_by_key(|r| r.date);
        if let Some(pair) = rows.windows(2).find(|w| w[0].date == w[1].date) {
            bail!("duplicate aggregate row for tile {tile} on {}", pair[0].date);
        }

        let wc_series: Vec<f64> = rows.iter().map(|r| r.waste_count as f64).collect();
        let mass_series: Vec<f64> = rows.iter().map(|r| r.total_mass).collect();

        let (Some(wc), Some(mass), Some(last)) = (
            forecast_series(&wc_series, horizon_days),
            forecast_series(&mass_series, horizon_days),
            rows.last(),
        ) else {
            continue;
        };

        debug!(
            %tile,
            observed_days = rows.len(),
            waste_count_model = ?wc.model,
            mass_model = ?mass.model,
            "Tile forecast"
        );

        out.insert(
            tile,
            TileForecast {
                tile_lat: tile.lat,
                tile_lon: tile.lon,
                last_observed: last.date,
                observed_days: rows.len(),
                waste_count_pred: wc.values,
                mass_pred: mass.values,
                waste_count_model: wc.model,
                mass_model: mass.model,
            },
        );
    }

    Ok(out)
}

impl ForecastReport {
    pub fn new(forecasts: BTreeMap<TileKey, TileForecast>, horizon_days: usize) -> Self {
        ForecastReport {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            horizon_days,
            tiles: forecasts
                .into_iter()
                .map(|(key, f)| (key.to_string(), f))
                .collect(),
        }
    }

    /// Builds the homepage index listing every tile's next-day outlook.
    pub fn index(&self) -> ForecastIndex {
        ForecastIndex {
            generated_at: self.generated_at,
            horizon_days: self.horizon_days,
            tiles: self
                .tiles
                .iter()
                .map(|(key, f)| ForecastIndexEntry {
                    tile: key.clone(),
                    tile_lat: f.tile_lat,
                    tile_lon: f.tile_lon,
                    last_observed: f.last_observed,
                    observed_days: f.observed_days,
                    next_day_waste_count: f.waste_count_pred.first().copied(),
                    next_day_mass: f.mass_pred.first().copied(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(lat: f64, lon: f64, day: u32, count: u64, mass: f64) -> DailyAggregate {
        DailyAggregate {
            tile_lat: lat,
            tile_lon: lon,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            waste_count: count,
            total_mass: mass,
            avg_tds: None,
            weighted_count: count,
        }
    }

    #[test]
    fn test_single_observation_repeats() {
        let f = forecast_series(&[10.0], 3).unwrap();
        assert_eq!(f.values, vec![10.0, 10.0, 10.0]);
        assert_eq!(f.model, ForecastModel::LastValue);
    }

    #[test]
    fn test_two_observations_use_line() {
        let f = forecast_series(&[10.0, 20.0], 2).unwrap();
        assert_eq!(f.values, vec![30.0, 40.0]);
        assert_eq!(f.model, ForecastModel::Linear);
    }

    #[test]
    fn test_longer_series_uses_smoothing() {
        let f = forecast_series(&[2.0, 4.0, 6.0, 8.0], 7).unwrap();
        assert_eq!(f.model, ForecastModel::Holt);
        assert_eq!(f.values.len(), 7);
    }

    #[test]
    fn test_non_finite_series_falls_back_without_error() {
        let f = forecast_series(&[1.0, f64::INFINITY, 3.0], 2).unwrap();
        assert_ne!(f.model, ForecastModel::Holt);
        assert_eq!(f.values.len(), 2);
    }

    #[test]
    fn test_empty_series() {
        assert!(forecast_series(&[], 5).is_none());
    }

    #[test]
    fn test_every_tile_gets_horizon_length_predictions() {
        let rows = vec![
            row(22.571, 88.364, 1, 3, 100.0),
            row(22.571, 88.364, 2, 5, 120.0),
            row(22.571, 88.364, 3, 4, 90.0),
            row(22.571, 88.364, 4, 6, 130.0),
            row(10.0, 20.0, 1, 10, 50.0),
        ];

        let out = forecast_tiles(&rows, 7).unwrap();

        assert_eq!(out.len(), 2);
        for f in out.values() {
            assert_eq!(f.waste_count_pred.len(), 7);
            assert_eq!(f.mass_pred.len(), 7);
        }

        let single = &out[&TileKey::new(10.0, 20.0)];
        assert_eq!(single.waste_count_pred, vec![10.0; 7]);
        assert_eq!(single.mass_pred, vec![50.0; 7]);
        assert_eq!(single.observed_days, 1);
    }

    #[test]
    fn test_rows_are_sorted_by_date_before_fitting() {
        let rows = vec![
            row(1.0, 1.0, 2, 20, 0.0),
            row(1.0, 1.0, 1, 10, 0.0),
        ];

        let out = forecast_tiles(&rows, 1).unwrap();
        let f = &out[&TileKey::new(1.0, 1.0)];

        assert_eq!(f.waste_count_pred, vec![30.0]);
        assert_eq!(f.last_observed, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_duplicate_bucket_is_an_error() {
        let rows = vec![row(1.0, 1.0, 1, 1, 0.0), row(1.0, 1.0, 1, 2, 0.0)];
        assert!(forecast_tiles(&rows, 3).is_err());
    }

    #[test]
    fn test_empty_table_gives_no_forecasts() {
        assert!(forecast_tiles(&[], 7).unwrap().is_empty());
    }

    #[test]
    fn test_report_index() {
        let rows = vec![row(1.0, 2.0, 1, 4, 8.0)];
        let report = ForecastReport::new(forecast_tiles(&rows, 2).unwrap(), 2);

        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert!(report.tiles.contains_key("1.0_2.0"));

        let index = report.index();
        assert_eq!(index.tiles.len(), 1);
        assert_eq!(index.tiles[0].next_day_waste_count, Some(4.0));
        assert_eq!(index.tiles[0].next_day_mass, Some(8.0));
    }
}
