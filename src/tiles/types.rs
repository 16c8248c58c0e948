//! Data types produced by the tile aggregator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tiles::key::TileKey;

/// One `(tile, date)` bucket of telemetry, reduced to its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub tile_lat: f64,
    pub tile_lon: f64,
    pub date: NaiveDate,
    pub waste_count: u64,
    pub total_mass: f64,
    /// `None` when no row in the bucket carried a numeric TDS reading.
    pub avg_tds: Option<f64>,
    /// Sum of per-row severity weights. Older aggregate files lack it.
    #[serde(default)]
    pub weighted_count: u64,
}

impl DailyAggregate {
    pub fn tile(&self) -> TileKey {
        TileKey::new(self.tile_lat, self.tile_lon)
    }
}

/// Rows discarded before bucketing, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub bad_coordinates: usize,
    pub bad_timestamp: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.bad_coordinates + self.bad_timestamp
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    /// One row per bucket, ordered by tile then date.
    pub rows: Vec<DailyAggregate>,
    pub dropped: DropCounts,
    pub input_rows: usize,
}

/// Event and mass totals for one day across every tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub tiles: usize,
    pub waste_count: u64,
    pub weighted_count: u64,
    pub total_mass: f64,
}
