use crate::telemetry::TelemetryRecord;
use crate::tiles::key::{MAX_PRECISION, TileKey};
use crate::tiles::severity::severity_weight;
use crate::tiles::types::{AggregateOutcome, DailyAggregate, DailyTotal, DropCounts};
use crate::tiles::utility::{mean, stable_sum};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Default)]
struct Bucket {
    count: u64,
    weight: u64,
    masses: Vec<f64>,
    tds: Vec<f64>,
}

/// Buckets telemetry rows into `(tile, UTC date)` groups and reduces each
/// group to its count, total mass and mean TDS.
///
/// Rows with unusable coordinates or timestamps are dropped and counted in
/// [`AggregateOutcome::dropped`]. A missing or non-numeric mass counts as
/// zero; a missing or non-numeric TDS is left out of the mean.
///
/// # Errors
///
/// Only an out-of-range `tile_precision` is an error.
pub fn aggregate(records: &[TelemetryRecord], tile_precision: u32) -> Result<AggregateOutcome> {
    if tile_precision > MAX_PRECISION {
        bail!("tile precision {tile_precision} exceeds the maximum of {MAX_PRECISION}");
    }

    let mut buckets: BTreeMap<(TileKey, NaiveDate), Bucket> = BTreeMap::new();
    let mut dropped = DropCounts::default();

    for record in records {
        let (Some(lat), Some(lon)) = (record.latitude(), record.longitude()) else {
            dropped.bad_coordinates += 1;
            continue;
        };
        let Some(ts) = record.timestamp() else {
            dropped.bad_timestamp += 1;
            continue;
        };

        let tile = TileKey::from_coords(lat, lon, tile_precision)?;
        let bucket = buckets.entry((tile, ts.date_naive())).or_default();

        bucket.count += 1;
        bucket.weight += severity_weight(record.waste_category.as_deref());
        bucket.masses.push(record.mass_grams().unwrap_or(0.0));
        if let Some(tds) = record.tds() {
            bucket.tds.push(tds);
        }
    }

    if dropped.total() > 0 {
        warn!(
            bad_coordinates = dropped.bad_coordinates,
            bad_timestamp = dropped.bad_timestamp,
            "Dropped telemetry rows"
        );
    }

    let rows: Vec<DailyAggregate> = buckets
        .into_iter()
        .map(|((tile, date), b)| DailyAggregate {
            tile_lat: tile.lat,
            tile_lon: tile.lon,
            date,
            waste_count: b.count,
            total_mass: stable_sum(&b.masses),
            avg_tds: mean(&b.tds),
            weighted_count: b.weight,
        })
        .collect();

    debug!(
        input_rows = records.len(),
        buckets = rows.len(),
        tile_precision,
        "Aggregation complete"
    );

    Ok(AggregateOutcome {
        rows,
        dropped,
        input_rows: records.len(),
    })
}

/// Rolls tile-level aggregates up into one total per day.
pub fn daily_totals(rows: &[DailyAggregate]) -> Vec<DailyTotal> {
    let mut by_date: BTreeMap<NaiveDate, (usize, u64, u64, Vec<f64>)> = BTreeMap::new();

    for row in rows {
        let entry = by_date.entry(row.date).or_default();
        entry.0 += 1;
        entry.1 += row.waste_count;
        entry.2 += row.weighted_count;
        entry.3.push(row.total_mass);
    }

    by_date
        .into_iter()
        .map(|(date, (tiles, waste_count, weighted_count, masses))| DailyTotal {
            date,
            tiles,
            waste_count,
            weighted_count,
            total_mass: stable_sum(&masses),
        })
        .collect()
}
