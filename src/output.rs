//! Output formatting and persistence for aggregates and forecasts.
//!
//! Aggregates go to CSV (optionally gzip-compressed), forecasts to JSON.

use anyhow::{Context, Result, bail};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::tiles::DailyAggregate;

/// Columns a daily aggregate table must carry to be forecast.
pub const AGGREGATE_COLUMNS: [&str; 5] =
    ["tile_lat", "tile_lon", "date", "waste_count", "total_mass"];

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes aggregate rows as CSV with a header to `writer`.
pub fn write_aggregates_to<W: Write>(writer: W, rows: &[DailyAggregate]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes aggregate rows to a fresh CSV file, replacing any existing one.
/// A `.gz` path is gzip-compressed.
#[tracing::instrument(skip_all, fields(path = %path.display(), rows = rows.len()))]
pub fn write_aggregates(path: &Path, rows: &[DailyAggregate]) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;

    if is_gzip(path) {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_aggregates_to(&mut encoder, rows)?;
        encoder.finish()?;
    } else {
        write_aggregates_to(file, rows)?;
    }

    debug!("Aggregates written");
    Ok(())
}

/// Reads a daily aggregate table back from any CSV source.
///
/// # Errors
///
/// Fails when one of [`AGGREGATE_COLUMNS`] is missing or a row cannot be
/// parsed.
pub fn read_aggregates_from<R: Read>(reader: R) -> Result<Vec<DailyAggregate>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<&str> = AGGREGATE_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        bail!("aggregate CSV is missing required column(s): {}", missing.join(", "));
    }

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: DailyAggregate = result?;
        rows.push(record);
    }

    Ok(rows)
}

/// Reads a daily aggregate CSV file. A `.gz` path is decompressed.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_aggregates(path: &Path) -> Result<Vec<DailyAggregate>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let rows = if is_gzip(path) {
        read_aggregates_from(GzDecoder::new(file))
    } else {
        read_aggregates_from(file)
    }
    .with_context(|| format!("reading aggregates from {}", path.display()))?;

    debug!(rows = rows.len(), "Aggregates loaded");
    Ok(rows)
}

/// Serializes `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    create_parent(path)?;
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
