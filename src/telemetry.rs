//! Raw telemetry rows as written by the field devices.
//!
//! Values are kept as the raw text found in the file; numeric coercion is
//! done on demand so callers can tell "zero" apart from "missing".

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Column order of the canonical telemetry CSV.
pub const CANONICAL_HEADER: [&str; 22] = [
    "timestamp_utc",
    "device_id",
    "boat_id",
    "lat",
    "lon",
    "heading_deg",
    "mq135_ppm",
    "mq2_ppm",
    "soil_dry_belt_pct",
    "soil_wet_belt_pct",
    "loadcell_grams",
    "tds_ppm",
    "ultrasonic_cm",
    "proximity_inductive",
    "image_path",
    "yolo_raw",
    "waste_category",
    "waste_subtype",
    "collection_event",
    "collection_bin_id",
    "battery_volt",
    "rssi",
];

/// Columns without which a telemetry table cannot be aggregated at all.
pub const REQUIRED_COLUMNS: [&str; 3] = ["timestamp_utc", "lat", "lon"];

/// The subset of a telemetry row consumed by the tile aggregator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TelemetryRecord {
    #[serde(default)]
    pub timestamp_utc: Option<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub waste_category: Option<String>,
    #[serde(default)]
    pub loadcell_grams: Option<String>,
    #[serde(default)]
    pub tds_ppm: Option<String>,
}

impl TelemetryRecord {
    pub fn latitude(&self) -> Option<f64> {
        self.lat.as_deref().and_then(coerce_number)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.lon.as_deref().and_then(coerce_number)
    }

    pub fn mass_grams(&self) -> Option<f64> {
        self.loadcell_grams.as_deref().and_then(coerce_number)
    }

    pub fn tds(&self) -> Option<f64> {
        self.tds_ppm.as_deref().and_then(coerce_number)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_utc.as_deref().and_then(parse_timestamp)
    }
}

/// Best-effort numeric coercion. Empty, non-numeric and non-finite text
/// all come back as `None`.
pub fn coerce_number(text: &str) -> Option<f64> {
    let v: f64 = text.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

/// Parses the timestamp formats seen in device uploads. Offsets are
/// converted to UTC; naive values are taken to already be UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads telemetry rows from a CSV file. Files ending in `.gz` are
/// decompressed on the fly.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_telemetry(path: &Path) -> Result<Vec<TelemetryRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let records = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        read_telemetry_from(GzDecoder::new(file))
    } else {
        read_telemetry_from(file)
    }
    .with_context(|| format!("reading telemetry from {}", path.display()))?;

    debug!(rows = records.len(), "Telemetry loaded");
    Ok(records)
}

/// Reads telemetry rows from any CSV source with a header line.
///
/// # Errors
///
/// Fails when one of [`REQUIRED_COLUMNS`] is missing from the header, or when
/// the CSV itself is malformed. Bad values inside a row are not errors.
pub fn read_telemetry_from<R: Read>(reader: R) -> Result<Vec<TelemetryRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        bail!("telemetry CSV is missing required column(s): {}", missing.join(", "));
    }

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: TelemetryRecord = result?;
        rows.push(record);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number("12.5"), Some(12.5));
        assert_eq!(coerce_number("  7 "), Some(7.0));
        assert_eq!(coerce_number("0"), Some(0.0));
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("abc"), None);
        assert_eq!(coerce_number("NaN"), None);
        assert_eq!(coerce_number("inf"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-01-01 10:15:00").unwrap();
        assert_eq!((a.year(), a.month(), a.day(), a.hour()), (2024, 1, 1, 10));

        let b = parse_timestamp("2024-01-01T10:15:00.250").unwrap();
        assert_eq!(b.minute(), 15);

        let c = parse_timestamp("2024-01-01").unwrap();
        assert_eq!(c.hour(), 0);

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_parse_timestamp_converts_offset_to_utc() {
        // 02:00 at +05:30 is still the previous UTC day
        let ts = parse_timestamp("2024-01-02T02:00:00+05:30").unwrap();
        assert_eq!(ts.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_read_canonical_header() {
        let mut csv = CANONICAL_HEADER.join(",");
        csv.push('\n');
        csv.push_str(
            "2024-01-01 08:00:00,esp-1,boat-1,22.5711,88.3639,90,1,2,3,4,100,350,10,0,img.jpg,plastic:0.8,dry,plastic,1,bin-1,3.7,-60\n",
        );

        let rows = read_telemetry_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].latitude(), Some(22.5711));
        assert_eq!(rows[0].mass_grams(), Some(100.0));
        assert_eq!(rows[0].tds(), Some(350.0));
        assert_eq!(rows[0].waste_category.as_deref(), Some("dry"));
    }

    #[test]
    fn test_read_missing_required_column() {
        let csv = "timestamp_utc,lat,loadcell_grams\n2024-01-01,22.5,10\n";
        let err = read_telemetry_from(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("lon"));
    }

    #[test]
    fn test_read_optional_columns_absent() {
        let csv = "timestamp_utc,lat,lon\n2024-01-01,22.5,88.3\n";
        let rows = read_telemetry_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mass_grams(), None);
        assert_eq!(rows[0].tds(), None);
        assert_eq!(rows[0].waste_category, None);
    }

    #[test]
    fn test_read_keeps_bad_values_as_text() {
        let csv = "timestamp_utc,lat,lon,tds_ppm\n2024-01-01,abc,88.3,n/a\n";
        let rows = read_telemetry_from(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].lat.as_deref(), Some("abc"));
        assert_eq!(rows[0].latitude(), None);
        assert_eq!(rows[0].tds(), None);
    }
}
