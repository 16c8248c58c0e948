use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Finest supported tile precision, in decimal places.
pub const MAX_PRECISION: u32 = 10;

/// A geographic grid cell identified by rounded latitude/longitude.
///
/// Equality, ordering and hashing use the exact bit pattern of both
/// coordinates under a total order, so keys can live in maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileKey {
    pub lat: f64,
    pub lon: f64,
}

impl TileKey {
    /// Builds the tile containing `(lat, lon)` at `precision` decimal places.
    pub fn from_coords(lat: f64, lon: f64, precision: u32) -> Result<Self> {
        if precision > MAX_PRECISION {
            bail!("tile precision {precision} exceeds the maximum of {MAX_PRECISION}");
        }
        Ok(Self::new(
            round_to(lat, precision),
            round_to(lon, precision),
        ))
    }

    /// Wraps already-rounded coordinates, e.g. when reading aggregates back.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: normalize_zero(lat),
            lon: normalize_zero(lon),
        }
    }
}

/// Rounds half to even at `precision` decimal places: `rint(x * 10^p) / 10^p`.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    normalize_zero((value * scale).round_ties_even() / scale)
}

fn normalize_zero(v: f64) -> f64 {
    // -0.0 and 0.0 are the same tile
    if v == 0.0 { 0.0 } else { v }
}

impl PartialEq for TileKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TileKey {}

impl PartialOrd for TileKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lat
            .total_cmp(&other.lat)
            .then_with(|| self.lon.total_cmp(&other.lon))
    }
}

impl Hash for TileKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

/// Whole numbers keep a trailing `.0` so `10°` prints as `10.0`, not `10`.
fn write_coord(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.fract() == 0.0 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coord(f, self.lat)?;
        f.write_str("_")?;
        write_coord(f, self.lon)
    }
}
