use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use crate::tiles::key::MAX_PRECISION;

pub const DEFAULT_TILE_PRECISION: u32 = 3;
pub const DEFAULT_HORIZON_DAYS: usize = 7;

/// Tunables for one aggregation + forecast run.
///
/// Can be stored as a JSON object on disk; absent keys take the defaults:
/// ```json
/// { "tile_precision": 4, "horizon_days": 14 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Decimal places kept when rounding coordinates into tiles.
    pub tile_precision: u32,
    /// Days projected beyond the last observed day.
    pub horizon_days: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tile_precision: DEFAULT_TILE_PRECISION,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces file values with any that were given explicitly.
    pub fn with_overrides(mut self, tile_precision: Option<u32>, horizon_days: Option<usize>) -> Self {
        if let Some(p) = tile_precision {
            self.tile_precision = p;
        }
        if let Some(d) = horizon_days {
            self.horizon_days = d;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_precision > MAX_PRECISION {
            bail!(
                "tile_precision must be at most {MAX_PRECISION}, got {}",
                self.tile_precision
            );
        }
        if self.horizon_days == 0 {
            bail!("horizon_days must be at least 1");
        }
        Ok(())
    }
}
