//! Publishing forecast JSON.
//!
//! [`Publisher`] is the async trait for storing a serializable value under a
//! key. [`LocalPublisher`] writes into a directory tree and [`S3Publisher`]
//! uploads to an S3 bucket.

mod local;
mod s3;

pub use local::LocalPublisher;
pub use s3::S3Publisher;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::forecast::ForecastReport;

/// Stores JSON documents under slash-separated keys.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()>;
}

/// Uploads one JSON document per tile under `forecasts/tiles/`, then the
/// index at `forecasts/tiles.json`. Returns the number of tiles published.
#[tracing::instrument(skip_all, fields(tiles = report.tiles.len()))]
pub async fn publish_forecasts<P: Publisher>(publisher: &P, report: &ForecastReport) -> Result<usize> {
    for (key, forecast) in &report.tiles {
        publisher
            .put_json(&format!("forecasts/tiles/{key}.json"), forecast)
            .await?;
    }

    publisher
        .put_json("forecasts/tiles.json", &report.index())
        .await?;

    info!(published = report.tiles.len(), "Forecasts published");
    Ok(report.tiles.len())
}
