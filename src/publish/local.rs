use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use super::Publisher;

/// Writes JSON documents as files below a root directory, one per key.
pub struct LocalPublisher {
    root: PathBuf,
}

impl LocalPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl Publisher for LocalPublisher {
    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{ForecastReport, forecast_tiles};
    use crate::publish::publish_forecasts;
    use crate::tiles::DailyAggregate;
    use chrono::NaiveDate;
    use std::env;

    #[tokio::test]
    async fn test_put_json_creates_directories() {
        let root = env::temp_dir().join("waste_tiles_test_publish_put");
        let _ = std::fs::remove_dir_all(&root);

        let publisher = LocalPublisher::new(&root);
        publisher
            .put_json("a/b/c.json", &serde_json::json!({ "ok": true }))
            .await
            .unwrap();

        let text = std::fs::read_to_string(root.join("a/b/c.json")).unwrap();
        assert!(text.contains("\"ok\": true"));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_publish_forecasts_writes_tiles_and_index() {
        let root = env::temp_dir().join("waste_tiles_test_publish_forecasts");
        let _ = std::fs::remove_dir_all(&root);

        let rows = vec![DailyAggregate {
            tile_lat: 22.571,
            tile_lon: 88.364,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            waste_count: 2,
            total_mass: 150.0,
            avg_tds: None,
            weighted_count: 3,
        }];
        let report = ForecastReport::new(forecast_tiles(&rows, 3).unwrap(), 3);

        let publisher = LocalPublisher::new(&root);
        let published = publish_forecasts(&publisher, &report).await.unwrap();

        assert_eq!(published, 1);
        assert!(root.join("forecasts/tiles/22.571_88.364.json").exists());

        let index: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(root.join("forecasts/tiles.json")).unwrap())
                .unwrap();
        assert_eq!(index["horizon_days"], 3);
        assert_eq!(index["tiles"][0]["tile"], "22.571_88.364");
        assert_eq!(index["tiles"][0]["next_day_waste_count"], 2.0);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
