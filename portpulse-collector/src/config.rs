//! Collector configuration.
//!
//! YAML file, path from `PORTPULSE_CONFIG` (default `collector.yaml`).
//! A missing or invalid file degrades to the defaults with a logged warning;
//! the daemon always starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Directory of the JSON store backend.
    pub data_dir: PathBuf,
    /// Feed file path; may contain `{device}` for per-device files.
    pub feed_path: String,
    pub poll_interval_secs: u64,
    /// Running workers older than this are aborted and rescheduled.
    pub worker_timeout_secs: u64,
    /// Device type whose activated devices are polled.
    pub device_type: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            feed_path: "./data.json".into(),
            poll_interval_secs: 10,
            worker_timeout_secs: 120,
            device_type: "Json".into(),
        }
    }
}

impl CollectorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }
}

pub async fn load_config() -> CollectorConfig {
    let path = std::env::var("PORTPULSE_CONFIG").unwrap_or_else(|_| "collector.yaml".into());
    load_config_from(Path::new(&path)).await
}

pub async fn load_config_from(path: &Path) -> CollectorConfig {
    if !path.exists() {
        warn!("no config at {path:?}, using defaults");
        return CollectorConfig::default();
    }
    let text = fs::read_to_string(path).await.unwrap_or_default();
    if text.trim().is_empty() {
        return CollectorConfig::default();
    }
    serde_yaml::from_str(&text).unwrap_or_else(|e| {
        warn!("invalid config {path:?}: {e}, using defaults");
        CollectorConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = CollectorConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.worker_timeout(), Duration::from_secs(120));
        assert_eq!(config.feed_path, "./data.json");
        assert_eq!(config.device_type, "Json");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let config = load_config_from(Path::new("/nonexistent/collector.yaml")).await;
        assert_eq!(config.poll_interval_secs, 10);
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.yaml");
        std::fs::write(&path, "poll_interval_secs: 3\nfeed_path: ./feeds/{device}.json\n")
            .unwrap();

        let config = load_config_from(&path).await;
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.feed_path, "./feeds/{device}.json");
        assert_eq!(config.worker_timeout_secs, 120);
    }

    #[tokio::test]
    async fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.yaml");
        std::fs::write(&path, "poll_interval_secs: [not a number").unwrap();

        let config = load_config_from(&path).await;
        assert_eq!(config.poll_interval_secs, 10);
    }
}
