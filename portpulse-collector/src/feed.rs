//! Reading feed retrieval.
//!
//! Workers pull their device's pending readings through the `FeedSource`
//! trait so the transport stays pluggable. The bundled `JsonFileFeed` reads a
//! JSON array from a file; its configured path may contain a `{device}`
//! placeholder for per-device files, and without the placeholder every device
//! shares one file (the reference deployment).

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;

use crate::models::{Device, RawReading};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read feed {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse feed {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Pending readings for one device. A failure skips the device's whole
    /// cycle; it never aborts the scheduler.
    async fn fetch(&self, device: &Device) -> Result<Vec<RawReading>, FeedError>;
}

pub struct JsonFileFeed {
    path_template: String,
}

impl JsonFileFeed {
    pub fn new<S: Into<String>>(path_template: S) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    fn path_for(&self, device: &Device) -> PathBuf {
        PathBuf::from(
            self.path_template
                .replace("{device}", &device.id.to_string()),
        )
    }
}

#[async_trait]
impl FeedSource for JsonFileFeed {
    async fn fetch(&self, device: &Device) -> Result<Vec<RawReading>, FeedError> {
        let path = self.path_for(device);
        let content = fs::read_to_string(&path).await.map_err(|source| {
            FeedError::Read {
                path: path.clone(),
                source,
            }
        })?;
        serde_json::from_str(&content).map_err(|source| FeedError::Parse { path, source })
    }
}
