use std::path::PathBuf;

use anyhow::{Context, Result};
use log::warn;
use membw::{CgroupStats, ContainerKey};
use serde::Deserialize;

/// One scrape of every container's cgroup counters
#[derive(Debug, Default)]
pub struct SnapshotDocument {
    pub containers: Vec<ContainerSnapshot>,
}

// Entries stay undecoded so one bad container does not reject the document
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    containers: Vec<serde_json::Value>,
}

/// Counters scraped for a single container
#[derive(Debug, Deserialize)]
pub struct ContainerSnapshot {
    pub pod_uid: String,
    pub container_name: String,
    pub cgroup: CgroupStats,
}

impl ContainerSnapshot {
    pub fn key(&self) -> ContainerKey {
        ContainerKey::new(self.pod_uid.clone(), self.container_name.clone())
    }
}

impl SnapshotDocument {
    /// Decodes a document, dropping container entries that do not decode
    pub fn parse(data: &str) -> Result<Self> {
        let raw: RawDocument =
            serde_json::from_str(data).context("Failed to parse snapshot document")?;

        let containers = raw
            .containers
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                match serde_json::from_value::<ContainerSnapshot>(entry) {
                    Ok(container) => Some(container),
                    Err(e) => {
                        warn!("Skipping container entry {}: {}", index, e);
                        None
                    }
                }
            })
            .collect();

        Ok(Self { containers })
    }
}

/// Reads the snapshot document the scraper keeps refreshing on disk
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the current document from disk
    pub async fn load(&self) -> Result<SnapshotDocument> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        SnapshotDocument::parse(&data)
    }
}
