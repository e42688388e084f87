/*!
Environnement temporaire pour tests d'intégration du collecteur.

Assemble dans un répertoire jetable tout ce dont un collecteur a besoin:
le répertoire de données du store JSON et le fichier de flux.
*/

use std::path::PathBuf;

use anyhow::Result;
use tempfile::TempDir;

pub struct TestEnv {
    root: TempDir,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
        })
    }

    /// Store data directory (created on first use).
    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    /// Path of the shared feed file.
    pub fn feed_path(&self) -> PathBuf {
        self.root.path().join("feed.json")
    }

    /// Writes the feed file from a JSON value (see `FeedBuilder`).
    pub fn write_feed(&self, feed: &serde_json::Value) -> Result<()> {
        std::fs::write(self.feed_path(), serde_json::to_string_pretty(feed)?)?;
        Ok(())
    }

    /// Seeds one store table file (`devices.json`, `ports.json`, ...) before
    /// the store is opened.
    pub fn write_store_rows(&self, file_name: &str, rows: &serde_json::Value) -> Result<()> {
        let dir = self.data_dir();
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(file_name), serde_json::to_string_pretty(rows)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wires_feed_and_store_files_together() {
        let env = TestEnv::new().unwrap();
        env.write_feed(&json!([])).unwrap();
        env.write_store_rows("ports.json", &json!([])).unwrap();

        assert!(env.feed_path().exists());
        assert!(env.data_dir().join("ports.json").exists());
    }
}
