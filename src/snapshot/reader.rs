//! Reads snapshot files back for serving.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Collection;
use crate::models::Page;

/// Read side of the snapshot directory. Never fails; broken files read as defaults.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    dir: PathBuf,
}

impl SnapshotReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Raw JSON for a collection.
    pub async fn read_value(&self, collection: Collection) -> Value {
        self.read(collection)
            .await
            .unwrap_or_else(|| collection.default_value())
    }

    pub async fn read_pages(&self) -> Vec<Page> {
        self.read(Collection::Pages).await.unwrap_or_default()
    }

    async fn read<T: DeserializeOwned>(&self, collection: Collection) -> Option<T> {
        let path = self.dir.join(collection.file_name());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Snapshot {:?} unavailable: {}", path, e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Snapshot {:?} is not valid: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_files_read_as_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let reader = SnapshotReader::new(temp_dir.path().join("absent"));

        assert_eq!(reader.read_value(Collection::Pages).await, json!([]));
        assert!(reader.read_pages().await.is_empty());
        let settings = reader.read_value(Collection::Settings).await;
        assert_eq!(settings["theme"], "default");
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_default() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("navigation.json"), "[{").unwrap();
        std::fs::write(temp_dir.path().join("pages.json"), r#"{"not":"a list"}"#).unwrap();

        let reader = SnapshotReader::new(temp_dir.path());
        assert_eq!(reader.read_value(Collection::Navigation).await, json!([]));
        assert!(reader.read_pages().await.is_empty());
    }

    #[tokio::test]
    async fn test_reads_written_pages() {
        let temp_dir = TempDir::new().unwrap();
        let pages = json!([{
            "id": "p1",
            "title": "Home",
            "slug": "home",
            "status": "published",
            "blocks": [{ "id": "b1", "type": "hero", "props": { "title": "Hi" } }],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }]);
        std::fs::write(
            temp_dir.path().join("pages.json"),
            serde_json::to_vec(&pages).unwrap(),
        )
        .unwrap();

        let reader = SnapshotReader::new(temp_dir.path());
        let read = reader.read_pages().await;
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].blocks[0].kind, "hero");
    }
}
