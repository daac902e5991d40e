//! File-based queue source.
//!
//! Reads a JSON object mapping queue names to message counts, e.g.
//! `{"orders": 120, "invoices": 4}`. The file is re-read on every listing so
//! an external process can rewrite it between polls.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{QueueHandle, QueueSource};
use crate::error::SourceError;

/// A queue source backed by a JSON file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    /// Counts read during the last listing.
    counts: BTreeMap<String, u64>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            counts: BTreeMap::new(),
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<BTreeMap<String, u64>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Transient(format!("Read error: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| SourceError::Transient(format!("Parse error: {}", e)))
    }
}

#[async_trait]
impl QueueSource for FileSource {
    async fn list_queues(&mut self) -> Result<Vec<QueueHandle>, SourceError> {
        self.counts = self.read_file().await?;
        debug!("Read {} queues from {}", self.counts.len(), self.path.display());
        Ok(self.counts.keys().map(QueueHandle::new).collect())
    }

    async fn fetch_count(&mut self, queue: &QueueHandle) -> Result<u64, SourceError> {
        self.counts
            .get(&queue.name)
            .copied()
            .ok_or_else(|| SourceError::NotFound(queue.name.clone()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_json(file: &NamedTempFile, json: &str) {
        std::fs::write(file.path(), json).unwrap();
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/test.json");
        assert_eq!(source.path(), Path::new("/tmp/test.json"));
        assert_eq!(source.description(), "file: /tmp/test.json");
    }

    #[tokio::test]
    async fn test_file_source_lists_and_counts() {
        let file = NamedTempFile::new().unwrap();
        write_json(&file, r#"{"orders": 120, "invoices": 4}"#);

        let mut source = FileSource::new(file.path());
        let queues = source.list_queues().await.unwrap();

        assert_eq!(queues, vec![QueueHandle::new("invoices"), QueueHandle::new("orders")]);
        assert_eq!(source.fetch_count(&QueueHandle::new("orders")).await.unwrap(), 120);
    }

    #[tokio::test]
    async fn test_file_source_rereads_each_listing() {
        let file = NamedTempFile::new().unwrap();
        write_json(&file, r#"{"orders": 120}"#);

        let mut source = FileSource::new(file.path());
        source.list_queues().await.unwrap();

        write_json(&file, r#"{"orders": 80, "refunds": 1}"#);
        let queues = source.list_queues().await.unwrap();

        assert_eq!(queues.len(), 2);
        assert_eq!(source.fetch_count(&QueueHandle::new("orders")).await.unwrap(), 80);
    }

    #[tokio::test]
    async fn test_file_source_unknown_queue_is_not_found() {
        let file = NamedTempFile::new().unwrap();
        write_json(&file, r#"{"orders": 1}"#);

        let mut source = FileSource::new(file.path());
        source.list_queues().await.unwrap();

        let result = source.fetch_count(&QueueHandle::new("gone")).await;
        assert!(matches!(result, Err(SourceError::NotFound(name)) if name == "gone"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let mut source = FileSource::new("/nonexistent/path/queues.json");

        let result = source.list_queues().await;
        assert!(matches!(result, Err(SourceError::Transient(msg)) if msg.contains("Read error")));
    }

    #[tokio::test]
    async fn test_file_source_invalid_json() {
        let file = NamedTempFile::new().unwrap();
        write_json(&file, "not valid json");

        let mut source = FileSource::new(file.path());

        let result = source.list_queues().await;
        assert!(matches!(result, Err(SourceError::Transient(msg)) if msg.contains("Parse error")));
    }
}
