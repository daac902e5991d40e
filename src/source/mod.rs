//! Queue source abstraction for sampling message counts.
//!
//! A source lists the queues it can see and reports each queue's
//! approximate message count. Two backends ship with the crate: the Azure
//! Storage queue service and a JSON file for offline use.

mod azure;
mod file;
mod snapshot;

pub use azure::{AzureQueueSource, AzureQueueSourceBuilder, Credentials, StorageAccount};
pub use file::FileSource;
pub use snapshot::{collect, QueueSample, QueueSnapshot};

use std::fmt::Debug;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{ConfigError, SourceError};

/// A queue as returned by [`QueueSource::list_queues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub name: String,
}

impl QueueHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Trait for sampling queue counts from a backend.
///
/// # Example
///
/// ```no_run
/// use azqmon::source::{collect, FileSource};
///
/// # async fn run() -> Result<(), azqmon::SourceError> {
/// let mut source = FileSource::new("queues.json");
/// let snapshot = collect(&mut source).await?;
/// println!("Sampled {} queues", snapshot.samples.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait QueueSource: Send + Debug {
    /// List every queue currently visible to the source.
    ///
    /// A failure here is fatal for the poll loop.
    async fn list_queues(&mut self) -> Result<Vec<QueueHandle>, SourceError>;

    /// Fetch the approximate message count of one queue.
    ///
    /// Returns [`SourceError::NotFound`] when the queue was deleted after
    /// it was listed.
    async fn fetch_count(&mut self, queue: &QueueHandle) -> Result<u64, SourceError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the status bar.
    fn description(&self) -> &str;
}

/// Build a source from a connection endpoint.
///
/// `file:<path>` and paths ending in `.json` select the [`FileSource`];
/// anything else is parsed as an Azure Storage connection string.
pub fn connect(endpoint: &str) -> Result<Box<dyn QueueSource>, ConfigError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::MissingConnectionString);
    }

    if let Some(path) = endpoint.strip_prefix("file:") {
        return Ok(Box::new(FileSource::new(path)));
    }

    if Path::new(endpoint)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        return Ok(Box::new(FileSource::new(endpoint)));
    }

    let account = StorageAccount::parse(endpoint)?;
    let source = AzureQueueSource::builder().account(account).build()?;
    Ok(Box::new(source))
}
