//! One poll cycle's worth of queue counts.

use tracing::{debug, warn};

use super::QueueSource;
use crate::error::SourceError;

/// The approximate message count of a single queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSample {
    pub name: String,
    pub count: u64,
}

impl QueueSample {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Everything a source reported during one poll cycle.
///
/// Queues in `missing` were reported as deleted upstream and must be
/// dropped by the tracker. Queues in `failed` could not be read this time
/// and keep their previous state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub samples: Vec<QueueSample>,
    pub missing: Vec<String>,
    pub failed: Vec<String>,
}

impl QueueSnapshot {
    /// Build a snapshot containing only successful samples.
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            samples: counts
                .into_iter()
                .map(|(name, count)| QueueSample::new(name, count))
                .collect(),
            missing: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Sample every queue the source currently lists.
///
/// A failure to list is returned to the caller. Per-queue failures are
/// folded into the snapshot: `NotFound` lands in `missing`, anything else
/// in `failed`.
pub async fn collect(source: &mut dyn QueueSource) -> Result<QueueSnapshot, SourceError> {
    let queues = source.list_queues().await?;
    debug!("{} listed {} queues", source.description(), queues.len());

    let mut snapshot = QueueSnapshot::default();

    for queue in queues {
        match source.fetch_count(&queue).await {
            Ok(count) => snapshot.samples.push(QueueSample::new(queue.name, count)),
            Err(SourceError::NotFound(_)) => {
                debug!("Queue {} no longer exists", queue.name);
                snapshot.missing.push(queue.name);
            }
            Err(e) => {
                warn!("Could not refresh queue {}: {}", queue.name, e);
                snapshot.failed.push(queue.name);
            }
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::QueueHandle;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct FlakySource;

    #[async_trait]
    impl QueueSource for FlakySource {
        async fn list_queues(&mut self) -> Result<Vec<QueueHandle>, SourceError> {
            Ok(vec![
                QueueHandle::new("orders"),
                QueueHandle::new("deleted"),
                QueueHandle::new("flaky"),
            ])
        }

        async fn fetch_count(&mut self, queue: &QueueHandle) -> Result<u64, SourceError> {
            match queue.name.as_str() {
                "orders" => Ok(12),
                "deleted" => Err(SourceError::NotFound(queue.name.clone())),
                _ => Err(SourceError::Transient("503".to_string())),
            }
        }

        fn description(&self) -> &str {
            "flaky"
        }
    }

    #[derive(Debug)]
    struct BrokenSource;

    #[async_trait]
    impl QueueSource for BrokenSource {
        async fn list_queues(&mut self) -> Result<Vec<QueueHandle>, SourceError> {
            Err(SourceError::Transient("unreachable".to_string()))
        }

        async fn fetch_count(&mut self, _queue: &QueueHandle) -> Result<u64, SourceError> {
            unreachable!()
        }

        fn description(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn collect_sorts_outcomes() {
        let snapshot = collect(&mut FlakySource).await.unwrap();

        assert_eq!(snapshot.samples, vec![QueueSample::new("orders", 12)]);
        assert_eq!(snapshot.missing, vec!["deleted".to_string()]);
        assert_eq!(snapshot.failed, vec!["flaky".to_string()]);
    }

    #[tokio::test]
    async fn listing_failure_is_returned() {
        let result = collect(&mut BrokenSource).await;
        assert!(matches!(result, Err(SourceError::Transient(_))));
    }

    #[test]
    fn from_counts_builds_samples() {
        let snapshot = QueueSnapshot::from_counts([("a", 1), ("b", 2)]);
        assert_eq!(snapshot.samples.len(), 2);
        assert!(snapshot.missing.is_empty());
        assert!(!snapshot.is_empty());
        assert!(QueueSnapshot::default().is_empty());
    }
}
