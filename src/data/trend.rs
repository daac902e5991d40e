//! Per-queue trend tracking.
//!
//! The tracker turns successive count snapshots into a small amount of
//! state per queue: the peak count since tracking started, the latest
//! count, and whether the last poll moved it up or down. Speed and drain
//! estimates are derived from that state on demand and never stored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};
use tracing::debug;

use super::rules::{GroupAssignment, QueueRules};
use crate::source::QueueSnapshot;

/// Trend state for a single queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendEntry {
    pub name: String,
    /// Highest count seen since the entry was created. Used as the drain baseline.
    pub first_count: u64,
    pub current_count: u64,
    /// When tracking started. Never changes for the lifetime of the entry.
    pub start_time: DateTime<Local>,
    /// The last poll pushed the count above the previous peak.
    pub increased: bool,
    /// The last poll lowered the count.
    pub decreased: bool,
    pub is_important: bool,
    pub group: GroupAssignment,
}

impl TrendEntry {
    fn new(name: &str, count: u64, now: DateTime<Local>, rules: &QueueRules) -> Self {
        Self {
            name: name.to_string(),
            first_count: count,
            current_count: count,
            start_time: now,
            increased: false,
            decreased: false,
            is_important: rules.is_important(name),
            group: rules.assign_group(name),
        }
    }

    fn observe(&mut self, count: u64) {
        let previous = self.current_count;

        self.increased = count > self.first_count;
        if self.increased {
            self.first_count = count;
        }
        self.decreased = count < previous;
        self.current_count = count;
    }

    /// Messages drained since the peak. Never negative.
    pub fn processed(&self) -> u64 {
        self.first_count.saturating_sub(self.current_count)
    }

    /// Compute speed and drain estimates as of `now`.
    pub fn metrics(&self, now: DateTime<Local>) -> TrendMetrics {
        let processed = self.processed();
        let elapsed = now - self.start_time;
        let elapsed_ms = elapsed.num_milliseconds();

        let speed = (elapsed_ms > 0)
            .then(|| (u128::from(processed) * 1000 / elapsed_ms as u128) as u64);

        let remaining = if processed > 0 {
            let projected_ms = i128::from(elapsed_ms.max(0)) * i128::from(self.current_count)
                / i128::from(processed);
            i64::try_from(projected_ms).ok().and_then(TimeDelta::try_milliseconds)
        } else {
            None
        };
        let conclusion = remaining.and_then(|r| now.checked_add_signed(r));

        TrendMetrics {
            processed,
            elapsed,
            speed,
            remaining,
            conclusion,
        }
    }
}

/// Derived, read-time metrics for a [`TrendEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendMetrics {
    pub processed: u64,
    pub elapsed: TimeDelta,
    /// Whole messages per second. `None` until some time has elapsed.
    pub speed: Option<u64>,
    /// Projected time until the queue is empty. `None` unless it is draining.
    pub remaining: Option<TimeDelta>,
    pub conclusion: Option<DateTime<Local>>,
}

/// Owns the trend state of every queue seen since the last reset.
#[derive(Debug)]
pub struct TrendTracker {
    entries: BTreeMap<String, TrendEntry>,
    rules: Arc<QueueRules>,
}

impl TrendTracker {
    pub fn new(rules: Arc<QueueRules>) -> Self {
        Self {
            entries: BTreeMap::new(),
            rules,
        }
    }

    /// Fold one snapshot into the tracked state.
    ///
    /// Queues absent from the snapshot keep their state. Queues the source
    /// reported as deleted are dropped.
    pub fn ingest(&mut self, snapshot: &QueueSnapshot, now: DateTime<Local>) {
        for sample in &snapshot.samples {
            match self.entries.get_mut(&sample.name) {
                Some(entry) => entry.observe(sample.count),
                None => {
                    if sample.count == 0 && self.rules.skip_empty_on_create {
                        continue;
                    }
                    debug!("Tracking queue {} at {}", sample.name, sample.count);
                    self.entries.insert(
                        sample.name.clone(),
                        TrendEntry::new(&sample.name, sample.count, now, &self.rules),
                    );
                }
            }
        }

        for name in &snapshot.missing {
            if self.entries.remove(name).is_some() {
                debug!("Dropped deleted queue {}", name);
            }
        }
    }

    /// Forget every queue. The next snapshot starts a fresh measurement window.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, name: &str) -> Option<&TrendEntry> {
        self.entries.get(name)
    }

    /// Entries ordered by queue name.
    pub fn entries(&self) -> impl Iterator<Item = &TrendEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rules(&self) -> &QueueRules {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rules::{PatternSet, QueueGroup};

    fn tracker() -> TrendTracker {
        TrendTracker::new(Arc::new(QueueRules::default()))
    }

    fn snapshot(counts: &[(&str, u64)]) -> QueueSnapshot {
        QueueSnapshot::from_counts(counts.iter().copied())
    }

    #[test]
    fn new_queue_starts_at_observed_count() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 40)]), now);

        let entry = t.get("orders").unwrap();
        assert_eq!(entry.first_count, 40);
        assert_eq!(entry.current_count, 40);
        assert_eq!(entry.start_time, now);
        assert!(!entry.increased);
        assert!(!entry.decreased);
    }

    #[test]
    fn growing_past_peak_raises_first_count() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 40)]), now);
        t.ingest(&snapshot(&[("orders", 30)]), now);
        t.ingest(&snapshot(&[("orders", 55)]), now);

        let entry = t.get("orders").unwrap();
        assert!(entry.increased);
        assert!(!entry.decreased);
        assert_eq!(entry.first_count, 55);
        assert_eq!(entry.current_count, 55);
    }

    #[test]
    fn growth_below_peak_is_not_an_increase() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 40)]), now);
        t.ingest(&snapshot(&[("orders", 10)]), now);
        t.ingest(&snapshot(&[("orders", 20)]), now);

        let entry = t.get("orders").unwrap();
        assert!(!entry.increased);
        assert!(!entry.decreased);
        assert_eq!(entry.first_count, 40);
    }

    #[test]
    fn shrinking_sets_decreased() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 40)]), now);
        t.ingest(&snapshot(&[("orders", 39)]), now);

        let entry = t.get("orders").unwrap();
        assert!(entry.decreased);
        assert_eq!(entry.processed(), 1);
    }

    #[test]
    fn absent_queue_keeps_state() {
        let mut t = tracker();
        let start = Local::now();

        t.ingest(&snapshot(&[("orders", 40), ("billing", 5)]), start);
        t.ingest(&snapshot(&[("billing", 4)]), start + TimeDelta::seconds(2));
        t.ingest(&snapshot(&[("orders", 30)]), start + TimeDelta::seconds(4));

        let entry = t.get("orders").unwrap();
        assert_eq!(entry.start_time, start);
        assert_eq!(entry.first_count, 40);
        assert_eq!(entry.current_count, 30);
    }

    #[test]
    fn missing_queue_is_removed() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 40), ("billing", 5)]), now);

        let mut next = snapshot(&[("billing", 5)]);
        next.missing.push("orders".to_string());
        t.ingest(&next, now);

        assert!(t.get("orders").is_none());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn failed_queue_is_not_touched() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 40)]), now);

        let mut next = QueueSnapshot::default();
        next.failed.push("orders".to_string());
        t.ingest(&next, now);

        assert_eq!(t.get("orders").unwrap().current_count, 40);
    }

    #[test]
    fn reset_starts_a_fresh_window() {
        let mut t = tracker();
        let start = Local::now();

        t.ingest(&snapshot(&[("orders", 100)]), start);
        t.ingest(&snapshot(&[("orders", 50)]), start + TimeDelta::seconds(10));

        t.reset();
        assert!(t.is_empty());

        let after = start + TimeDelta::seconds(20);
        t.ingest(&snapshot(&[("orders", 45)]), after);

        let entry = t.get("orders").unwrap();
        assert_eq!(entry.start_time, after);
        assert_eq!(entry.first_count, 45);
        assert_eq!(entry.processed(), 0);
    }

    #[test]
    fn skip_empty_on_create_ignores_zero_counts() {
        let rules = QueueRules {
            skip_empty_on_create: true,
            ..Default::default()
        };
        let mut t = TrendTracker::new(Arc::new(rules));
        let now = Local::now();

        t.ingest(&snapshot(&[("idle", 0), ("busy", 3)]), now);
        assert!(t.get("idle").is_none());

        // Once tracked, a queue may drop to zero.
        t.ingest(&snapshot(&[("busy", 0)]), now);
        assert_eq!(t.get("busy").unwrap().current_count, 0);
    }

    #[test]
    fn importance_and_group_assigned_at_creation() {
        let rules = QueueRules {
            important: PatternSet::new(&["^payments"]).unwrap(),
            grouping_enabled: true,
            groups: vec![QueueGroup::new("money", 0, &["^payments"]).unwrap()],
            ..Default::default()
        };
        let mut t = TrendTracker::new(Arc::new(rules));

        t.ingest(&snapshot(&[("payments-in", 1), ("logs", 1)]), Local::now());

        let payments = t.get("payments-in").unwrap();
        assert!(payments.is_important);
        assert_eq!(payments.group.name, "money");

        let logs = t.get("logs").unwrap();
        assert!(!logs.is_important);
        assert_eq!(logs.group, GroupAssignment::default());
    }

    #[test]
    fn speed_empty_without_elapsed_time() {
        let mut t = tracker();
        let now = Local::now();

        t.ingest(&snapshot(&[("orders", 100)]), now);
        t.ingest(&snapshot(&[("orders", 10)]), now);

        let metrics = t.get("orders").unwrap().metrics(now);
        assert_eq!(metrics.speed, None);
    }

    #[test]
    fn speed_is_zero_when_nothing_processed() {
        let mut t = tracker();
        let start = Local::now();

        t.ingest(&snapshot(&[("orders", 100)]), start);

        let metrics = t.get("orders").unwrap().metrics(start + TimeDelta::seconds(30));
        assert_eq!(metrics.speed, Some(0));
        assert_eq!(metrics.remaining, None);
        assert_eq!(metrics.conclusion, None);
    }

    #[test]
    fn speed_is_floored_messages_per_second() {
        let mut t = tracker();
        let start = Local::now();

        t.ingest(&snapshot(&[("orders", 100)]), start);
        t.ingest(&snapshot(&[("orders", 75)]), start + TimeDelta::seconds(5));

        let metrics = t.get("orders").unwrap().metrics(start + TimeDelta::seconds(10));
        assert_eq!(metrics.processed, 25);
        assert_eq!(metrics.speed, Some(2));
    }

    #[test]
    fn drain_estimate_projects_from_elapsed_rate() {
        let mut t = tracker();
        let start = Local::now();

        t.ingest(&snapshot(&[("orders", 100)]), start);
        t.ingest(&snapshot(&[("orders", 80)]), start + TimeDelta::seconds(5));

        let now = start + TimeDelta::seconds(10);
        let metrics = t.get("orders").unwrap().metrics(now);

        // 20 drained in 10s, 80 left: 40 seconds to go.
        let expected = TimeDelta::seconds(40);
        assert_eq!(metrics.remaining, Some(expected));

        let conclusion = metrics.conclusion.unwrap();
        let drift = (conclusion - (now + expected)).num_milliseconds().abs();
        assert!(drift <= 1);
    }

    #[test]
    fn drained_queue_has_zero_remaining() {
        let mut t = tracker();
        let start = Local::now();

        t.ingest(&snapshot(&[("orders", 10)]), start);
        t.ingest(&snapshot(&[("orders", 0)]), start + TimeDelta::seconds(5));

        let now = start + TimeDelta::seconds(5);
        let metrics = t.get("orders").unwrap().metrics(now);
        assert_eq!(metrics.remaining, Some(TimeDelta::zero()));
        assert_eq!(metrics.conclusion, Some(now));
    }

    #[test]
    fn entries_iterate_in_name_order() {
        let mut t = tracker();
        t.ingest(&snapshot(&[("c", 1), ("a", 1), ("b", 1)]), Local::now());

        let names: Vec<&str> = t.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
