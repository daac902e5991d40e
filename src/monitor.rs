//! The poll loop driving sampling, rendering and export.
//!
//! Each cycle lists the queues, samples their counts, folds the snapshot
//! into the [`TrendTracker`], renders the resulting plan and optionally
//! appends a CSV row. Cycles run at a fixed cadence: the sleep after a cycle
//! is shortened by the time the cycle took, and skipped entirely when the
//! cycle overran the interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::data::{layout, QueueRules, TrendTracker};
use crate::error::MonitorError;
use crate::export::HistoryExporter;
use crate::source::{collect, QueueSource};
use crate::ui::{RenderPlan, Renderer};

/// Lifecycle of a [`PollLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Cancellation was observed while sleeping; no further cycle starts.
    Cancelling,
    Stopped,
}

/// Cadence and presentation settings for the loop.
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub title: String,
    pub interval: Duration,
    /// Clear all trend state every this many cycles. 0 disables resets.
    pub reset_every: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            title: "Azure Queue Monitor".to_string(),
            interval: Duration::from_millis(2000),
            reset_every: 50,
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub resets: u64,
    /// Total time spent sleeping between cycles.
    pub slept: Duration,
}

/// How long to sleep after a cycle that took `elapsed`.
///
/// Zero when the cycle used up the whole interval.
pub fn sleep_budget(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Drives one source, one renderer and an optional exporter.
pub struct PollLoop {
    source: Box<dyn QueueSource>,
    renderer: Box<dyn Renderer>,
    tracker: TrendTracker,
    exporter: Option<HistoryExporter>,
    settings: PollSettings,
    state: LoopState,
    /// Cycles since the last reset.
    cycle: u64,
}

impl PollLoop {
    pub fn new(
        source: Box<dyn QueueSource>,
        renderer: Box<dyn Renderer>,
        rules: Arc<QueueRules>,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            renderer,
            tracker: TrendTracker::new(rules),
            exporter: None,
            settings,
            state: LoopState::Running,
            cycle: 0,
        }
    }

    /// Append a CSV row every cycle.
    pub fn with_exporter(mut self, exporter: HistoryExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tracker(&self) -> &TrendTracker {
        &self.tracker
    }

    /// Poll until `cancel` fires or a cycle fails.
    ///
    /// Cancellation is checked at the top of every cycle and interrupts the
    /// sleep between cycles. A cycle in progress always completes.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<LoopStats, MonitorError> {
        let mut stats = LoopStats::default();
        info!(
            "Polling {} every {:?}",
            self.source.description(),
            self.settings.interval
        );

        loop {
            let started = Instant::now();

            if self.state == LoopState::Cancelling || cancel.is_cancelled() {
                self.state = LoopState::Stopped;
                info!("Stopped after {} cycles", stats.cycles);
                return Ok(stats);
            }

            self.run_cycle(&mut stats).await?;

            let budget = sleep_budget(self.settings.interval, started.elapsed());
            if budget.is_zero() {
                debug!("Cycle overran the {:?} interval", self.settings.interval);
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(budget) => stats.slept += budget,
                _ = cancel.cancelled() => {
                    debug!("Cancelled while sleeping");
                    self.state = LoopState::Cancelling;
                }
            }
        }
    }

    async fn run_cycle(&mut self, stats: &mut LoopStats) -> Result<(), MonitorError> {
        stats.cycles += 1;
        self.cycle += 1;

        if self.settings.reset_every > 0 && self.cycle >= self.settings.reset_every {
            info!("Resetting {} tracked queues", self.tracker.len());
            self.tracker.reset();
            self.cycle = 0;
            stats.resets += 1;
        }

        let snapshot = collect(self.source.as_mut())
            .await
            .map_err(MonitorError::Listing)?;

        let now = Local::now();
        self.tracker.ingest(&snapshot, now);

        let plan = RenderPlan {
            title: self.settings.title.clone(),
            source: self.source.description().to_string(),
            generated_at: now,
            cycle: self.cycle,
            reset_every: self.settings.reset_every,
            rows: layout(self.tracker.entries(), self.tracker.rules(), now),
            tracked: self.tracker.len(),
            unrefreshed: snapshot.failed,
            export_file: self
                .exporter
                .as_ref()
                .and_then(|e| e.current_file())
                .map(|p| p.to_path_buf()),
        };
        self.renderer.render(&plan)?;

        if let Some(exporter) = self.exporter.as_mut() {
            exporter.append_row(self.tracker.entries(), now)?;
        }

        debug!(
            "Cycle {} sampled {} queues ({} missing, {} failed)",
            stats.cycles,
            snapshot.samples.len(),
            snapshot.missing.len(),
            plan.unrefreshed.len()
        );
        Ok(())
    }
}
