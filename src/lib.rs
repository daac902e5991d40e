//! # azqmon
//!
//! A live terminal dashboard for Azure Storage queues.
//!
//! The monitor samples the approximate message count of every queue in an
//! account at a fixed cadence and shows how each one evolves: current size,
//! drain speed, estimated time until empty and when that will be. Queues
//! that grow past their peak, drain, or match an "important" pattern are
//! highlighted, and queues can be grouped under named headers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            PollLoop                              │
//! │  ┌─────────┐    ┌──────────────┐    ┌─────────┐    ┌──────────┐ │
//! │  │ source  │───▶│ TrendTracker │───▶│ layout  │───▶│ Renderer │ │
//! │  │ (input) │    │   (data)     │    │ (data)  │    │   (ui)   │ │
//! │  └─────────┘    └──────┬───────┘    └─────────┘    └──────────┘ │
//! │       ▲                │                                         │
//! │       │                ▼                                         │
//! │  Azure | File    HistoryExporter (CSV)                           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: The [`QueueSource`] trait with Azure Storage and JSON file backends
//! - **[`data`]**: Trend state per queue ([`TrendTracker`]), queue rules, label
//!   formatting and the layout that turns entries into display rows
//! - **[`monitor`]**: The [`PollLoop`] with drift-corrected cadence, periodic
//!   resets and cooperative cancellation
//! - **[`export`]**: CSV history of counts ([`HistoryExporter`])
//! - **[`ui`]**: ratatui rendering of a [`RenderPlan`]
//! - **[`settings`]**: Layered configuration and validation
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Monitor a storage account
//! azqmon --connection-string "DefaultEndpointsProtocol=https;AccountName=...;AccountKey=..."
//!
//! # Use a config file and export counts to CSV
//! azqmon --config azqmon.json --export --export-path ./history
//!
//! # Monitor a JSON file of counts
//! azqmon --connection-string file:queues.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use azqmon::{connect, PollLoop, PollSettings, QueueRules, TerminalRenderer, TerminalSession};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio_test::block_on(async {
//! let source = connect("UseDevelopmentStorage=true").unwrap();
//! let _session = TerminalSession::enter("queues").unwrap();
//! let renderer = TerminalRenderer::stdout().unwrap();
//!
//! let mut poll = PollLoop::new(
//!     source,
//!     Box::new(renderer),
//!     Arc::new(QueueRules::default()),
//!     PollSettings::default(),
//! );
//! poll.run(CancellationToken::new()).await.unwrap();
//! # });
//! ```
//!
//! ### Tracking trends directly
//!
//! ```
//! use std::sync::Arc;
//! use azqmon::{QueueRules, QueueSnapshot, TrendTracker};
//! use chrono::Local;
//!
//! let mut tracker = TrendTracker::new(Arc::new(QueueRules::default()));
//! tracker.ingest(&QueueSnapshot::from_counts([("orders", 100)]), Local::now());
//! tracker.ingest(&QueueSnapshot::from_counts([("orders", 60)]), Local::now());
//!
//! let entry = tracker.get("orders").unwrap();
//! assert_eq!(entry.processed(), 40);
//! assert!(entry.decreased);
//! ```

pub mod data;
pub mod error;
pub mod events;
pub mod export;
pub mod logging;
pub mod monitor;
pub mod settings;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use data::{
    layout, ColorClass, PlanRow, QueueGroup, QueueRules, RenderRow, TrendEntry, TrendMetrics,
    TrendTracker,
};
pub use error::{ConfigError, ExportError, MonitorError, SourceError};
pub use export::HistoryExporter;
pub use monitor::{sleep_budget, LoopState, LoopStats, PollLoop, PollSettings};
pub use settings::{MonitorConfig, Overrides, Settings};
pub use source::{connect, FileSource, QueueHandle, QueueSnapshot, QueueSource};
pub use ui::{RenderPlan, Renderer, TerminalRenderer, TerminalSession, Theme};
