//! Queue state and its transformation into display rows.
//!
//! ## Submodules
//!
//! - [`rules`]: Importance, ignore and grouping rules compiled from configuration
//! - [`trend`]: Per-queue trend state ([`TrendTracker`], [`TrendEntry`])
//! - [`labels`]: Formatting of speed, remaining time and conclusion labels
//! - [`layout`]: Filtering, ordering, grouping and colour classification
//!
//! ## Data Flow
//!
//! ```text
//! QueueSnapshot (one poll cycle)
//!        │
//!        ▼
//! TrendTracker::ingest()
//!        │
//!        ▼
//! layout() ──▶ Vec<PlanRow> (headers, spacers, coloured queue rows)
//! ```

pub mod labels;
pub mod layout;
pub mod rules;
pub mod trend;

pub use layout::{layout, ColorClass, PlanRow, RenderRow};
pub use rules::{GroupAssignment, PatternSet, QueueGroup, QueueRules};
pub use trend::{TrendEntry, TrendMetrics, TrendTracker};
