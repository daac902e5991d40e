//! Classification and ordering of trend entries for display.
//!
//! [`layout`] turns the tracker's entries into an ordered list of
//! [`PlanRow`]s: filtered, sorted, split into groups and tagged with a
//! [`ColorClass`]. Renderers only ever see this output.

use std::cmp::Ordering;

use chrono::{DateTime, Local};

use super::labels::{conclusion_label, remaining_label, speed_label};
use super::rules::QueueRules;
use super::trend::TrendEntry;

/// Visual emphasis for a queue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorClass {
    /// Important queue that grew past its peak.
    HighAlert,
    /// Important queue that is draining.
    HighRelief,
    /// Important queue with no movement.
    Alert,
    /// Queue that grew past its peak.
    Attention,
    /// Queue that is draining.
    Relief,
    Neutral,
}

impl ColorClass {
    pub fn classify(entry: &TrendEntry) -> Self {
        match (entry.is_important, entry.increased, entry.decreased) {
            (true, true, _) => ColorClass::HighAlert,
            (true, false, true) => ColorClass::HighRelief,
            (true, false, false) => ColorClass::Alert,
            (false, true, _) => ColorClass::Attention,
            (false, false, true) => ColorClass::Relief,
            (false, false, false) => ColorClass::Neutral,
        }
    }
}

/// One queue's line in the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRow {
    pub name: String,
    pub current_count: u64,
    pub speed: String,
    pub remaining: String,
    pub conclusion: String,
    pub color: ColorClass,
    pub group_name: String,
    pub group_order: i32,
}

impl RenderRow {
    pub fn from_entry(entry: &TrendEntry, now: DateTime<Local>) -> Self {
        let metrics = entry.metrics(now);
        Self {
            name: entry.name.clone(),
            current_count: entry.current_count,
            speed: speed_label(metrics.speed),
            remaining: remaining_label(metrics.remaining),
            conclusion: conclusion_label(metrics.remaining, metrics.conclusion),
            color: ColorClass::classify(entry),
            group_name: entry.group.name.clone(),
            group_order: entry.group.order,
        }
    }
}

/// A line of the render plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanRow {
    /// Blank line separating two groups.
    Spacer,
    /// Upper-cased group name, no metrics.
    GroupHeader(String),
    Queue(RenderRow),
}

impl PlanRow {
    pub fn as_queue(&self) -> Option<&RenderRow> {
        match self {
            PlanRow::Queue(row) => Some(row),
            _ => None,
        }
    }
}

/// Filter, order, group and classify entries for display.
pub fn layout<'a, I>(entries: I, rules: &QueueRules, now: DateTime<Local>) -> Vec<PlanRow>
where
    I: IntoIterator<Item = &'a TrendEntry>,
{
    let mut visible: Vec<&TrendEntry> = entries
        .into_iter()
        .filter(|e| !rules.is_ignored(&e.name))
        .filter(|e| rules.show_empty_queues || e.first_count != 0 || e.current_count != 0)
        .collect();

    visible.sort_by(|a, b| compare(a, b, rules));

    let mut rows = Vec::with_capacity(visible.len());
    let mut previous_group: Option<&str> = None;

    for entry in visible {
        if rules.grouping_enabled && previous_group != Some(entry.group.name.as_str()) {
            if previous_group.is_some() {
                rows.push(PlanRow::Spacer);
            }
            rows.push(PlanRow::GroupHeader(entry.group.name.to_uppercase()));
            previous_group = Some(entry.group.name.as_str());
        }
        rows.push(PlanRow::Queue(RenderRow::from_entry(entry, now)));
    }

    rows
}

fn compare(a: &TrendEntry, b: &TrendEntry, rules: &QueueRules) -> Ordering {
    let by_size = |a: &TrendEntry, b: &TrendEntry| {
        if rules.order_by_queue_size {
            b.current_count.cmp(&a.current_count)
        } else {
            Ordering::Equal
        }
    };

    let primary = if rules.grouping_enabled {
        a.group
            .order
            .cmp(&b.group.order)
            .then_with(|| a.group.name.cmp(&b.group.name))
            .then_with(|| by_size(a, b))
    } else {
        by_size(a, b)
    };

    primary.then_with(|| a.name.cmp(&b.name))
}
