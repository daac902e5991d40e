//! Display labels for trend metrics.

use chrono::{DateTime, Local, TimeDelta};

/// Format a speed as `"{n}/s"`, or an empty string when there is nothing to show.
pub fn speed_label(speed: Option<u64>) -> String {
    match speed {
        Some(s) if s > 0 => format!("{}/s", s),
        _ => String::new(),
    }
}

/// Format a remaining drain time as `H:MM:SS` using total hours.
///
/// A zero or negative duration renders as empty.
pub fn remaining_label(remaining: Option<TimeDelta>) -> String {
    match remaining {
        Some(r) if r > TimeDelta::zero() => {
            let secs = r.num_seconds();
            format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
        _ => String::new(),
    }
}

/// Format the estimated conclusion as `dd/MM HH:mm`.
///
/// Empty unless the remaining time is positive, matching [`remaining_label`].
pub fn conclusion_label(
    remaining: Option<TimeDelta>,
    conclusion: Option<DateTime<Local>>,
) -> String {
    match (remaining, conclusion) {
        (Some(r), Some(at)) if r > TimeDelta::zero() => at.format("%d/%m %H:%M").to_string(),
        _ => String::new(),
    }
}

/// Format large numbers with K/M suffixes
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
