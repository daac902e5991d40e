//! Layered configuration.
//!
//! Values are resolved in order: built-in defaults, an optional config file
//! (format detected from its extension), `AZQMON_*` environment variables and
//! finally command-line overrides. The merged [`Settings`] are then validated
//! into a [`MonitorConfig`] with compiled patterns and resolved paths.
//!
//! Keys are snake_case. The PascalCase names used by older JSON config files
//! (`ConnectionString`, `PollingInterval`, `QueueGroups`, ...) are rewritten
//! to their snake_case form when the file is read, so later layers override
//! them like any other key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, Map, Value};
use serde::Deserialize;
use tracing::debug;

use crate::data::{PatternSet, QueueGroup, QueueRules};
use crate::error::ConfigError;
use crate::monitor::PollSettings;

/// One entry of `queue_groups`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSettings {
    #[serde(alias = "GroupName", alias = "groupname")]
    pub group_name: String,
    #[serde(default, alias = "Order")]
    pub order: i32,
    #[serde(default, alias = "Queues")]
    pub queues: Vec<String>,
}

/// Raw, merged configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection_string: Option<String>,
    pub title: String,
    pub poll_interval_ms: u64,
    pub show_empty_queues: bool,
    pub order_by_queue_size: bool,
    pub export_count_data: bool,
    pub export_path: Option<PathBuf>,
    pub ignored_queues: Vec<String>,
    pub important_queues: Vec<String>,
    pub group_queues: bool,
    pub queue_groups: Vec<GroupSettings>,
    pub reset_every_cycles: u64,
    pub skip_empty_on_create: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection_string: None,
            title: defaults::TITLE.to_string(),
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            show_empty_queues: false,
            order_by_queue_size: false,
            export_count_data: false,
            export_path: None,
            ignored_queues: Vec::new(),
            important_queues: Vec::new(),
            group_queues: false,
            queue_groups: Vec::new(),
            reset_every_cycles: defaults::RESET_EVERY_CYCLES,
            skip_empty_on_create: false,
            log_file: None,
        }
    }
}

mod defaults {
    pub const TITLE: &str = "Azure Queue Monitor";
    pub const POLL_INTERVAL_MS: u64 = 2000;
    pub const RESET_EVERY_CYCLES: u64 = 50;
}

/// Values supplied on the command line. `None` leaves lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub title: Option<String>,
    pub connection_string: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub export: bool,
    pub export_path: Option<PathBuf>,
    pub show_empty: bool,
    pub order_by_size: bool,
    pub log_file: Option<PathBuf>,
}

/// Validated configuration ready to start the monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub connection_string: String,
    pub rules: QueueRules,
    pub poll: PollSettings,
    /// Directory for CSV history, `None` when export is disabled.
    pub export_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Merge all configuration layers.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            debug!("Loading configuration from {}", path.display());
            for (key, value) in read_file(path)? {
                builder = builder.set_default(canonical_key(&key), value)?;
            }
        }

        let builder = builder
            .add_source(
                Environment::with_prefix("AZQMON")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(";")
                    .with_list_parse_key("ignored_queues")
                    .with_list_parse_key("important_queues")
                    .try_parsing(true),
            )
            .set_override_option("title", overrides.title.clone())?
            .set_override_option(
                "connection_string",
                overrides.connection_string.clone(),
            )?
            .set_override_option("poll_interval_ms", overrides.poll_interval_ms)?
            .set_override_option("export_count_data", overrides.export.then_some(true))?
            .set_override_option(
                "export_path",
                overrides.export_path.as_ref().map(|p| p.display().to_string()),
            )?
            .set_override_option("show_empty_queues", overrides.show_empty.then_some(true))?
            .set_override_option(
                "order_by_queue_size",
                overrides.order_by_size.then_some(true),
            )?
            .set_override_option(
                "log_file",
                overrides.log_file.as_ref().map(|p| p.display().to_string()),
            )?;

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check required values and compile queue patterns.
    pub fn validate(self) -> Result<MonitorConfig, ConfigError> {
        let connection_string = self
            .connection_string
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingConnectionString)?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        let groups = self
            .queue_groups
            .iter()
            .map(|g| QueueGroup::new(&g.group_name, g.order, &g.queues))
            .collect::<Result<Vec<_>, _>>()?;

        let rules = QueueRules {
            important: PatternSet::new(&self.important_queues)?,
            ignored: PatternSet::new(&self.ignored_queues)?,
            groups,
            grouping_enabled: self.group_queues,
            show_empty_queues: self.show_empty_queues,
            order_by_queue_size: self.order_by_queue_size,
            skip_empty_on_create: self.skip_empty_on_create,
        };

        let export_dir = self
            .export_count_data
            .then(|| self.export_path.clone().unwrap_or_else(default_export_dir));

        Ok(MonitorConfig {
            connection_string,
            rules,
            poll: PollSettings {
                title: self.title,
                interval: Duration::from_millis(self.poll_interval_ms),
                reset_every: self.reset_every_cycles,
            },
            export_dir,
            log_file: self.log_file,
        })
    }
}

/// Top-level keys of a config file, before any renaming.
fn read_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    Ok(Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize()?)
}

/// Map a legacy key (`PollingInterval`, `connectionstring`) to its snake_case
/// name. Unknown keys pass through unchanged.
fn canonical_key(key: &str) -> String {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let canonical = match folded.as_str() {
        "connectionstring" => "connection_string",
        "title" => "title",
        "pollinginterval" | "pollintervalms" => "poll_interval_ms",
        "showemptyqueues" => "show_empty_queues",
        "orderbyqueuesize" => "order_by_queue_size",
        "exportcountdata" => "export_count_data",
        "exportpath" => "export_path",
        "ignoredqueues" => "ignored_queues",
        "importantqueues" => "important_queues",
        "groupqueues" => "group_queues",
        "queuegroups" => "queue_groups",
        "reseteverycycles" => "reset_every_cycles",
        "skipemptyoncreate" => "skip_empty_on_create",
        "logfile" => "log_file",
        _ => return key.to_string(),
    };
    canonical.to_string()
}

/// The user's documents directory, falling back to home and then the
/// working directory.
pub fn default_export_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
