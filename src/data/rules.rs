//! Queue classification rules: importance, ignore and grouping patterns.

use regex::{Regex, RegexSet};

use crate::error::ConfigError;

/// Group name given to queues that match no configured group.
pub const DEFAULT_GROUP_NAME: &str = "NOT GROUPED";

/// Order given to ungrouped queues so they sort after every configured group.
pub const DEFAULT_GROUP_ORDER: i32 = i32::MAX;

/// A compiled list of regular expressions matched as "any of".
#[derive(Debug, Clone)]
pub struct PatternSet {
    set: RegexSet,
}

impl PatternSet {
    /// Compile the given patterns.
    ///
    /// Each pattern is compiled on its own first so that an error names the
    /// offending pattern rather than the whole list.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns: Vec<&str> = patterns.iter().map(|p| p.as_ref()).collect();

        for pattern in &patterns {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        }

        let set = RegexSet::new(&patterns).map_err(|source| ConfigError::InvalidPattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self { set })
    }

    /// A set that matches nothing.
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
        }
    }

    /// Returns true if any pattern matches the queue name.
    pub fn is_match(&self, name: &str) -> bool {
        self.set.is_match(name)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// A named display group with its sort order and member patterns.
#[derive(Debug, Clone)]
pub struct QueueGroup {
    pub name: String,
    pub order: i32,
    members: PatternSet,
}

impl QueueGroup {
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        order: i32,
        members: &[S],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            order,
            members: PatternSet::new(members)?,
        })
    }

    pub fn contains(&self, queue_name: &str) -> bool {
        self.members.is_match(queue_name)
    }
}

/// The group a queue was placed in when its trend entry was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub name: String,
    pub order: i32,
}

impl Default for GroupAssignment {
    fn default() -> Self {
        Self {
            name: DEFAULT_GROUP_NAME.to_string(),
            order: DEFAULT_GROUP_ORDER,
        }
    }
}

/// Classification and layout policy shared by the tracker and the layout pass.
#[derive(Debug, Clone, Default)]
pub struct QueueRules {
    /// Queues highlighted as important.
    pub important: PatternSet,
    /// Queues hidden from the display (they are still tracked and exported).
    pub ignored: PatternSet,
    /// Display groups, in declaration order.
    pub groups: Vec<QueueGroup>,
    pub grouping_enabled: bool,
    pub show_empty_queues: bool,
    pub order_by_queue_size: bool,
    /// Do not start tracking a queue whose first observed count is zero.
    pub skip_empty_on_create: bool,
}

impl QueueRules {
    pub fn is_important(&self, name: &str) -> bool {
        self.important.is_match(name)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.is_match(name)
    }

    /// Find the group for a queue. The first declared group that matches wins.
    pub fn assign_group(&self, name: &str) -> GroupAssignment {
        if !self.grouping_enabled {
            return GroupAssignment::default();
        }

        self.groups
            .iter()
            .find(|group| group.contains(name))
            .map(|group| GroupAssignment {
                name: group.name.clone(),
                order: group.order,
            })
            .unwrap_or_default()
    }
}
