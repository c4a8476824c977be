//! The narrative line: an independently tracked thread of plot or character
//! development.

use serde::{Deserialize, Serialize};

use super::{HistoryEntry, LineId};
use crate::de::null_as_default;
use crate::mechanics::{Agency, LineLevel, LineStatus, NarrativeFunction};

/// Sentinel for "never advanced".
pub const NEVER_ADVANCED: i64 = -1;

/// A narrative line with its mechanical state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeLine {
    #[serde(default)]
    pub id: LineId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: LineStatus,

    #[serde(default, deserialize_with = "null_as_default")]
    pub level: LineLevel,

    #[serde(default, deserialize_with = "null_as_default")]
    pub narrative_function: NarrativeFunction,

    #[serde(default, deserialize_with = "null_as_default")]
    pub agency: Agency,

    /// Narrative prominence (0.0 - 1.0).
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Derived pressure score (0.0 - 0.95). Only the scoring recompute writes it.
    #[serde(default)]
    pub urgency: f64,

    #[serde(default)]
    pub created_in_unit: i64,

    #[serde(default = "default_last_advanced")]
    pub last_advanced_in_unit: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<LineId>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    /// Possible next developments, most plausible first.
    #[serde(default, deserialize_with = "null_as_default")]
    pub projection: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<HistoryEntry>,
}

fn default_weight() -> f64 {
    0.5
}

fn default_last_advanced() -> i64 {
    NEVER_ADVANCED
}

impl NarrativeLine {
    /// Create a new dormant major tension line with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LineId::new(),
            name: name.into(),
            description: String::new(),
            status: LineStatus::default(),
            level: LineLevel::default(),
            narrative_function: NarrativeFunction::default(),
            agency: Agency::default(),
            weight: default_weight(),
            urgency: 0.0,
            created_in_unit: 0,
            last_advanced_in_unit: NEVER_ADVANCED,
            dependencies: Vec::new(),
            tags: Vec::new(),
            projection: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<LineId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: LineStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_level(mut self, level: LineLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_function(mut self, function: NarrativeFunction) -> Self {
        self.narrative_function = function;
        self
    }

    pub fn with_agency(mut self, agency: Agency) -> Self {
        self.agency = agency;
        self
    }

    /// Set the weight, clamped to 0.0 - 1.0.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn created_in(mut self, unit: i64) -> Self {
        self.created_in_unit = unit;
        self
    }

    pub fn advanced_in(mut self, unit: i64) -> Self {
        self.last_advanced_in_unit = unit;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_dependency(mut self, id: impl Into<LineId>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection.push(projection.into());
        self
    }

    /// The most recent cycle the line was touched: its last advance, or its
    /// creation if it was never advanced since.
    pub fn last_touched(&self) -> i64 {
        self.last_advanced_in_unit.max(self.created_in_unit)
    }

    /// Cycles elapsed since the line was last touched.
    pub fn gap(&self, current_cycle: i64) -> i64 {
        current_cycle - self.last_touched()
    }

    /// Cycles elapsed since the last recorded advance, ignoring creation.
    pub fn cycles_since_advance(&self, current_cycle: i64) -> i64 {
        current_cycle - self.last_advanced_in_unit
    }

    /// Cycles the line has been open.
    pub fn age(&self, current_cycle: i64) -> i64 {
        current_cycle - self.created_in_unit
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    /// Case-insensitive tag lookup.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// The cycle from which the line has been continuously passive, or `None`
    /// if it is not passive now.
    ///
    /// History entries without a recorded agency do not interrupt the run.
    pub fn passive_since(&self) -> Option<i64> {
        if self.agency != Agency::Passive {
            return None;
        }

        let mut earliest_passive = None;
        for entry in self.history.iter().rev() {
            match entry.agency_after {
                Some(Agency::Passive) => earliest_passive = Some(entry.cycle()),
                Some(_) => return Some(earliest_passive.unwrap_or(entry.cycle() + 1)),
                None => {}
            }
        }
        Some(self.created_in_unit)
    }

    /// The last `n` history entries, oldest first.
    pub fn recent_history(&self, n: usize) -> &[HistoryEntry] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Append a history entry. History is never rewritten.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }
}
