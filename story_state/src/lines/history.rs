//! Append-only advancement log for a narrative line.

use serde::{Deserialize, Serialize};

use crate::mechanics::{Agency, LineStatus};

/// One recorded advance of a line during a story unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Identifier of the unit that produced the advance, when known.
    #[serde(default)]
    pub unit_id: Option<String>,

    /// Number of the unit (1-based) the advance happened in.
    pub unit_number: u32,

    #[serde(default)]
    pub note: String,

    pub weight_before: f64,
    pub weight_after: f64,
    pub status_before: LineStatus,
    pub status_after: LineStatus,

    /// Agency observed after the advance. Older documents do not record it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_after: Option<Agency>,
}

impl HistoryEntry {
    /// The cycle index (0-based) this entry belongs to.
    pub fn cycle(&self) -> i64 {
        self.unit_number as i64 - 1
    }

    pub fn status_changed(&self) -> bool {
        self.status_before != self.status_after
    }
}
