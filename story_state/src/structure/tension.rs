//! Declared relationships between two narrative lines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lines::LineId;

/// Types of tension between two lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TensionKind {
    /// Advancing one strengthens the other.
    #[default]
    Symbiotic,
    /// Advancing one weakens or complicates the other.
    Contradictory,
    /// One triggers or accelerates the other.
    Catalytic,
    /// The same subject seen from two angles.
    Perspective,
    /// The same theme through different situations.
    ThematicEcho,
}

/// An edge between two lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTension {
    #[serde(default = "new_tension_id")]
    pub id: String,
    pub line_a: LineId,
    pub line_b: LineId,
    #[serde(default, rename = "type")]
    pub kind: TensionKind,
    /// Strength from 0.0 to 1.0.
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn new_tension_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_strength() -> f64 {
    0.5
}

fn default_active() -> bool {
    true
}

impl LineTension {
    pub fn new(line_a: LineId, line_b: LineId, kind: TensionKind) -> Self {
        Self {
            id: new_tension_id(),
            line_a,
            line_b,
            kind,
            strength: default_strength(),
            description: String::new(),
            active: true,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn touches(&self, id: &LineId) -> bool {
        &self.line_a == id || &self.line_b == id
    }

    /// The endpoint opposite `id`, if `id` is one of the endpoints.
    pub fn other(&self, id: &LineId) -> Option<&LineId> {
        if &self.line_a == id {
            Some(&self.line_b)
        } else if &self.line_b == id {
            Some(&self.line_a)
        } else {
            None
        }
    }
}
