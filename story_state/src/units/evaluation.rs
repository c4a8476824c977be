//! Evaluation snapshots attached to story units.

use serde::{Deserialize, Serialize};

use crate::lines::LineId;
use crate::mechanics::{Agency, LineStatus};
use crate::structure::{Act, TensionKind, TurningPointKind};

/// State of one line as seen before a unit is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSnapshot {
    pub line_id: LineId,
    pub name: String,
    pub weight: f64,
    pub urgency: f64,
    pub status: LineStatus,
    #[serde(default)]
    pub agency: Agency,
    pub importance: f64,
    #[serde(default)]
    pub notes: String,
}

/// Last contribution seen for a thematic question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeProgress {
    pub question: String,
    pub last_contribution: Option<u32>,
}

/// An active tension, named by its endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TensionSummary {
    pub lines: Vec<String>,
    pub kind: TensionKind,
    pub strength: f64,
}

/// Structural position of the story at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StructuralContext {
    #[serde(default)]
    pub current_act: Option<Act>,
    #[serde(default)]
    pub total_planned_units: Option<u32>,
    /// Percentage of planned units reached, when a plan exists.
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub next_turning_point: Option<TurningPointKind>,
    #[serde(default)]
    pub thematic_questions: Vec<ThemeProgress>,
    #[serde(default)]
    pub active_tensions: Vec<TensionSummary>,
}

/// Snapshot committed when a unit enters the writing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreEvaluation {
    #[serde(default)]
    pub line_snapshots: Vec<LineSnapshot>,
    #[serde(default)]
    pub priorities: Vec<LineId>,
    #[serde(default)]
    pub structural_context: StructuralContext,
    #[serde(default)]
    pub global_notes: String,
}

/// Before/after record for one line changed during a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineUpdateRecord {
    pub line_id: LineId,
    pub name: String,
    pub weight_before: f64,
    pub weight_after: f64,
    pub urgency_before: f64,
    pub urgency_after: f64,
    pub status_before: LineStatus,
    pub status_after: LineStatus,
    pub advanced: bool,
    #[serde(default)]
    pub notes: String,
}

/// Snapshot committed when a unit is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostEvaluation {
    #[serde(default)]
    pub line_updates: Vec<LineUpdateRecord>,
    #[serde(default)]
    pub next_priorities: Vec<LineId>,
    #[serde(default)]
    pub narrative_notes: String,
    /// Messages of the rules that fired after the unit.
    #[serde(default)]
    pub rules_triggered: Vec<String>,
}
