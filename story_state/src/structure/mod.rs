//! Dramatic structure, inter-line tensions and thematic questions.
//!
//! These structures are descriptive: the engine reads them to score lines and
//! fire rules but never rewrites them itself.

mod tension;
mod theme;

pub use tension::*;
pub use theme::*;

use serde::{Deserialize, Serialize};

use crate::de::null_as_default;

/// Three-act position of the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Act {
    #[default]
    Setup,
    Confrontation,
    Resolution,
}

impl Act {
    pub fn as_str(&self) -> &'static str {
        match self {
            Act::Setup => "setup",
            Act::Confrontation => "confrontation",
            Act::Resolution => "resolution",
        }
    }
}

impl std::fmt::Display for Act {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boundaries between narrative phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurningPointKind {
    IncitingIncident,
    FirstPlotPoint,
    Midpoint,
    Crisis,
    ClimaxPoint,
    Denouement,
}

impl TurningPointKind {
    pub const ALL: [TurningPointKind; 6] = [
        TurningPointKind::IncitingIncident,
        TurningPointKind::FirstPlotPoint,
        TurningPointKind::Midpoint,
        TurningPointKind::Crisis,
        TurningPointKind::ClimaxPoint,
        TurningPointKind::Denouement,
    ];
}

/// A turning point and whether the story has reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurningPoint {
    #[serde(rename = "type")]
    pub kind: TurningPointKind,
    #[serde(default)]
    pub unit_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reached: bool,
}

impl TurningPoint {
    pub fn new(kind: TurningPointKind) -> Self {
        Self {
            kind,
            unit_id: None,
            description: String::new(),
            reached: false,
        }
    }
}

/// The overall dramatic arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaticStructure {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_act: Act,

    #[serde(default)]
    pub total_planned_units: Option<u32>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub turning_points: Vec<TurningPoint>,
}

impl Default for DramaticStructure {
    fn default() -> Self {
        Self {
            current_act: Act::Setup,
            total_planned_units: None,
            turning_points: TurningPointKind::ALL
                .into_iter()
                .map(TurningPoint::new)
                .collect(),
        }
    }
}

impl DramaticStructure {
    pub fn with_planned_units(mut self, total: u32) -> Self {
        self.total_planned_units = Some(total);
        self
    }

    pub fn with_act(mut self, act: Act) -> Self {
        self.current_act = act;
        self
    }

    /// First turning point not yet reached, in declaration order.
    pub fn next_turning_point(&self) -> Option<&TurningPoint> {
        self.turning_points.iter().find(|tp| !tp.reached)
    }

    pub fn reached_count(&self) -> usize {
        self.turning_points.iter().filter(|tp| tp.reached).count()
    }

    /// Mark a turning point as reached. Returns false if it is not declared.
    pub fn reach(&mut self, kind: TurningPointKind) -> bool {
        match self.turning_points.iter_mut().find(|tp| tp.kind == kind) {
            Some(tp) => {
                tp.reached = true;
                true
            }
            None => false,
        }
    }

    /// Progress through the planned units as a 0-100 percentage.
    pub fn progress_percent(&self, current_cycle: i64) -> Option<u32> {
        match self.total_planned_units {
            Some(total) if total > 0 => {
                let pct = (current_cycle as f64 / total as f64 * 100.0).round();
                Some(pct.max(0.0) as u32)
            }
            _ => None,
        }
    }
}
