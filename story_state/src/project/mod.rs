//! Project state management - the aggregate root holding all narrative data.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::de::null_as_default;
use crate::error::{StateError, StateResult};
use crate::lines::{LineId, NarrativeLine};
use crate::structure::{DramaticStructure, LineTension, ThematicQuestion};
use crate::units::StoryUnit;

/// Project-level thresholds that override the mechanical rule defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    #[serde(default = "default_neglect")]
    pub neglect_threshold: u32,
    #[serde(default = "default_max_active")]
    pub max_active_lines_warning: u32,
    #[serde(default = "default_resolution_pressure")]
    pub resolution_pressure_threshold: u32,
}

fn default_neglect() -> u32 {
    3
}

fn default_max_active() -> u32 {
    5
}

fn default_resolution_pressure() -> u32 {
    10
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            neglect_threshold: default_neglect(),
            max_active_lines_warning: default_max_active(),
            resolution_pressure_threshold: default_resolution_pressure(),
        }
    }
}

fn default_project_name() -> String {
    "New project".to_string()
}

/// The complete state of a serialized narrative.
///
/// Optional sub-structures are always present after construction or loading;
/// absent ones are filled with empty defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default = "default_project_name")]
    pub name: String,

    pub narrative_lines: Vec<NarrativeLine>,

    pub story_units: Vec<StoryUnit>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub thematic_questions: Vec<ThematicQuestion>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub line_tensions: Vec<LineTension>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub dramatic_structure: DramaticStructure,

    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: ProjectSettings,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            narrative_lines: Vec::new(),
            story_units: Vec::new(),
            thematic_questions: Vec::new(),
            line_tensions: Vec::new(),
            dramatic_structure: DramaticStructure::default(),
            settings: ProjectSettings::default(),
        }
    }
}

impl Project {
    /// Create a new empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a project from a JSON document and validate it.
    pub fn from_json(json: &str) -> StateResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load a project from an already-parsed JSON value and validate it.
    pub fn from_value(value: serde_json::Value) -> StateResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| StateError::validation("<root>", "expected a JSON object"))?;

        for field in ["narrativeLines", "storyUnits"] {
            match object.get(field) {
                Some(serde_json::Value::Array(_)) => {}
                Some(_) => return Err(StateError::validation(field, "expected an array")),
                None => return Err(StateError::validation(field, "missing collection")),
            }
        }

        let project: Project = serde_json::from_value(value)?;
        project.validate()?;
        Ok(project)
    }

    pub fn to_json(&self) -> StateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges and id uniqueness.
    pub fn validate(&self) -> StateResult<()> {
        let mut seen = HashSet::new();
        for (i, line) in self.narrative_lines.iter().enumerate() {
            if !seen.insert(&line.id) {
                return Err(StateError::validation(
                    format!("narrativeLines[{}].id", i),
                    format!("duplicate line id '{}'", line.id),
                ));
            }
            if !line.weight.is_finite() || !(0.0..=1.0).contains(&line.weight) {
                return Err(StateError::validation(
                    format!("narrativeLines[{}].weight", i),
                    format!("{} is outside 0.0 - 1.0", line.weight),
                ));
            }
        }
        Ok(())
    }

    /// Index of the cycle being produced: the number of existing units.
    pub fn current_cycle(&self) -> i64 {
        self.story_units.len() as i64
    }

    pub fn line(&self, id: &LineId) -> Option<&NarrativeLine> {
        self.narrative_lines.iter().find(|l| &l.id == id)
    }

    pub fn line_mut(&mut self, id: &LineId) -> Option<&mut NarrativeLine> {
        self.narrative_lines.iter_mut().find(|l| &l.id == id)
    }

    /// All lines whose name matches exactly.
    pub fn lines_named(&self, name: &str) -> Vec<&NarrativeLine> {
        self.narrative_lines
            .iter()
            .filter(|l| l.name == name)
            .collect()
    }

    /// Lines that are not resolved.
    pub fn unresolved_lines(&self) -> impl Iterator<Item = &NarrativeLine> {
        self.narrative_lines.iter().filter(|l| !l.is_resolved())
    }

    /// Add a line to the project.
    pub fn add_line(&mut self, line: NarrativeLine) -> LineId {
        let id = line.id.clone();
        self.narrative_lines.push(line);
        id
    }

    /// Remove a line and every reference to it.
    pub fn remove_line(&mut self, id: &LineId) -> Option<NarrativeLine> {
        let index = self.narrative_lines.iter().position(|l| &l.id == id)?;
        let removed = self.narrative_lines.remove(index);

        for line in &mut self.narrative_lines {
            line.dependencies.retain(|d| d != id);
        }
        for unit in &mut self.story_units {
            unit.advanced_lines.retain(|l| l != id);
        }
        for question in &mut self.thematic_questions {
            question.related_lines.retain(|l| l != id);
        }
        self.line_tensions.retain(|t| !t.touches(id));

        Some(removed)
    }

    pub fn add_unit(&mut self, unit: StoryUnit) {
        self.story_units.push(unit);
    }

    pub fn add_tension(&mut self, tension: LineTension) {
        self.line_tensions.push(tension);
    }

    pub fn add_question(&mut self, question: ThematicQuestion) {
        self.thematic_questions.push(question);
    }

    /// Completed units in sequence order.
    pub fn completed_units(&self) -> Vec<&StoryUnit> {
        let mut units: Vec<_> = self
            .story_units
            .iter()
            .filter(|u| u.is_completed())
            .collect();
        units.sort_by_key(|u| u.number);
        units
    }

    /// The `n` most recent completed units, oldest first.
    pub fn recent_completed_units(&self, n: usize) -> Vec<&StoryUnit> {
        let units = self.completed_units();
        let start = units.len().saturating_sub(n);
        units[start..].to_vec()
    }

    pub fn latest_completed_unit(&self) -> Option<&StoryUnit> {
        self.completed_units().last().copied()
    }
}
