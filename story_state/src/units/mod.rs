//! Story units: the discrete production cycles of the narrative.

mod evaluation;

pub use evaluation::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::de::null_as_default;
use crate::error::{StateError, StateResult};
use crate::lines::LineId;

/// Unique identifier for story units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Readable ID for the `number`-th chapter.
    pub fn for_chapter(number: u32) -> Self {
        Self(format!("unit-ch{}", number))
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Granularity of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    #[default]
    Chapter,
    Scene,
    Act,
    Arc,
}

/// Production status. Units only move forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Planning,
    Writing,
    Completed,
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UnitStatus::Planning => "planning",
            UnitStatus::Writing => "writing",
            UnitStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

/// A chapter, scene, act or arc of the serialized story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryUnit {
    #[serde(default)]
    pub id: UnitId,

    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub kind: UnitKind,

    /// 1-based sequence number.
    pub number: u32,

    #[serde(default)]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: UnitStatus,

    #[serde(default)]
    pub pre_evaluation: Option<PreEvaluation>,

    #[serde(default)]
    pub post_evaluation: Option<PostEvaluation>,

    /// Lines touched during this unit.
    #[serde(default, deserialize_with = "null_as_default")]
    pub advanced_lines: Vec<LineId>,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub content: String,

    /// Fingerprint of the agent outputs applied to produce this unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_key: Option<String>,
}

impl StoryUnit {
    /// Create a new unit in the planning stage.
    pub fn new(number: u32) -> Self {
        Self {
            id: UnitId::new(),
            kind: UnitKind::default(),
            number,
            title: String::new(),
            status: UnitStatus::Planning,
            pre_evaluation: None,
            post_evaluation: None,
            advanced_lines: Vec::new(),
            summary: String::new(),
            content: String::new(),
            apply_key: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_kind(mut self, kind: UnitKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_advanced_lines(mut self, lines: impl IntoIterator<Item = LineId>) -> Self {
        self.advanced_lines = lines.into_iter().collect();
        self
    }

    /// Mark the unit completed directly, bypassing the interactive lifecycle.
    pub fn completed(mut self) -> Self {
        self.status = UnitStatus::Completed;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == UnitStatus::Completed
    }

    /// Commit the pre-evaluation and move from planning to writing.
    pub fn commit_pre_evaluation(&mut self, evaluation: PreEvaluation) -> StateResult<()> {
        self.transition(UnitStatus::Planning, UnitStatus::Writing)?;
        self.pre_evaluation = Some(evaluation);
        Ok(())
    }

    /// Commit the post-evaluation and move from writing to completed.
    pub fn commit_post_evaluation(
        &mut self,
        evaluation: PostEvaluation,
        advanced_lines: Vec<LineId>,
    ) -> StateResult<()> {
        self.transition(UnitStatus::Writing, UnitStatus::Completed)?;
        self.post_evaluation = Some(evaluation);
        self.advanced_lines = advanced_lines;
        Ok(())
    }

    fn transition(&mut self, expected: UnitStatus, next: UnitStatus) -> StateResult<()> {
        if self.status != expected {
            return Err(StateError::InvalidTransition {
                number: self.number,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_lifecycle() {
        let mut unit = StoryUnit::new(1).with_title("Opening");
        assert_eq!(unit.status, UnitStatus::Planning);

        unit.commit_pre_evaluation(PreEvaluation::default()).unwrap();
        assert_eq!(unit.status, UnitStatus::Writing);
        assert!(unit.pre_evaluation.is_some());

        unit.commit_post_evaluation(PostEvaluation::default(), vec![LineId::from("line-a")])
            .unwrap();
        assert!(unit.is_completed());
        assert_eq!(unit.advanced_lines.len(), 1);
    }

    #[test]
    fn test_no_backward_transitions() {
        let mut unit = StoryUnit::new(2);
        let err = unit
            .commit_post_evaluation(PostEvaluation::default(), Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::InvalidTransition {
                from: UnitStatus::Planning,
                to: UnitStatus::Completed,
                ..
            }
        ));

        let mut done = StoryUnit::new(3).completed();
        assert!(done.commit_pre_evaluation(PreEvaluation::default()).is_err());
        assert_eq!(done.status, UnitStatus::Completed);
    }

    #[test]
    fn test_unit_json_shape() {
        let json = r#"{"id": "unit-ch1", "type": "chapter", "number": 1, "status": "completed",
            "preEvaluation": null, "advancedLines": ["line-war"], "summary": "It begins."}"#;
        let unit: StoryUnit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.id, UnitId::for_chapter(1));
        assert!(unit.is_completed());
        assert!(unit.pre_evaluation.is_none());
        assert_eq!(unit.advanced_lines, vec![LineId::from("line-war")]);
    }
}
