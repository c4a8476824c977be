//! Thematic questions the story keeps returning to.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::de::null_as_default;
use crate::lines::LineId;

/// One unit's contribution to a thematic question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    #[serde(default)]
    pub unit_number: Option<u32>,
    #[serde(default)]
    pub note: String,
}

/// A question the narrative explores across its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThematicQuestion {
    #[serde(default = "new_question_id")]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_lines: Vec<LineId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contributions: Vec<Contribution>,
}

fn new_question_id() -> String {
    Uuid::new_v4().to_string()
}

impl ThematicQuestion {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: new_question_id(),
            question: question.into(),
            description: String::new(),
            related_lines: Vec::new(),
            contributions: Vec::new(),
        }
    }

    pub fn with_line(mut self, id: impl Into<LineId>) -> Self {
        self.related_lines.push(id.into());
        self
    }

    pub fn with_contribution(mut self, unit_number: u32, note: impl Into<String>) -> Self {
        self.contributions.push(Contribution {
            unit_number: Some(unit_number),
            note: note.into(),
        });
        self
    }

    pub fn concerns(&self, id: &LineId) -> bool {
        self.related_lines.contains(id)
    }

    /// Most recent unit number that fed this question.
    pub fn last_contribution(&self) -> Option<u32> {
        self.contributions.iter().filter_map(|c| c.unit_number).max()
    }

    /// Cycles since the question was last fed; `current_cycle` if never fed.
    pub fn staleness(&self, current_cycle: i64) -> i64 {
        match self.last_contribution() {
            Some(n) => current_cycle - n as i64,
            None => current_cycle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_contribution_ignores_order() {
        let q = ThematicQuestion::new("Can power be shared?")
            .with_contribution(5, "")
            .with_contribution(2, "");
        assert_eq!(q.last_contribution(), Some(5));
        assert_eq!(q.staleness(8), 3);
    }

    #[test]
    fn test_unfed_question() {
        let q = ThematicQuestion::new("What is owed?");
        assert_eq!(q.last_contribution(), None);
        assert_eq!(q.staleness(4), 4);
    }
}
