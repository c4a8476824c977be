//! Advisory alerts produced by rules.

use serde::{Deserialize, Serialize};

use story_state::{LineId, NarrativeLine};

use crate::scoring::TensionSuggestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Warning,
    Constraint,
    Guideline,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AlertKind::Warning => "warning",
            AlertKind::Constraint => "constraint",
            AlertKind::Guideline => "guideline",
        };
        write!(f, "{}", label)
    }
}

/// An ephemeral finding, recomputed every cycle and never persisted as state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub rule_id: String,
    pub rule_name: String,
    pub kind: AlertKind,
    /// Always within 0.0 - 1.0 once built through [`Alert::new`].
    pub severity: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_id: Option<LineId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<TensionSuggestion>,
}

impl Alert {
    /// Build an unscoped alert. Finite severities are clamped into 0.0 - 1.0;
    /// non-finite ones are kept so the registry can reject them.
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        kind: AlertKind,
        severity: f64,
        message: impl Into<String>,
    ) -> Self {
        let severity = if severity.is_finite() {
            severity.clamp(0.0, 1.0)
        } else {
            severity
        };
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            kind,
            severity,
            message: message.into(),
            line_id: None,
            line_name: None,
            suggestion: None,
        }
    }

    /// Scope the alert to a line.
    pub fn for_line(mut self, line: &NarrativeLine) -> Self {
        self.line_id = Some(line.id.clone());
        self.line_name = Some(line.name.clone());
        self
    }

    pub fn with_suggestion(mut self, suggestion: TensionSuggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn is_unscoped(&self) -> bool {
        self.line_id.is_none()
    }

    /// Whether the alert is unscoped or scoped to one of `ids`.
    pub fn concerns_any(&self, ids: &[&LineId]) -> bool {
        match &self.line_id {
            None => true,
            Some(id) => ids.contains(&id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_clamped() {
        let alert = Alert::new("r", "Rule", AlertKind::Warning, 1.7, "too much");
        assert_eq!(alert.severity, 1.0);
        let alert = Alert::new("r", "Rule", AlertKind::Warning, -0.2, "too little");
        assert_eq!(alert.severity, 0.0);
        let alert = Alert::new("r", "Rule", AlertKind::Warning, f64::NAN, "broken");
        assert!(alert.severity.is_nan());
    }

    #[test]
    fn test_scope() {
        let line = NarrativeLine::new("War").with_id("line-war");
        let other = LineId::from("line-peace");
        let alert = Alert::new("neglect", "Neglected line", AlertKind::Warning, 0.5, "")
            .for_line(&line);

        assert!(!alert.is_unscoped());
        assert!(alert.concerns_any(&[&line.id]));
        assert!(!alert.concerns_any(&[&other]));

        let global = Alert::new("climax-convergence", "", AlertKind::Guideline, 0.5, "");
        assert!(global.concerns_any(&[]));
    }
}
