//! Agent output contracts.
//!
//! Agents are loose about shape: fields get renamed, booleans arrive as
//! "yes"/"oui", projections as a single string. Parsing accepts the known
//! aliases, ignores unknown fields and never requires an optional one.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use story_state::normalize_label;

use super::Role;
use crate::error::PipelineError;

/// Strip a Markdown code fence around a JSON payload, if any.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_json<T: for<'de> Deserialize<'de>>(role: Role, raw: &str) -> Result<T, PipelineError> {
    serde_json::from_str(extract_json(raw))
        .map_err(|source| PipelineError::InvalidOutput { role, source })
}

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `true`, `"yes"`, `"oui"`, `"true"` or a non-zero number.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => matches!(
            normalize_label(&s).as_str(),
            "yes" | "oui" | "true" | "y" | "o"
        ),
        _ => false,
    })
}

/// A single string or a list of strings.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(vec![s]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

/// What the analyst asks of one line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineNeed {
    #[serde(default)]
    pub need: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub required_agency: Option<String>,
    #[serde(default)]
    pub chosen_projection: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystConstraints {
    #[serde(default, deserialize_with = "null_as_default")]
    pub per_line: BTreeMap<String, LineNeed>,
    #[serde(default)]
    pub general_constraints: Value,
}

/// Analyst output: structured constraints, or free text when the agent did
/// not answer in the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalystOutput {
    Structured(AnalystConstraints),
    Text(String),
}

impl AnalystOutput {
    /// Never fails: anything that is not the structured contract is kept as
    /// text.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<AnalystConstraints>(extract_json(raw)) {
            Ok(constraints) => AnalystOutput::Structured(constraints),
            Err(_) => AnalystOutput::Text(raw.trim().to_string()),
        }
    }

    /// Rendering handed to the writer and critic.
    pub fn constraints_text(&self) -> String {
        match self {
            AnalystOutput::Text(text) => text.clone(),
            AnalystOutput::Structured(constraints) => serde_json::to_string_pretty(constraints)
                .unwrap_or_else(|_| format!("{:?}", constraints)),
        }
    }
}

/// The critic's verdict on one assigned line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticLineUpdate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "lineName")]
    pub name: Option<String>,
    /// Raw label; parsed leniently at apply time.
    #[serde(default, alias = "status")]
    pub new_status: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub advanced: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub new_projection: Option<Vec<String>>,
}

/// A line the critic wants created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineProposal {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub narrative_function: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub projection: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticOutput {
    #[serde(default, alias = "lines", deserialize_with = "null_as_default")]
    pub line_updates: Vec<CriticLineUpdate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_lines: Vec<NewLineProposal>,
    #[serde(default, alias = "title")]
    pub suggested_title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl CriticOutput {
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        parse_json(Role::Critic, raw)
    }
}

/// How the verifier saw a line in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierTouch {
    DirectlyAdvanced,
    Mentioned,
    Thematic,
    Absent,
}

impl VerifierTouch {
    /// Lenient: English or French, any case, accents optional.
    pub fn parse(label: &str) -> Option<Self> {
        match normalize_label(label).replace('_', " ").as_str() {
            "directly advanced" | "direct" | "advanced" | "directement avancee" => {
                Some(VerifierTouch::DirectlyAdvanced)
            }
            "mentioned" | "mentionnee" | "mentionne" => Some(VerifierTouch::Mentioned),
            "thematic" | "thematically touched" | "effleuree thematiquement" | "thematique" => {
                Some(VerifierTouch::Thematic)
            }
            "absent" | "absente" => Some(VerifierTouch::Absent),
            _ => None,
        }
    }

    /// Whether the touch counts as progress for the line.
    pub fn advances(&self) -> bool {
        matches!(self, VerifierTouch::DirectlyAdvanced | VerifierTouch::Mentioned)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierLineReport {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "lineName")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub touched: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, alias = "status")]
    pub new_status: Option<String>,
}

impl VerifierLineReport {
    pub fn touch(&self) -> Option<VerifierTouch> {
        self.kind.as_deref().and_then(VerifierTouch::parse)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierOutput {
    #[serde(default, alias = "lineUpdates", deserialize_with = "null_as_default")]
    pub lines: Vec<VerifierLineReport>,
}

impl VerifierOutput {
    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        parse_json(Role::Verifier, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critic_aliases() {
        let critic = CriticOutput::from_json(
            r#"{
                "lines": [
                    {"lineName": "War", "status": "en résolution", "advanced": "oui",
                     "newProjection": "A truce", "extra": 1},
                    {"id": "line-love", "advanced": false, "newProjection": null}
                ],
                "title": "The Truce",
                "newLines": null
            }"#,
        )
        .unwrap();

        assert_eq!(critic.line_updates.len(), 2);
        let war = &critic.line_updates[0];
        assert_eq!(war.name.as_deref(), Some("War"));
        assert_eq!(war.new_status.as_deref(), Some("en résolution"));
        assert!(war.advanced);
        assert_eq!(war.new_projection, Some(vec!["A truce".to_string()]));
        assert_eq!(critic.line_updates[1].new_projection, None);
        assert_eq!(critic.suggested_title.as_deref(), Some("The Truce"));
        assert!(critic.new_lines.is_empty());
    }

    #[test]
    fn test_critic_fenced_and_invalid() {
        let critic = CriticOutput::from_json("```json\n{\"summary\": \"s\"}\n```").unwrap();
        assert_eq!(critic.summary.as_deref(), Some("s"));

        let err = CriticOutput::from_json("not json").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidOutput {
                role: Role::Critic,
                ..
            }
        ));
    }

    #[test]
    fn test_verifier_report() {
        let verifier = VerifierOutput::from_json(
            r#"{"lineUpdates": [
                {"name": "Love", "touched": "yes", "type": "Mentionnée", "note": "a glance"},
                {"name": "War", "touched": true, "type": "absent"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(verifier.lines.len(), 2);
        assert!(verifier.lines[0].touched);
        assert_eq!(verifier.lines[0].touch(), Some(VerifierTouch::Mentioned));
        assert_eq!(verifier.lines[1].touch(), Some(VerifierTouch::Absent));
    }

    #[test]
    fn test_verifier_touch_labels() {
        assert_eq!(
            VerifierTouch::parse("directement avancée"),
            Some(VerifierTouch::DirectlyAdvanced)
        );
        assert_eq!(
            VerifierTouch::parse("directly_advanced"),
            Some(VerifierTouch::DirectlyAdvanced)
        );
        assert_eq!(
            VerifierTouch::parse("effleurée thématiquement"),
            Some(VerifierTouch::Thematic)
        );
        assert!(!VerifierTouch::Thematic.advances());
        assert_eq!(VerifierTouch::parse("sideways"), None);
    }

    #[test]
    fn test_analyst_output() {
        let structured = AnalystOutput::parse(
            r#"{"perLine": {"War": {"need": "escalate", "priority": "high"}},
                "generalConstraints": "At most two lines in the foreground"}"#,
        );
        match &structured {
            AnalystOutput::Structured(c) => {
                assert_eq!(c.per_line["War"].need.as_deref(), Some("escalate"));
            }
            AnalystOutput::Text(_) => panic!("expected structured output"),
        }
        assert!(structured.constraints_text().contains("escalate"));

        let text = AnalystOutput::parse("  The war must escalate.  ");
        assert_eq!(text, AnalystOutput::Text("The war must escalate.".to_string()));
        assert_eq!(text.constraints_text(), "The war must escalate.");
    }
}
