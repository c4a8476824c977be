//! Narrative mechanics: line statuses, levels, functions, agency and the
//! coefficient tables the scoring layer reads.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::StateError;

/// Lifecycle stage of a narrative line, ordered from dormant to resolved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    #[default]
    Dormant,
    Emerging,
    Active,
    Climax,
    Resolving,
    Resolved,
}

impl LineStatus {
    pub const ALL: [LineStatus; 6] = [
        LineStatus::Dormant,
        LineStatus::Emerging,
        LineStatus::Active,
        LineStatus::Climax,
        LineStatus::Resolving,
        LineStatus::Resolved,
    ];

    /// Position in the dormant..resolved progression (0..=5).
    pub fn ordinal(&self) -> u8 {
        match self {
            LineStatus::Dormant => 0,
            LineStatus::Emerging => 1,
            LineStatus::Active => 2,
            LineStatus::Climax => 3,
            LineStatus::Resolving => 4,
            LineStatus::Resolved => 5,
        }
    }

    /// Urgency multiplier applied to the time-decay term.
    pub fn urgency_multiplier(&self) -> f64 {
        match self {
            LineStatus::Dormant => 0.3,
            LineStatus::Emerging => 0.6,
            LineStatus::Active => 1.0,
            LineStatus::Climax => 1.5,
            LineStatus::Resolving => 1.2,
            LineStatus::Resolved => 0.0,
        }
    }

    /// Bonus added to importance when ranking lines for selection.
    pub fn importance_bonus(&self) -> f64 {
        match self {
            LineStatus::Climax => 0.20,
            LineStatus::Resolving => 0.15,
            LineStatus::Active => 0.10,
            _ => 0.0,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, LineStatus::Resolved)
    }

    /// Neither dormant nor resolved.
    pub fn is_open(&self) -> bool {
        !matches!(self, LineStatus::Dormant | LineStatus::Resolved)
    }

    /// Active or climax: the line is in the foreground.
    pub fn is_foreground(&self) -> bool {
        matches!(self, LineStatus::Active | LineStatus::Climax)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Dormant => "dormant",
            LineStatus::Emerging => "emerging",
            LineStatus::Active => "active",
            LineStatus::Climax => "climax",
            LineStatus::Resolving => "resolving",
            LineStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LineStatus {
    type Err = StateError;

    /// Accepts the canonical names plus the French labels agents tend to echo.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_label(s);
        let status = match normalized.as_str() {
            "dormant" | "dormante" => LineStatus::Dormant,
            "emerging" | "emergente" => LineStatus::Emerging,
            "active" => LineStatus::Active,
            "climax" => LineStatus::Climax,
            "resolving" | "en resolution" => LineStatus::Resolving,
            "resolved" | "resolue" => LineStatus::Resolved,
            _ => {
                return Err(StateError::UnknownVariant {
                    kind: "line status",
                    value: s.to_string(),
                })
            }
        };
        Ok(status)
    }
}

/// Hierarchical level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineLevel {
    #[default]
    Major,
    Secondary,
    Micro,
}

impl LineLevel {
    /// Scale applied to a line's contribution to global tension.
    pub fn tension_multiplier(&self) -> f64 {
        match self {
            LineLevel::Major => 1.0,
            LineLevel::Secondary => 0.5,
            LineLevel::Micro => 0.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineLevel::Major => "major",
            LineLevel::Secondary => "secondary",
            LineLevel::Micro => "micro",
        }
    }
}

impl std::fmt::Display for LineLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LineLevel {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "major" => Ok(LineLevel::Major),
            "secondary" => Ok(LineLevel::Secondary),
            "micro" => Ok(LineLevel::Micro),
            _ => Err(StateError::UnknownVariant {
                kind: "line level",
                value: s.to_string(),
            }),
        }
    }
}

/// Why a line exists in the story, as opposed to what it is about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeFunction {
    /// Creates or escalates conflict.
    #[default]
    Tension,
    /// Releases pressure (humour, tenderness, worldbuilding).
    Relief,
    /// Plants seeds for later.
    Foreshadowing,
    /// Diverts the reader's attention.
    RedHerring,
    /// Bridges other lines.
    Connector,
    /// Exists to provoke change elsewhere.
    Catalyst,
    /// Embodies one of the story's questions.
    ThemeCarrier,
}

impl NarrativeFunction {
    /// Contribution coefficient to global tension for a line of this function
    /// at the given status. Relief lines contribute negative values.
    pub fn tension_contribution(&self, status: LineStatus) -> f64 {
        use LineStatus::*;
        match self {
            NarrativeFunction::Tension => match status {
                Dormant => 0.0,
                Emerging => 0.2,
                Active => 0.6,
                Climax => 1.0,
                Resolving => 0.4,
                Resolved => 0.0,
            },
            NarrativeFunction::Relief => match status {
                Dormant => 0.0,
                Emerging => -0.05,
                Active => -0.15,
                Climax => -0.1,
                Resolving => -0.05,
                Resolved => 0.0,
            },
            NarrativeFunction::Foreshadowing => match status {
                Dormant => 0.05,
                Emerging => 0.1,
                Active => 0.15,
                Climax => 0.3,
                Resolving => 0.1,
                Resolved => 0.0,
            },
            NarrativeFunction::RedHerring => match status {
                Dormant => 0.0,
                Emerging => 0.1,
                Active => 0.2,
                Climax => 0.1,
                Resolving => -0.1,
                Resolved => -0.05,
            },
            NarrativeFunction::Connector => match status {
                Dormant => 0.0,
                Emerging => 0.05,
                Active => 0.1,
                Climax => 0.2,
                Resolving => 0.05,
                Resolved => 0.0,
            },
            NarrativeFunction::Catalyst => match status {
                Dormant => 0.0,
                Emerging => 0.15,
                Active => 0.4,
                Climax => 0.7,
                Resolving => 0.2,
                Resolved => 0.0,
            },
            NarrativeFunction::ThemeCarrier => match status {
                Dormant => 0.05,
                Emerging => 0.1,
                Active => 0.2,
                Climax => 0.5,
                Resolving => 0.15,
                Resolved => 0.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeFunction::Tension => "tension",
            NarrativeFunction::Relief => "relief",
            NarrativeFunction::Foreshadowing => "foreshadowing",
            NarrativeFunction::RedHerring => "red_herring",
            NarrativeFunction::Connector => "connector",
            NarrativeFunction::Catalyst => "catalyst",
            NarrativeFunction::ThemeCarrier => "theme_carrier",
        }
    }
}

impl std::fmt::Display for NarrativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NarrativeFunction {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let function = match normalize_label(s).replace(' ', "_").as_str() {
            "tension" => NarrativeFunction::Tension,
            "relief" => NarrativeFunction::Relief,
            "foreshadowing" => NarrativeFunction::Foreshadowing,
            "red_herring" => NarrativeFunction::RedHerring,
            "connector" => NarrativeFunction::Connector,
            "catalyst" => NarrativeFunction::Catalyst,
            "theme_carrier" => NarrativeFunction::ThemeCarrier,
            _ => {
                return Err(StateError::UnknownVariant {
                    kind: "narrative function",
                    value: s.to_string(),
                })
            }
        };
        Ok(function)
    }
}

/// Whether a line's characters act or endure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Agency {
    /// Endures events.
    Passive,
    /// Responds to events.
    #[default]
    Reactive,
    /// Initiates events.
    Proactive,
}

impl Agency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agency::Passive => "passive",
            Agency::Reactive => "reactive",
            Agency::Proactive => "proactive",
        }
    }
}

impl std::fmt::Display for Agency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Agency {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "passive" | "passif" => Ok(Agency::Passive),
            "reactive" | "reactif" => Ok(Agency::Reactive),
            "proactive" | "proactif" => Ok(Agency::Proactive),
            _ => Err(StateError::UnknownVariant {
                kind: "agency",
                value: s.to_string(),
            }),
        }
    }
}

/// Lowercase, trim and fold the accented vowels agents produce in labels.
pub fn normalize_label(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            '-' => ' ',
            other => other,
        })
        .collect()
}
