//! Global tension: how much narrative pressure the open lines exert together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use story_state::{LineLevel, LineStatus, NarrativeFunction, NarrativeLine};

/// Bucketed reading of the global tension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionLabel {
    Flat,
    Low,
    Moderate,
    High,
    Overheated,
}

impl TensionLabel {
    pub fn from_value(value: f64) -> Self {
        if value > 0.75 {
            TensionLabel::Overheated
        } else if value > 0.5 {
            TensionLabel::High
        } else if value > 0.3 {
            TensionLabel::Moderate
        } else if value > 0.1 {
            TensionLabel::Low
        } else {
            TensionLabel::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TensionLabel::Flat => "flat",
            TensionLabel::Low => "low",
            TensionLabel::Moderate => "moderate",
            TensionLabel::High => "high",
            TensionLabel::Overheated => "overheated",
        }
    }
}

impl std::fmt::Display for TensionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Count and summed contribution of the lines sharing one narrative function.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionShare {
    pub count: usize,
    pub contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Create,
    Escalate,
    Diversify,
}

/// A structural nudge derived from the tension reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionSuggestion {
    pub kind: SuggestionKind,
    /// Level of the line to create, for `Create` suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LineLevel>,
    /// Function of the line to create, for `Create` suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_function: Option<NarrativeFunction>,
    pub message: String,
}

impl TensionSuggestion {
    fn create(level: LineLevel, function: NarrativeFunction, message: &str) -> Self {
        Self {
            kind: SuggestionKind::Create,
            level: Some(level),
            narrative_function: Some(function),
            message: message.to_string(),
        }
    }

    fn adjust(kind: SuggestionKind, message: String) -> Self {
        Self {
            kind,
            level: None,
            narrative_function: None,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalTension {
    pub value: f64,
    pub label: TensionLabel,
    pub breakdown: BTreeMap<NarrativeFunction, FunctionShare>,
    pub suggestions: Vec<TensionSuggestion>,
}

impl GlobalTension {
    fn flat() -> Self {
        Self {
            value: 0.0,
            label: TensionLabel::Flat,
            breakdown: BTreeMap::new(),
            suggestions: Vec::new(),
        }
    }

    fn count(&self, function: NarrativeFunction) -> usize {
        self.breakdown.get(&function).map_or(0, |share| share.count)
    }
}

/// Aggregate the tension contributed by every non-resolved line.
pub fn calculate_global_tension(lines: &[NarrativeLine]) -> GlobalTension {
    let open: Vec<&NarrativeLine> = lines.iter().filter(|l| !l.is_resolved()).collect();
    if open.is_empty() {
        return GlobalTension::flat();
    }

    let mut total = 0.0;
    let mut max_possible = 0.0;
    let mut breakdown: BTreeMap<NarrativeFunction, FunctionShare> = BTreeMap::new();

    for line in &open {
        let level_mult = line.level.tension_multiplier();
        let weighted =
            line.narrative_function.tension_contribution(line.status) * level_mult * line.weight;

        total += weighted;
        max_possible += level_mult * line.weight;

        let share = breakdown.entry(line.narrative_function).or_default();
        share.count += 1;
        share.contribution += weighted;
    }

    let value = if max_possible > 0.0 {
        (total / max_possible).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut tension = GlobalTension {
        value,
        label: TensionLabel::from_value(value),
        breakdown,
        suggestions: Vec::new(),
    };
    tension.suggestions = suggestions_for(&tension, &open);
    tension
}

/// Independent heuristics, always evaluated in the same order.
fn suggestions_for(tension: &GlobalTension, open: &[&NarrativeLine]) -> Vec<TensionSuggestion> {
    let value = tension.value;
    let relief = tension.count(NarrativeFunction::Relief);
    let pressure = tension.count(NarrativeFunction::Tension);
    let foreshadowing = tension.count(NarrativeFunction::Foreshadowing);
    let micro = open.iter().filter(|l| l.level == LineLevel::Micro).count();

    let mut suggestions = Vec::new();

    if value > 0.7 && relief == 0 {
        suggestions.push(TensionSuggestion::create(
            LineLevel::Secondary,
            NarrativeFunction::Relief,
            "High tension with no relief line. Add a lighter subplot (humour, a relationship, \
             worldbuilding) to give the reader air.",
        ));
    }

    if value > 0.8 {
        suggestions.push(TensionSuggestion::create(
            LineLevel::Micro,
            NarrativeFunction::RedHerring,
            "Narrative overheating. Consider a red herring to divert attention and restore \
             surprise later.",
        ));
    }

    if value < 0.15 && open.len() > 2 {
        suggestions.push(TensionSuggestion::create(
            LineLevel::Micro,
            NarrativeFunction::Tension,
            "Tension is flat. Add a small tension hook (a threat, a revealed secret, a deadline).",
        ));
    }

    if value < 0.25 && foreshadowing == 0 {
        suggestions.push(TensionSuggestion::create(
            LineLevel::Micro,
            NarrativeFunction::Foreshadowing,
            "No foreshadowing in play. Plant a seed (an object, a line of dialogue, a detail) \
             for a later development.",
        ));
    }

    if micro == 0 && open.len() >= 3 {
        suggestions.push(TensionSuggestion::create(
            LineLevel::Micro,
            NarrativeFunction::Connector,
            "No micro hooks. The major arcs run in parallel with nothing binding them; add a \
             connecting element that travels between lines.",
        ));
    }

    if value > 0.5 && value < 0.7 && relief > pressure {
        suggestions.push(TensionSuggestion::adjust(
            SuggestionKind::Escalate,
            "More relief lines than tension lines. Pressure may drop; escalate an existing line \
             or create a new one."
                .to_string(),
        ));
    }

    let foreground_tension: Vec<_> = open
        .iter()
        .filter(|l| l.narrative_function == NarrativeFunction::Tension)
        .filter(|l| matches!(l.status, LineStatus::Active | LineStatus::Climax))
        .collect();
    if foreground_tension.len() >= 3 && foreground_tension.iter().all(|l| l.level == LineLevel::Major)
    {
        suggestions.push(TensionSuggestion::adjust(
            SuggestionKind::Diversify,
            format!(
                "{} major arcs in simultaneous tension at the same level. Diversify with subplots \
                 or micro hooks to vary the rhythm.",
                foreground_tension.len()
            ),
        ));
    }

    suggestions
}
