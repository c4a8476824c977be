//! The rule engine: an ordered registry of independent evaluators.
//!
//! Each rule reads a [`RuleContext`] and returns alerts. The registry runs
//! every enabled rule, isolates failures, appends the tension-balance alerts
//! and sorts the result by descending severity.

mod alert;
mod config;
pub mod mechanical;
pub mod structural;

pub use alert::*;
pub use config::*;

use std::cmp::Ordering;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use story_state::{NarrativeLine, Project, StoryUnit};

use crate::config::Vocabulary;
use crate::error::RuleError;
use crate::scoring::{calculate_global_tension, SuggestionKind};

pub const TENSION_BALANCE_ID: &str = "tension-balance";
pub const TENSION_BALANCE_NAME: &str = "Tension balance";

/// Closed set of built-in rules, in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    Neglect,
    WeightImbalance,
    TooManyActive,
    ClimaxConvergence,
    UnresolvedPressure,
    PrematureSubversion,
    AgencyDeficit,
    ThematicDrift,
    TensionStagnation,
    PacingActDuration,
    PerspectiveDesync,
}

impl RuleId {
    pub const ALL: [RuleId; 11] = [
        RuleId::Neglect,
        RuleId::WeightImbalance,
        RuleId::TooManyActive,
        RuleId::ClimaxConvergence,
        RuleId::UnresolvedPressure,
        RuleId::PrematureSubversion,
        RuleId::AgencyDeficit,
        RuleId::ThematicDrift,
        RuleId::TensionStagnation,
        RuleId::PacingActDuration,
        RuleId::PerspectiveDesync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::Neglect => "neglect",
            RuleId::WeightImbalance => "weight-imbalance",
            RuleId::TooManyActive => "too-many-active",
            RuleId::ClimaxConvergence => "climax-convergence",
            RuleId::UnresolvedPressure => "unresolved-pressure",
            RuleId::PrematureSubversion => "premature-subversion",
            RuleId::AgencyDeficit => "agency-deficit",
            RuleId::ThematicDrift => "thematic-drift",
            RuleId::TensionStagnation => "tension-stagnation",
            RuleId::PacingActDuration => "pacing-act-duration",
            RuleId::PerspectiveDesync => "perspective-desync",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown rule '{}'", s))
    }
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub lines: &'a [NarrativeLine],
    pub units: &'a [StoryUnit],
    pub current_cycle: i64,
    pub project: &'a Project,
}

impl<'a> RuleContext<'a> {
    pub fn new(project: &'a Project, current_cycle: i64) -> Self {
        Self {
            lines: &project.narrative_lines,
            units: &project.story_units,
            current_cycle,
            project,
        }
    }

    /// Evaluate against a different line set, e.g. the lines after an apply.
    pub fn with_lines(mut self, lines: &'a [NarrativeLine]) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_units(mut self, units: &'a [StoryUnit]) -> Self {
        self.units = units;
        self
    }

    /// Lines that are neither dormant nor resolved.
    pub fn open_lines(&self) -> impl Iterator<Item = &'a NarrativeLine> {
        self.lines.iter().filter(|l| l.status.is_open())
    }

    pub fn line(&self, id: &story_state::LineId) -> Option<&'a NarrativeLine> {
        self.lines.iter().find(|l| &l.id == id)
    }
}

/// A named, independently toggleable evaluator.
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError>;
}

struct RegisteredRule {
    rule: Box<dyn Rule>,
    enabled: bool,
}

/// Ordered rule registry.
pub struct RuleRegistry {
    rules: Vec<RegisteredRule>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::from_config(&RulesConfig::default(), &Vocabulary::default())
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| (r.rule.id(), r.enabled)))
            .finish()
    }
}

impl RuleRegistry {
    /// A registry with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// All built-in rules in order, configured and toggled from `config`.
    pub fn from_config(config: &RulesConfig, vocabulary: &Vocabulary) -> Self {
        let mut registry = Self::empty();
        for rule in mechanical::build(config) {
            registry.register(rule, config);
        }
        for rule in structural::build(config, vocabulary) {
            registry.register(rule, config);
        }
        registry
    }

    fn register(&mut self, rule: Box<dyn Rule>, config: &RulesConfig) {
        let enabled = config.is_rule_enabled(rule.id().as_str());
        self.rules.push(RegisteredRule { rule, enabled });
    }

    /// Append a rule at the end of the evaluation order.
    pub fn push(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(RegisteredRule {
            rule,
            enabled: true,
        });
    }

    /// Returns false if no rule with this id is registered.
    pub fn set_enabled(&mut self, id: RuleId, enabled: bool) -> bool {
        let mut found = false;
        for entry in self.rules.iter_mut().filter(|r| r.rule.id() == id) {
            entry.enabled = enabled;
            found = true;
        }
        found
    }

    pub fn is_enabled(&self, id: RuleId) -> bool {
        self.rules
            .iter()
            .any(|r| r.rule.id() == id && r.enabled)
    }

    /// Registered rule ids in evaluation order.
    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.rule.id()).collect()
    }

    /// Run every enabled rule, then the tension-balance heuristics, and sort
    /// everything by descending severity. Ties keep evaluation order.
    #[instrument(skip_all, fields(cycle = ctx.current_cycle))]
    pub fn evaluate_all(&self, ctx: &RuleContext<'_>) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for entry in self.rules.iter().filter(|r| r.enabled) {
            let id = entry.rule.id();
            match entry.rule.evaluate(ctx) {
                Ok(found) => {
                    debug!(rule = %id, alerts = found.len(), "rule evaluated");
                    for alert in found {
                        if alert.severity.is_finite() {
                            alerts.push(alert);
                        } else {
                            warn!(rule = %id, "dropping alert with non-finite severity");
                        }
                    }
                }
                Err(e) => warn!(rule = %id, error = %e, "rule failed, skipping"),
            }
        }

        alerts.extend(tension_balance_alerts(ctx.lines));

        alerts.sort_by(|a, b| {
            b.severity
                .partial_cmp(&a.severity)
                .unwrap_or(Ordering::Equal)
        });
        alerts
    }
}

/// Tension suggestions reframed as alerts: creations are guidelines, other
/// adjustments are warnings.
pub fn tension_balance_alerts(lines: &[NarrativeLine]) -> Vec<Alert> {
    calculate_global_tension(lines)
        .suggestions
        .into_iter()
        .map(|suggestion| {
            let (kind, severity) = match suggestion.kind {
                SuggestionKind::Create => (AlertKind::Guideline, 0.6),
                SuggestionKind::Escalate | SuggestionKind::Diversify => (AlertKind::Warning, 0.4),
            };
            Alert::new(
                TENSION_BALANCE_ID,
                TENSION_BALANCE_NAME,
                kind,
                severity,
                suggestion.message.clone(),
            )
            .with_suggestion(suggestion)
        })
        .collect()
}
