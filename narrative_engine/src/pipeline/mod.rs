//! The agent pipeline: SELECT, then any number of BRIEF(role), then APPLY.
//!
//! The order is carried by ownership. [`Orchestrator::select`] hands out a
//! [`PipelineRun`]; briefs borrow it; [`Orchestrator::apply`] consumes it.
//! Agents never see live state, only the owned slices built here, and the
//! engine never generates prose: it only moves numbers based on what agents
//! report.

mod apply;
mod brief;
mod output;
mod resolve;

pub use apply::*;
pub use brief::*;
pub use output::*;
pub use resolve::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use story_state::{
    Agency, HistoryEntry, LineId, LineLevel, LineStatus, NarrativeFunction, PreEvaluation, Project,
};

use crate::config::EngineConfig;
use crate::evaluation::pre_evaluation;
use crate::rules::{Alert, RuleContext, RuleRegistry};
use crate::scoring::{calculate_global_tension, ScoringEngine, TensionLabel, TensionSuggestion};

/// Downstream agent roles a brief can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Analyst,
    Writer,
    Critic,
    Verifier,
    Editor,
    EntityUpdate,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Analyst,
        Role::Writer,
        Role::Critic,
        Role::Verifier,
        Role::Editor,
        Role::EntityUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Analyst => "analyst",
            Role::Writer => "writer",
            Role::Critic => "critic",
            Role::Verifier => "verifier",
            Role::Editor => "editor",
            Role::EntityUpdate => "entity-update",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `[pipeline]` configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_min_selected")]
    pub min_selected: usize,

    #[serde(default = "default_max_selected")]
    pub max_selected: usize,

    /// History entries carried per selected line.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    #[serde(default = "default_analyst_summary_depth")]
    pub analyst_summary_depth: usize,

    #[serde(default = "default_writer_summary_depth")]
    pub writer_summary_depth: usize,

    /// Weight gained by a line that advanced and changed status.
    #[serde(default = "default_weight_step")]
    pub weight_step: f64,

    #[serde(default = "default_new_line_weight")]
    pub new_line_weight: f64,
}

fn default_min_selected() -> usize {
    3
}

fn default_max_selected() -> usize {
    5
}

fn default_history_depth() -> usize {
    3
}

fn default_analyst_summary_depth() -> usize {
    2
}

fn default_writer_summary_depth() -> usize {
    3
}

fn default_weight_step() -> f64 {
    0.05
}

fn default_new_line_weight() -> f64 {
    0.30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_selected: default_min_selected(),
            max_selected: default_max_selected(),
            history_depth: default_history_depth(),
            analyst_summary_depth: default_analyst_summary_depth(),
            writer_summary_depth: default_writer_summary_depth(),
            weight_step: default_weight_step(),
            new_line_weight: default_new_line_weight(),
        }
    }
}

impl PipelineConfig {
    /// How many of `available` ranked lines a cycle works on.
    pub fn selection_size(&self, available: usize) -> usize {
        let upper = self.max_selected.max(self.min_selected);
        available.max(self.min_selected).min(upper).min(available)
    }
}

/// Full view of one selected line, as handed to the analyst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedLine {
    pub id: LineId,
    pub name: String,
    pub description: String,
    pub status: LineStatus,
    pub level: LineLevel,
    pub narrative_function: NarrativeFunction,
    pub agency: Agency,
    pub projection: Vec<String>,
    pub weight: f64,
    pub urgency: f64,
    pub importance: f64,
    pub tags: Vec<String>,
    /// Most recent entries, oldest first.
    pub history: Vec<HistoryEntry>,
    pub dependencies: Vec<LineId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TensionReading {
    pub value: f64,
    pub label: TensionLabel,
}

/// Engine-side facts about the cycle. Never shown to the writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicalContext {
    pub current_cycle: i64,
    pub total_units: usize,
    pub tension: TensionReading,
    /// Alerts that are unscoped or concern a selected line.
    pub alerts: Vec<Alert>,
    pub suggestions: Vec<TensionSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Ordered by descending importance.
    pub lines: Vec<SelectedLine>,
    pub context: MechanicalContext,
}

impl Selection {
    pub fn line_ids(&self) -> Vec<&LineId> {
        self.lines.iter().map(|l| &l.id).collect()
    }
}

/// One in-flight cycle, from SELECT until APPLY consumes it.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub cycle: i64,
    pub selection: Selection,
    pub pre_evaluation: PreEvaluation,
}

/// Computes, selects and folds results back. Holds configuration only; the
/// project is passed to every call.
#[derive(Debug, Default)]
pub struct Orchestrator {
    scoring: ScoringEngine,
    rules: RuleRegistry,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(scoring: ScoringEngine, rules: RuleRegistry, config: PipelineConfig) -> Self {
        Self {
            scoring,
            rules,
            config,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            ScoringEngine::new(config.scoring.clone()),
            RuleRegistry::from_config(&config.rules, &config.vocabulary),
            config.pipeline.clone(),
        )
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleRegistry {
        &mut self.rules
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// SELECT: refresh urgencies, rank open work and pick the cycle's lines.
    ///
    /// Writes recomputed urgencies back onto the project; nothing else is
    /// mutated.
    #[instrument(skip_all, fields(project = %project.name))]
    pub fn select(&self, project: &mut Project) -> PipelineRun {
        let cycle = project.current_cycle();
        let pre_evaluation = pre_evaluation(&self.scoring, project, cycle);
        let alerts = self
            .rules
            .evaluate_all(&RuleContext::new(project, cycle));
        let tension = calculate_global_tension(&project.narrative_lines);

        let count = self
            .config
            .selection_size(pre_evaluation.line_snapshots.len());
        let lines: Vec<SelectedLine> = pre_evaluation
            .line_snapshots
            .iter()
            .take(count)
            .filter_map(|snapshot| {
                let line = project.line(&snapshot.line_id)?;
                Some(SelectedLine {
                    id: line.id.clone(),
                    name: line.name.clone(),
                    description: line.description.clone(),
                    status: line.status,
                    level: line.level,
                    narrative_function: line.narrative_function,
                    agency: line.agency,
                    projection: line.projection.clone(),
                    weight: line.weight,
                    urgency: snapshot.urgency,
                    importance: snapshot.importance,
                    tags: line.tags.clone(),
                    history: line.recent_history(self.config.history_depth).to_vec(),
                    dependencies: line.dependencies.clone(),
                })
            })
            .collect();

        let selected_ids: Vec<&LineId> = lines.iter().map(|l| &l.id).collect();
        let alerts: Vec<Alert> = alerts
            .into_iter()
            .filter(|a| a.is_unscoped() || a.concerns_any(&selected_ids))
            .collect();

        debug!(
            cycle,
            selected = lines.len(),
            alerts = alerts.len(),
            "lines selected"
        );

        PipelineRun {
            cycle,
            selection: Selection {
                lines,
                context: MechanicalContext {
                    current_cycle: cycle,
                    total_units: project.story_units.len(),
                    tension: TensionReading {
                        value: tension.value,
                        label: tension.label,
                    },
                    alerts,
                    suggestions: tension.suggestions,
                },
            },
            pre_evaluation,
        }
    }
}
