//! Pre- and post-unit evaluation snapshots, plus project statistics.
//!
//! A pre-evaluation freezes the ranking the writer is briefed from; a
//! post-evaluation records what changed once the unit is applied. Both are
//! committed onto the unit and never rewritten.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use story_state::{
    Act, LineId, LineSnapshot, LineStatus, LineUpdateRecord, NarrativeFunction, NarrativeLine,
    PostEvaluation, PreEvaluation, Project, StructuralContext, TensionSummary, ThemeProgress,
};

use crate::rules::{RuleContext, RuleRegistry};
use crate::scoring::{calculate_global_tension, FunctionShare, ScoringEngine, TensionLabel};

/// Refresh every urgency at `cycle`, then snapshot the ranking of
/// non-resolved lines together with the structural context.
#[instrument(skip_all, fields(cycle = cycle))]
pub fn pre_evaluation(scoring: &ScoringEngine, project: &mut Project, cycle: i64) -> PreEvaluation {
    scoring.recalculate_all_urgencies(project, cycle);

    let line_snapshots: Vec<LineSnapshot> = scoring
        .rank_lines(project, cycle)
        .into_iter()
        .map(|ranked| LineSnapshot {
            line_id: ranked.line.id.clone(),
            name: ranked.line.name.clone(),
            weight: ranked.line.weight,
            urgency: ranked.urgency,
            status: ranked.line.status,
            agency: ranked.line.agency,
            importance: ranked.importance,
            notes: String::new(),
        })
        .collect();

    debug!(lines = line_snapshots.len(), "pre-evaluation ranked");

    PreEvaluation {
        priorities: line_snapshots.iter().map(|s| s.line_id.clone()).collect(),
        line_snapshots,
        structural_context: structural_context(project, cycle),
        global_notes: String::new(),
    }
}

/// Where the story stands: act, progress, next turning point, theme recency
/// and active tensions named by their endpoints.
pub fn structural_context(project: &Project, cycle: i64) -> StructuralContext {
    let structure = &project.dramatic_structure;

    let active_tensions = project
        .line_tensions
        .iter()
        .filter(|t| t.active)
        .map(|t| TensionSummary {
            lines: [&t.line_a, &t.line_b]
                .into_iter()
                .filter_map(|id| project.line(id))
                .map(|l| l.name.clone())
                .collect(),
            kind: t.kind,
            strength: t.strength,
        })
        .collect();

    StructuralContext {
        current_act: Some(structure.current_act),
        total_planned_units: structure.total_planned_units,
        progress: structure.progress_percent(cycle),
        next_turning_point: structure.next_turning_point().map(|tp| tp.kind),
        thematic_questions: project
            .thematic_questions
            .iter()
            .map(|q| ThemeProgress {
                question: q.question.clone(),
                last_contribution: q.last_contribution(),
            })
            .collect(),
        active_tensions,
    }
}

/// Compare lines before and after a unit at `cycle`.
///
/// A line is recorded when its weight or status changed or it was advanced;
/// lines absent from `before` are new and not recorded. Next priorities rank
/// the project at `cycle + 1`. Rules run on the lines after the unit with no
/// unit context.
#[instrument(skip_all, fields(cycle = cycle))]
pub fn post_evaluation(
    scoring: &ScoringEngine,
    rules: &RuleRegistry,
    before: &[NarrativeLine],
    after: &Project,
    advanced: &[LineId],
    cycle: i64,
) -> PostEvaluation {
    let line_updates: Vec<LineUpdateRecord> = after
        .narrative_lines
        .iter()
        .filter_map(|line| {
            let previous = before.iter().find(|b| b.id == line.id)?;
            let was_advanced = advanced.contains(&line.id);
            let changed = previous.weight != line.weight || previous.status != line.status;
            (changed || was_advanced).then(|| LineUpdateRecord {
                line_id: line.id.clone(),
                name: line.name.clone(),
                weight_before: previous.weight,
                weight_after: line.weight,
                urgency_before: previous.urgency,
                urgency_after: scoring.calculate_urgency(line, cycle, after),
                status_before: previous.status,
                status_after: line.status,
                advanced: was_advanced,
                notes: String::new(),
            })
        })
        .collect();

    let next_priorities = scoring
        .rank_lines(after, cycle + 1)
        .into_iter()
        .map(|ranked| ranked.line.id.clone())
        .collect();

    let ctx = RuleContext::new(after, cycle).with_units(&[]);
    let rules_triggered: Vec<String> = rules
        .evaluate_all(&ctx)
        .into_iter()
        .map(|alert| alert.message)
        .collect();

    debug!(
        updates = line_updates.len(),
        rules = rules_triggered.len(),
        "post-evaluation recorded"
    );

    PostEvaluation {
        line_updates,
        next_priorities,
        narrative_notes: String::new(),
        rules_triggered,
    }
}

/// Dashboard figures over a project, read from stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatistics {
    pub total_lines: usize,
    /// Lines not yet resolved.
    pub open_count: usize,
    pub resolved_count: usize,
    pub total_units: usize,
    pub completed_units: usize,
    pub status_distribution: BTreeMap<LineStatus, usize>,
    /// Mean weight of unresolved lines, 0 when there are none.
    pub avg_weight: f64,
    /// Mean stored urgency of unresolved lines, 0 when there are none.
    pub avg_urgency: f64,
    pub current_act: Act,
    pub thematic_questions: usize,
    pub active_tensions: usize,
    pub global_tension: f64,
    pub global_tension_label: TensionLabel,
    pub tension_breakdown: BTreeMap<NarrativeFunction, FunctionShare>,
}

impl ProjectStatistics {
    pub fn from_project(project: &Project) -> Self {
        let lines = &project.narrative_lines;
        let open: Vec<&NarrativeLine> = project.unresolved_lines().collect();

        let mut status_distribution = BTreeMap::new();
        for line in lines {
            *status_distribution.entry(line.status).or_insert(0) += 1;
        }

        let (avg_weight, avg_urgency) = if open.is_empty() {
            (0.0, 0.0)
        } else {
            let n = open.len() as f64;
            (
                open.iter().map(|l| l.weight).sum::<f64>() / n,
                open.iter().map(|l| l.urgency).sum::<f64>() / n,
            )
        };

        let tension = calculate_global_tension(lines);

        Self {
            total_lines: lines.len(),
            open_count: open.len(),
            resolved_count: lines.len() - open.len(),
            total_units: project.story_units.len(),
            completed_units: project.story_units.iter().filter(|u| u.is_completed()).count(),
            status_distribution,
            avg_weight,
            avg_urgency,
            current_act: project.dramatic_structure.current_act,
            thematic_questions: project.thematic_questions.len(),
            active_tensions: project.line_tensions.iter().filter(|t| t.active).count(),
            global_tension: tension.value,
            global_tension_label: tension.label,
            tension_breakdown: tension.breakdown,
        }
    }
}
