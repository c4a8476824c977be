//! Scoring: urgency, importance and global tension.
//!
//! All functions here are pure reads of the project except
//! [`ScoringEngine::recalculate_all_urgencies`], the only place that writes a
//! line's `urgency`.

mod tension;

pub use tension::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use story_state::{LineStatus, NarrativeLine, Project};

/// Coefficients of the urgency and importance formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Exponent factor of the time-decay curve.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,

    /// Boost per unit of strength when a tension counterpart is fresher.
    #[serde(default = "default_tension_boost")]
    pub tension_boost: f64,

    #[serde(default = "default_urgency_cap")]
    pub urgency_cap: f64,

    #[serde(default = "default_importance_coefficient")]
    pub weight_coefficient: f64,

    #[serde(default = "default_importance_coefficient")]
    pub urgency_coefficient: f64,

    /// Bonus per stale thematic question a line belongs to.
    #[serde(default = "default_thematic_step")]
    pub thematic_bonus_step: f64,

    #[serde(default = "default_thematic_cap")]
    pub thematic_bonus_cap: f64,

    /// Cycles without contribution after which a question counts as stale.
    #[serde(default = "default_thematic_stale_after")]
    pub thematic_stale_after: i64,
}

fn default_decay_rate() -> f64 {
    0.3
}

fn default_tension_boost() -> f64 {
    0.15
}

fn default_urgency_cap() -> f64 {
    0.95
}

fn default_importance_coefficient() -> f64 {
    0.35
}

fn default_thematic_step() -> f64 {
    0.05
}

fn default_thematic_cap() -> f64 {
    0.15
}

fn default_thematic_stale_after() -> i64 {
    2
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            tension_boost: default_tension_boost(),
            urgency_cap: default_urgency_cap(),
            weight_coefficient: default_importance_coefficient(),
            urgency_coefficient: default_importance_coefficient(),
            thematic_bonus_step: default_thematic_step(),
            thematic_bonus_cap: default_thematic_cap(),
            thematic_stale_after: default_thematic_stale_after(),
        }
    }
}

/// A line with its freshly computed scores, as produced by ranking.
#[derive(Debug, Clone)]
pub struct RankedLine<'a> {
    pub line: &'a NarrativeLine,
    pub urgency: f64,
    pub importance: f64,
}

/// Computes per-line priority signals.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// How overdue a line's progression is, in `[0, urgency_cap]`.
    ///
    /// Resolved lines always score exactly 0.
    pub fn calculate_urgency(
        &self,
        line: &NarrativeLine,
        current_cycle: i64,
        project: &Project,
    ) -> f64 {
        if line.status == LineStatus::Resolved {
            return 0.0;
        }

        let gap = line.gap(current_cycle);
        // A line touched "in the future" has no decay yet.
        let time_decay = (1.0 - (-self.config.decay_rate * gap as f64).exp()).max(0.0);
        let weight_factor = 0.5 + 0.5 * line.weight;

        let mut tension_boost = 0.0;
        for tension in project.line_tensions.iter().filter(|t| t.active) {
            let Some(other_id) = tension.other(&line.id) else {
                continue;
            };
            let Some(other) = project.line(other_id) else {
                continue;
            };
            if other.gap(current_cycle) < gap {
                tension_boost += tension.strength * self.config.tension_boost;
            }
        }

        let raw = time_decay * line.status.urgency_multiplier() * weight_factor + tension_boost;
        if raw.is_finite() {
            raw.clamp(0.0, self.config.urgency_cap)
        } else {
            0.0
        }
    }

    /// Overwrite every line's urgency.
    ///
    /// All values are computed against the state before any of them is
    /// written, so the result does not depend on line order.
    pub fn recalculate_all_urgencies(&self, project: &mut Project, current_cycle: i64) {
        let urgencies: Vec<f64> = project
            .narrative_lines
            .iter()
            .map(|line| self.calculate_urgency(line, current_cycle, project))
            .collect();

        for (line, urgency) in project.narrative_lines.iter_mut().zip(urgencies) {
            line.urgency = urgency;
        }
    }

    /// Ranking score blending weight, fresh urgency, status and thematic drift.
    pub fn calculate_importance(
        &self,
        line: &NarrativeLine,
        current_cycle: i64,
        project: &Project,
    ) -> f64 {
        let urgency = self.calculate_urgency(line, current_cycle, project);
        self.importance_with(line, urgency, current_cycle, project)
    }

    fn importance_with(
        &self,
        line: &NarrativeLine,
        urgency: f64,
        current_cycle: i64,
        project: &Project,
    ) -> f64 {
        self.config.weight_coefficient * line.weight
            + self.config.urgency_coefficient * urgency
            + line.status.importance_bonus()
            + self.thematic_bonus(line, current_cycle, project)
    }

    fn thematic_bonus(&self, line: &NarrativeLine, current_cycle: i64, project: &Project) -> f64 {
        let stale = project
            .thematic_questions
            .iter()
            .filter(|q| q.concerns(&line.id))
            .filter(|q| q.staleness(current_cycle) >= self.config.thematic_stale_after)
            .count();
        (stale as f64 * self.config.thematic_bonus_step).min(self.config.thematic_bonus_cap)
    }

    /// Non-resolved lines ordered by descending importance.
    ///
    /// The sort is stable: lines with equal importance keep project order.
    pub fn rank_lines<'a>(&self, project: &'a Project, current_cycle: i64) -> Vec<RankedLine<'a>> {
        let mut ranked: Vec<RankedLine<'a>> = project
            .unresolved_lines()
            .map(|line| {
                let urgency = self.calculate_urgency(line, current_cycle, project);
                RankedLine {
                    line,
                    urgency,
                    importance: self.importance_with(line, urgency, current_cycle, project),
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(Ordering::Equal)
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_state::{LineTension, TensionKind, ThematicQuestion};

    fn project_with(lines: Vec<NarrativeLine>) -> Project {
        let mut project = Project::new("Test");
        for line in lines {
            project.add_line(line);
        }
        project
    }

    #[test]
    fn test_urgency_example() {
        let line = NarrativeLine::new("War")
            .with_status(LineStatus::Active)
            .with_weight(0.5)
            .created_in(0)
            .advanced_in(2);
        let project = project_with(vec![line.clone()]);
        let urgency = ScoringEngine::default().calculate_urgency(&line, 5, &project);
        assert!((urgency - 0.4451).abs() < 1e-4);
    }

    #[test]
    fn test_resolved_urgency_is_zero() {
        let line = NarrativeLine::new("Done")
            .with_status(LineStatus::Resolved)
            .with_weight(1.0);
        let project = project_with(vec![line.clone()]);
        assert_eq!(
            ScoringEngine::default().calculate_urgency(&line, 40, &project),
            0.0
        );
    }

    #[test]
    fn test_negative_gap_has_no_decay() {
        let line = NarrativeLine::new("Ahead")
            .with_status(LineStatus::Active)
            .created_in(6);
        let project = project_with(vec![line.clone()]);
        assert_eq!(
            ScoringEngine::default().calculate_urgency(&line, 3, &project),
            0.0
        );
    }

    #[test]
    fn test_tension_boost_from_fresher_counterpart() {
        let stale = NarrativeLine::new("Stale")
            .with_id("stale")
            .with_status(LineStatus::Active)
            .advanced_in(1);
        let fresh = NarrativeLine::new("Fresh")
            .with_id("fresh")
            .with_status(LineStatus::Active)
            .advanced_in(4);
        let mut project = project_with(vec![stale.clone(), fresh.clone()]);
        let engine = ScoringEngine::default();
        let before = engine.calculate_urgency(&stale, 5, &project);

        project.add_tension(
            LineTension::new("stale".into(), "fresh".into(), TensionKind::Contradictory)
                .with_strength(0.8),
        );
        let after = engine.calculate_urgency(&stale, 5, &project);
        assert!((after - before - 0.12).abs() < 1e-9);

        // The fresher side gets no boost.
        let fresh_urgency = engine.calculate_urgency(&fresh, 5, &project);
        let alone = engine.calculate_urgency(&fresh, 5, &project_with(vec![fresh.clone()]));
        assert_eq!(fresh_urgency, alone);
    }

    #[test]
    fn test_inactive_tension_ignored() {
        let a = NarrativeLine::new("A").with_id("a").with_status(LineStatus::Active);
        let b = NarrativeLine::new("B")
            .with_id("b")
            .with_status(LineStatus::Active)
            .advanced_in(3);
        let mut project = project_with(vec![a.clone(), b]);
        let engine = ScoringEngine::default();
        let before = engine.calculate_urgency(&a, 4, &project);
        project.add_tension(LineTension::new("a".into(), "b".into(), TensionKind::Catalytic).inactive());
        assert_eq!(engine.calculate_urgency(&a, 4, &project), before);
    }

    #[test]
    fn test_urgency_cap() {
        let line = NarrativeLine::new("Old")
            .with_status(LineStatus::Climax)
            .with_weight(1.0);
        let project = project_with(vec![line.clone()]);
        assert_eq!(
            ScoringEngine::default().calculate_urgency(&line, 100, &project),
            0.95
        );
    }

    #[test]
    fn test_recalculate_all_urgencies() {
        let mut project = project_with(vec![
            NarrativeLine::new("A").with_status(LineStatus::Active),
            NarrativeLine::new("B").with_status(LineStatus::Resolved),
        ]);
        project.narrative_lines[1].urgency = 0.7;
        ScoringEngine::default().recalculate_all_urgencies(&mut project, 4);
        assert!(project.narrative_lines[0].urgency > 0.0);
        assert_eq!(project.narrative_lines[1].urgency, 0.0);
    }

    #[test]
    fn test_importance_components() {
        let line = NarrativeLine::new("A")
            .with_id("a")
            .with_status(LineStatus::Climax)
            .with_weight(0.6)
            .advanced_in(3);
        let project = project_with(vec![line.clone()]);
        let engine = ScoringEngine::default();
        // Gap 0: urgency 0, importance is weight and status bonus only.
        let importance = engine.calculate_importance(&line, 3, &project);
        assert!((importance - (0.35 * 0.6 + 0.20)).abs() < 1e-9);
    }

    #[test]
    fn test_thematic_bonus_capped() {
        let line = NarrativeLine::new("A").with_id("a").advanced_in(5);
        let mut project = project_with(vec![line.clone()]);
        let engine = ScoringEngine::default();
        let base = engine.calculate_importance(&line, 5, &project);

        for i in 0..4 {
            project.add_question(
                ThematicQuestion::new(format!("Q{}", i))
                    .with_line("a")
                    .with_contribution(1, ""),
            );
        }
        // A recently fed question adds nothing.
        project.add_question(
            ThematicQuestion::new("Fresh")
                .with_line("a")
                .with_contribution(5, ""),
        );

        let boosted = engine.calculate_importance(&line, 5, &project);
        assert!((boosted - base - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_unfed_question_counts_from_start() {
        let line = NarrativeLine::new("A").with_id("a").advanced_in(1);
        let mut project = project_with(vec![line.clone()]);
        project.add_question(ThematicQuestion::new("Q").with_line("a"));
        let engine = ScoringEngine::default();

        // Cycle 1: never fed, gap is 1, not yet stale.
        let early = engine.calculate_importance(&line, 1, &project);
        let without = engine.calculate_importance(&line, 1, &project_with(vec![line.clone()]));
        assert_eq!(early, without);
    }

    #[test]
    fn test_rank_lines_is_stable() {
        let project = project_with(vec![
            NarrativeLine::new("First").with_id("1").advanced_in(2),
            NarrativeLine::new("Second").with_id("2").advanced_in(2),
            NarrativeLine::new("Top")
                .with_id("3")
                .with_status(LineStatus::Climax)
                .advanced_in(2),
            NarrativeLine::new("Gone")
                .with_id("4")
                .with_status(LineStatus::Resolved),
        ]);
        let engine = ScoringEngine::default();

        for _ in 0..3 {
            let ids: Vec<_> = engine
                .rank_lines(&project, 4)
                .iter()
                .map(|r| r.line.id.as_str().to_string())
                .collect();
            assert_eq!(ids, vec!["3", "1", "2"]);
        }
    }
}
