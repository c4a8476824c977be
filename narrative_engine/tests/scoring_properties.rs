//! Property checks over randomly shaped projects.

use narrative_engine::{calculate_global_tension, RuleContext, RuleRegistry, ScoringEngine};
use proptest::prelude::*;
use story_state::{LineStatus, LineTension, NarrativeLine, Project, TensionKind};

const STATUSES: [LineStatus; 6] = [
    LineStatus::Dormant,
    LineStatus::Emerging,
    LineStatus::Active,
    LineStatus::Climax,
    LineStatus::Resolving,
    LineStatus::Resolved,
];

fn line_strategy() -> impl Strategy<Value = NarrativeLine> {
    (0usize..6, 0.0f64..=1.0, 0i64..20, -1i64..20).prop_map(
        |(status, weight, created, advanced)| {
            NarrativeLine::new(format!("Line {}-{}", created, advanced))
                .with_status(STATUSES[status])
                .with_weight(weight)
                .created_in(created)
                .advanced_in(advanced)
        },
    )
}

/// Up to eight lines with distinct ids and a few random tensions between them.
fn project_strategy() -> impl Strategy<Value = Project> {
    (
        prop::collection::vec(line_strategy(), 1..8),
        prop::collection::vec((0usize..8, 0usize..8, 0.0f64..=1.0), 0..4),
    )
        .prop_map(|(lines, tensions)| {
            let mut project = Project::new("Prop");
            for (i, line) in lines.into_iter().enumerate() {
                project.add_line(line.with_id(format!("line-{}", i)));
            }
            let count = project.narrative_lines.len();
            for (a, b, strength) in tensions {
                let (a, b) = (a % count, b % count);
                if a == b {
                    continue;
                }
                let line_a = project.narrative_lines[a].id.clone();
                let line_b = project.narrative_lines[b].id.clone();
                project.add_tension(
                    LineTension::new(line_a, line_b, TensionKind::Contradictory)
                        .with_strength(strength),
                );
            }
            project
        })
}

proptest! {
    #[test]
    fn urgency_stays_within_cap(project in project_strategy(), cycle in 0i64..40) {
        let engine = ScoringEngine::default();
        let cap = engine.config().urgency_cap;
        for line in &project.narrative_lines {
            let urgency = engine.calculate_urgency(line, cycle, &project);
            prop_assert!((0.0..=cap).contains(&urgency), "urgency {} out of range", urgency);
            if line.status == LineStatus::Resolved {
                prop_assert_eq!(urgency, 0.0);
            }
        }
    }

    #[test]
    fn urgency_never_drops_as_time_passes(
        line in line_strategy(),
        cycle in 0i64..30,
        later in 0i64..10,
    ) {
        let engine = ScoringEngine::default();
        let mut project = Project::new("Solo");
        project.add_line(line);
        let line = &project.narrative_lines[0];

        let now = engine.calculate_urgency(line, cycle, &project);
        let after = engine.calculate_urgency(line, cycle + later, &project);
        prop_assert!(after >= now, "{} then {}", now, after);
    }

    #[test]
    fn ranking_is_sorted_and_skips_resolved(project in project_strategy(), cycle in 0i64..40) {
        let engine = ScoringEngine::default();
        let ranked = engine.rank_lines(&project, cycle);

        let unresolved = project.narrative_lines.iter().filter(|l| !l.is_resolved()).count();
        prop_assert_eq!(ranked.len(), unresolved);
        prop_assert!(ranked.iter().all(|r| r.importance.is_finite()));
        prop_assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn recalculation_is_order_independent(project in project_strategy(), cycle in 0i64..40) {
        let engine = ScoringEngine::default();

        let mut forward = project.clone();
        engine.recalculate_all_urgencies(&mut forward, cycle);

        let mut reversed = project.clone();
        reversed.narrative_lines.reverse();
        engine.recalculate_all_urgencies(&mut reversed, cycle);

        for line in &forward.narrative_lines {
            let twin = reversed.line(&line.id);
            prop_assert!(twin.is_some());
            prop_assert_eq!(twin.map(|t| t.urgency), Some(line.urgency));
        }
    }

    #[test]
    fn alerts_and_tension_stay_in_range(project in project_strategy(), cycle in 0i64..40) {
        let alerts = RuleRegistry::default().evaluate_all(&RuleContext::new(&project, cycle));
        prop_assert!(alerts.iter().all(|a| (0.0..=1.0).contains(&a.severity)));
        prop_assert!(alerts.windows(2).all(|w| w[0].severity >= w[1].severity));

        let tension = calculate_global_tension(&project.narrative_lines);
        prop_assert!((0.0..=1.0).contains(&tension.value));
    }
}
