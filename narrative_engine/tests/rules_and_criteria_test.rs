//! Configured rules, built-in profiles and statistics over a saved project.

use narrative_engine::{
    builtin_profiles, profiles_from_toml, CriteriaEvaluator, EngineConfig, HealthLabel,
    Orchestrator, ProjectStatistics, RuleContext, RuleId, RuleRegistry,
};
use story_state::{LineStatus, Project};

const PROJECT: &str = include_str!("fixtures/project.json");

fn load() -> Project {
    Project::from_json(PROJECT).expect("fixture loads")
}

fn neglected(registry: &RuleRegistry, project: &Project) -> Vec<String> {
    registry
        .evaluate_all(&RuleContext::new(project, project.current_cycle()))
        .into_iter()
        .filter(|a| a.rule_id == RuleId::Neglect.as_str())
        .filter_map(|a| a.line_name)
        .collect()
}

#[test]
fn test_neglect_uses_project_threshold() {
    let project = load();
    // Threshold 3 at cycle 3: only the line last advanced in cycle 0 qualifies.
    assert_eq!(
        neglected(&RuleRegistry::default(), &project),
        vec!["Mara and Ilan".to_string()]
    );
}

#[test]
fn test_config_threshold_overrides_project() {
    let project = load();
    let config = EngineConfig::parse("[rules.neglect]\nthreshold = 2\n").unwrap();
    let registry = RuleRegistry::from_config(&config.rules, &config.vocabulary);

    let mut names = neglected(&registry, &project);
    names.sort();
    assert_eq!(names, vec!["Mara and Ilan", "The Exile", "The Lost Heir"]);
}

#[test]
fn test_disabled_rule_stays_silent_through_the_pipeline() {
    let mut project = load();
    let config = EngineConfig::parse(
        r#"
[rules.neglect]
enabled = false

[pipeline]
max_selected = 3
"#,
    )
    .unwrap();
    let orchestrator = Orchestrator::from_config(&config);
    assert!(!orchestrator.rules().is_enabled(RuleId::Neglect));

    let run = orchestrator.select(&mut project);
    assert_eq!(run.selection.lines.len(), 3);
    assert!(run
        .selection
        .context
        .alerts
        .iter()
        .all(|a| a.rule_id != RuleId::Neglect.as_str()));
}

#[test]
fn test_malformed_config_is_a_parse_error() {
    let err = EngineConfig::parse("[pipeline]\nmax_selected = \"many\"\n").unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse config"));
}

#[test]
fn test_builtin_profiles_over_project() {
    let project = load();
    let evaluator = CriteriaEvaluator::default();

    for profile in builtin_profiles() {
        let evaluation = evaluator.evaluate(&profile, &project);
        assert_eq!(evaluation.profile_id, profile.id);
        assert_eq!(evaluation.criteria.len(), profile.criteria.len());
        assert!((0.0..=1.0).contains(&evaluation.overall_score));
        assert!(evaluation
            .criteria
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.score)));
        assert_eq!(
            evaluation.summary.label,
            HealthLabel::from_score(evaluation.overall_score)
        );
        assert!(evaluation.summary.strengths.len() <= 2);
        assert!(evaluation.summary.weaknesses.len() <= 2);
    }
}

#[test]
fn test_custom_profile_from_toml() {
    let project = load();
    let profiles = profiles_from_toml(
        r#"
[[profiles]]
id = "pacing-desk"
name = "Pacing desk"
role = "strategist"

[[profiles.criteria]]
id = "tonal-consistency"
name = "Tone"
weight = 1.0
"#,
    )
    .unwrap();

    let evaluation = CriteriaEvaluator::default().evaluate(&profiles[0], &project);
    assert_eq!(evaluation.criteria.len(), 1);
    assert_eq!(evaluation.overall_score, 0.5);
    assert!(!evaluation.criteria[0].observations.is_empty());
}

#[test]
fn test_statistics_over_project() {
    let stats = ProjectStatistics::from_project(&load());
    assert_eq!(stats.total_lines, 7);
    assert_eq!(stats.open_count, 6);
    assert_eq!(stats.resolved_count, 1);
    assert_eq!(stats.total_units, 3);
    assert_eq!(stats.completed_units, 3);
    assert_eq!(stats.status_distribution[&LineStatus::Active], 3);
    assert_eq!(stats.active_tensions, 1);
    assert_eq!(stats.thematic_questions, 1);
    assert!((stats.avg_weight - 2.8 / 6.0).abs() < 1e-9);
}
