//! Per-criterion heuristics.

use std::collections::BTreeMap;

use story_state::{
    Act, Agency, LineLevel, LineStatus, NarrativeFunction, NarrativeLine, Project, StoryUnit,
};

use super::{Criterion, CriterionResult};
use crate::config::Vocabulary;

/// Units assumed when the structure does not say how many are planned.
const DEFAULT_PLANNED_UNITS: u32 = 12;

/// Project facts shared by every heuristic of one evaluation.
pub(super) struct Facts<'a> {
    project: &'a Project,
    completed: Vec<&'a StoryUnit>,
    cycle: i64,
    vocabulary: &'a Vocabulary,
}

impl<'a> Facts<'a> {
    pub(super) fn new(project: &'a Project, vocabulary: &'a Vocabulary) -> Self {
        Self {
            project,
            completed: project.completed_units(),
            cycle: project.current_cycle(),
            vocabulary,
        }
    }

    fn lines(&self) -> &'a [NarrativeLine] {
        &self.project.narrative_lines
    }

    fn planned_units(&self) -> u32 {
        self.project
            .dramatic_structure
            .total_planned_units
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PLANNED_UNITS)
    }

    fn is_critical(&self, line: &NarrativeLine) -> bool {
        line.tags.iter().any(|t| self.vocabulary.is_critical_tag(t))
    }

    fn is_marginalized(&self, line: &NarrativeLine) -> bool {
        line.tags.iter().any(|t| self.vocabulary.is_marginalized_tag(t))
    }
}

pub(super) fn evaluate(criterion: &Criterion, facts: &Facts<'_>) -> CriterionResult {
    let result = CriterionResult::neutral(criterion);
    match criterion.id.as_str() {
        "pacing" => pacing(result, facts),
        "subversion-timing" => subversion_timing(result, facts),
        "arc-completeness" => arc_completeness(result, facts),
        "micro-hooks" => micro_hooks(result, facts),
        "show-dont-tell" => show_dont_tell(result, facts),
        "ambiguity" => ambiguity(result, facts),
        "dignity" => dignity(result, facts),
        "page-turner" => page_turner(result, facts),
        "character-attachment" => character_attachment(result, facts),
        "serial-momentum" => serial_momentum(result, facts),
        "revelation-economy" => revelation_economy(result, facts),
        "cast-management" => cast_management(result, facts),
        "act-awareness" => act_awareness(result, facts),
        _ => result.observe("Not programmatically evaluable; needs a human or model reviewer."),
    }
}

fn pacing(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let relief = facts
        .lines()
        .iter()
        .filter(|l| l.narrative_function == NarrativeFunction::Relief && !l.is_resolved())
        .count();
    let tension = facts
        .lines()
        .iter()
        .filter(|l| l.narrative_function == NarrativeFunction::Tension && l.status.is_foreground())
        .count();

    if tension > 0 && relief == 0 {
        result
            .scored(0.3)
            .observe(format!("{} tension lines in the foreground and no relief line.", tension))
            .suggest("Introduce a relief line to let the reader breathe.")
    } else if tension > 0 && relief > 0 {
        result
            .scored(0.8)
            .observe("Tension and relief alternate.")
    } else {
        result
    }
}

fn subversion_timing(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    if facts.project.dramatic_structure.current_act != Act::Setup {
        return result;
    }

    let negative = facts
        .lines()
        .iter()
        .filter(|l| facts.is_critical(l) && l.status != LineStatus::Dormant)
        .count();
    let hero_moment = facts
        .completed
        .iter()
        .any(|u| facts.vocabulary.mentions_hero_moment(&u.summary));

    if negative > 0 && !hero_moment {
        result
            .scored(0.2)
            .observe("Protagonists are undermined before they had a heroic moment.")
            .suggest("Give the heroes a moment of glory before subverting them.")
    } else {
        result.scored(0.7)
    }
}

fn arc_completeness(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let stagnant: Vec<&str> = facts
        .lines()
        .iter()
        .filter(|l| l.status.is_open() && l.cycles_since_advance(facts.cycle) >= 3)
        .map(|l| l.name.as_str())
        .collect();

    if stagnant.is_empty() {
        return result.scored(0.9);
    }
    let score = (0.8 - 0.15 * stagnant.len() as f64).max(0.1);
    result
        .scored(score)
        .observe(format!("Stagnant lines: {}.", stagnant.join(", ")))
}

fn micro_hooks(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let micro = facts
        .lines()
        .iter()
        .filter(|l| l.level == LineLevel::Micro && !l.is_resolved())
        .count();
    let open = facts.lines().iter().filter(|l| l.status.is_open()).count();

    if micro == 0 && open >= 3 {
        result
            .scored(0.2)
            .observe("No micro-line to hook the reader between the big arcs.")
            .suggest("Add a small mystery or detail that pulls the reader forward.")
    } else if micro > 0 {
        result.scored(0.8)
    } else {
        result
    }
}

fn show_dont_tell(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let passive_carriers = facts
        .lines()
        .iter()
        .filter(|l| {
            l.narrative_function == NarrativeFunction::ThemeCarrier && l.agency == Agency::Passive
        })
        .count();

    if passive_carriers > 0 {
        result
            .scored(0.4)
            .observe("Theme-carrying lines are passive: the theme is stated, not dramatized.")
    } else {
        result.scored(0.8)
    }
}

fn ambiguity(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    // tag -> (members, members carrying a critical tag)
    let mut factions: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for line in facts.lines() {
        let negative = facts.is_critical(line);
        for tag in &line.tags {
            if facts.vocabulary.is_critical_tag(tag) {
                continue;
            }
            let entry = factions.entry(tag.trim().to_lowercase()).or_default();
            entry.0 += 1;
            if negative {
                entry.1 += 1;
            }
        }
    }

    let unbalanced: Vec<&str> = factions
        .iter()
        .filter(|(_, counts)| {
            let (total, negative) = **counts;
            total >= 2 && (negative == 0 || negative == total)
        })
        .map(|(tag, _)| tag.as_str())
        .collect();

    if unbalanced.is_empty() {
        result.scored(0.8)
    } else {
        result
            .scored(0.3)
            .observe(format!("Uniformly good or bad camps: {}.", unbalanced.join(", ")))
    }
}

fn dignity(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let marginalized: Vec<&NarrativeLine> = facts
        .lines()
        .iter()
        .filter(|l| facts.is_marginalized(l))
        .collect();
    if marginalized.is_empty() {
        return result;
    }

    if marginalized.iter().any(|l| l.agency == Agency::Passive) {
        result
            .scored(0.3)
            .observe("Marginalized characters are passive.")
            .suggest("Let marginalized characters act on their own terms.")
    } else {
        result.scored(0.9)
    }
}

fn page_turner(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let Some(last) = facts.completed.last() else {
        return result;
    };
    let closing = last
        .content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .last()
        .unwrap_or("");

    if facts.vocabulary.reads_as_open_ending(closing) {
        result.scored(0.8)
    } else {
        result
            .scored(0.4)
            .observe("The last chapter closes without an open question.")
    }
}

fn character_attachment(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let developed = facts.lines().iter().filter(|l| l.history.len() >= 2).count();
    if developed > 0 {
        result.scored(0.7)
    } else {
        result
            .scored(0.4)
            .observe("No line has been developed across several units yet.")
    }
}

fn serial_momentum(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let Some(last) = facts.completed.last() else {
        return result;
    };
    let advanced: Vec<&NarrativeLine> = last
        .advanced_lines
        .iter()
        .filter_map(|id| facts.project.line(id))
        .collect();
    let major = advanced.iter().any(|l| l.level == LineLevel::Major);
    let foreshadowing = advanced
        .iter()
        .any(|l| l.narrative_function == NarrativeFunction::Foreshadowing);

    match (major, foreshadowing) {
        (true, true) => result.scored(0.9),
        (true, false) => result
            .scored(0.6)
            .suggest("Plant a foreshadowing thread to keep the series pulling forward."),
        _ => result
            .scored(0.3)
            .observe("The last unit advanced no major line."),
    }
}

fn revelation_economy(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let structure = &facts.project.dramatic_structure;
    let total = structure.turning_points.len();
    if total == 0 {
        return result.observe("No turning points declared.");
    }

    let revealed = structure.reached_count() as f64 / total as f64;
    let progress = facts.completed.len() as f64 / facts.planned_units() as f64;

    if revealed > progress + 0.2 {
        result
            .scored(0.3)
            .observe("Turning points are spent faster than the story progresses.")
    } else if revealed < progress - 0.3 {
        result
            .scored(0.4)
            .observe("The story progresses without reaching its turning points.")
    } else {
        result.scored(0.7)
    }
}

fn cast_management(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    let absent: Vec<&str> = facts
        .lines()
        .iter()
        .filter(|l| l.status.is_open() && l.gap(facts.cycle) >= 2)
        .map(|l| l.name.as_str())
        .collect();

    if absent.is_empty() {
        return result.scored(0.9);
    }
    let score = (0.8 - 0.1 * absent.len() as f64).max(0.2);
    result
        .scored(score)
        .observe(format!("Lines absent for two units or more: {}.", absent.join(", ")))
        .suggest("Bring absent lines back, even briefly, so readers do not forget them.")
}

fn act_awareness(result: CriterionResult, facts: &Facts<'_>) -> CriterionResult {
    if facts.project.dramatic_structure.current_act != Act::Setup {
        return result.scored(0.6);
    }

    let planned = facts.planned_units() as f64;
    let climax = facts
        .lines()
        .iter()
        .any(|l| l.status == LineStatus::Climax);

    if climax {
        result
            .scored(0.2)
            .observe("A line reaches its climax during the setup act.")
    } else if facts.cycle <= (planned * 0.25).round() as i64 {
        result.scored(0.8)
    } else if facts.cycle > (planned * 0.3).round() as i64 {
        result
            .scored(0.4)
            .observe("The setup act is running long.")
    } else {
        result.scored(0.6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use story_state::{HistoryEntry, LineId, TurningPointKind};

    fn score(id: &str, project: &Project) -> CriterionResult {
        let vocabulary = Vocabulary::default();
        let facts = Facts::new(project, &vocabulary);
        evaluate(&Criterion::new(id, id, 1.0, ""), &facts)
    }

    fn completed(number: u32) -> StoryUnit {
        StoryUnit::new(number).completed()
    }

    #[test]
    fn test_pacing() {
        let mut project = Project::new("P");
        assert_eq!(score("pacing", &project).score, 0.5);

        project.add_line(
            NarrativeLine::new("War")
                .with_status(LineStatus::Climax)
                .with_function(NarrativeFunction::Tension),
        );
        assert_eq!(score("pacing", &project).score, 0.3);

        project.add_line(NarrativeLine::new("Picnic").with_function(NarrativeFunction::Relief));
        assert_eq!(score("pacing", &project).score, 0.8);
    }

    #[test]
    fn test_subversion_timing() {
        let mut project = Project::new("P");
        project.add_line(
            NarrativeLine::new("Mayor")
                .with_status(LineStatus::Active)
                .with_tag("corrupt"),
        );
        let result = score("subversion-timing", &project);
        assert_eq!(result.score, 0.2);
        assert_eq!(result.suggestions.len(), 1);

        project.add_unit(completed(1).with_summary("The mayor saves the village."));
        assert_eq!(score("subversion-timing", &project).score, 0.7);

        project.dramatic_structure.current_act = Act::Confrontation;
        assert_eq!(score("subversion-timing", &project).score, 0.5);
    }

    #[test]
    fn test_arc_completeness_floor() {
        let mut project = Project::new("P");
        for i in 0..6 {
            project.add_line(
                NarrativeLine::new(format!("L{}", i))
                    .with_status(LineStatus::Active)
                    .advanced_in(0),
            );
        }
        for n in 1..=4 {
            project.add_unit(completed(n));
        }
        assert_eq!(score("arc-completeness", &project).score, 0.1);
    }

    #[test]
    fn test_micro_hooks() {
        let mut project = Project::new("P");
        for name in ["A", "B", "C"] {
            project.add_line(NarrativeLine::new(name).with_status(LineStatus::Active));
        }
        assert_eq!(score("micro-hooks", &project).score, 0.2);

        project.add_line(NarrativeLine::new("Key").with_level(LineLevel::Micro));
        assert_eq!(score("micro-hooks", &project).score, 0.8);
    }

    #[test]
    fn test_ambiguity_ignores_critical_tags_as_factions() {
        let mut project = Project::new("P");
        project.add_line(NarrativeLine::new("Guard").with_tag("city").with_tag("corrupt"));
        project.add_line(NarrativeLine::new("Baker").with_tag("city"));
        assert_eq!(score("ambiguity", &project).score, 0.8);

        project.add_line(NarrativeLine::new("Priest").with_tag("church").with_tag("corrupt"));
        project.add_line(NarrativeLine::new("Bishop").with_tag("church").with_tag("corrupt"));
        let result = score("ambiguity", &project);
        assert_eq!(result.score, 0.3);
        assert!(result.observations[0].contains("church"));
    }

    #[test]
    fn test_dignity() {
        let mut project = Project::new("P");
        assert_eq!(score("dignity", &project).score, 0.5);

        let id = project.add_line(NarrativeLine::new("Maid").with_tag("Marginalized"));
        assert_eq!(score("dignity", &project).score, 0.9);

        if let Some(line) = project.line_mut(&id) {
            line.agency = Agency::Passive;
        }
        assert_eq!(score("dignity", &project).score, 0.3);
    }

    #[test]
    fn test_page_turner_reads_last_paragraph() {
        let mut project = Project::new("P");
        project.add_unit(completed(1).with_content("It was calm.\n\nWho knocked at the door?"));
        assert_eq!(score("page-turner", &project).score, 0.8);

        project.add_unit(completed(2).with_content("Who knocked?\n\nThey slept well."));
        assert_eq!(score("page-turner", &project).score, 0.4);
    }

    #[test]
    fn test_character_attachment() {
        let mut project = Project::new("P");
        let mut line = NarrativeLine::new("Hero");
        assert_eq!(score("character-attachment", &project).score, 0.4);
        for n in 1..=2 {
            line.record(HistoryEntry {
                unit_id: None,
                unit_number: n,
                note: String::new(),
                weight_before: 0.5,
                weight_after: 0.5,
                status_before: LineStatus::Active,
                status_after: LineStatus::Active,
                agency_after: None,
            });
        }
        project.add_line(line);
        assert_eq!(score("character-attachment", &project).score, 0.7);
    }

    #[test]
    fn test_serial_momentum() {
        let mut project = Project::new("P");
        let major = project.add_line(NarrativeLine::new("War").with_level(LineLevel::Major));
        let omen = project.add_line(
            NarrativeLine::new("Omen")
                .with_level(LineLevel::Micro)
                .with_function(NarrativeFunction::Foreshadowing),
        );

        project.add_unit(completed(1).with_advanced_lines(vec![major.clone()]));
        let result = score("serial-momentum", &project);
        assert_eq!(result.score, 0.6);
        assert_eq!(result.suggestions.len(), 1);

        project.add_unit(completed(2).with_advanced_lines(vec![major, omen]));
        assert_eq!(score("serial-momentum", &project).score, 0.9);

        project.add_unit(completed(3).with_advanced_lines(vec![LineId::from("gone")]));
        assert_eq!(score("serial-momentum", &project).score, 0.3);
    }

    #[test]
    fn test_revelation_economy() {
        let mut project = Project::new("P");
        project.dramatic_structure.total_planned_units = Some(10);
        for n in 1..=5 {
            project.add_unit(completed(n));
        }
        // 0/6 revealed at 50% progress.
        assert_eq!(score("revelation-economy", &project).score, 0.4);

        for kind in TurningPointKind::ALL.iter().take(3) {
            project.dramatic_structure.reach(*kind);
        }
        assert_eq!(score("revelation-economy", &project).score, 0.7);

        project.dramatic_structure.turning_points.clear();
        assert_eq!(score("revelation-economy", &project).score, 0.5);
    }

    #[test]
    fn test_cast_management() {
        let mut project = Project::new("P");
        project.add_line(NarrativeLine::new("A").with_status(LineStatus::Active).advanced_in(0));
        assert_eq!(score("cast-management", &project).score, 0.9);

        project.add_unit(completed(1));
        project.add_unit(completed(2));
        let result = score("cast-management", &project);
        assert!((result.score - 0.7).abs() < 1e-9);
        assert_eq!(result.suggestions.len(), 1);
    }

    #[test]
    fn test_act_awareness() {
        let mut project = Project::new("P");
        assert_eq!(score("act-awareness", &project).score, 0.8);

        for n in 1..=5 {
            project.add_unit(completed(n));
        }
        assert_eq!(score("act-awareness", &project).score, 0.4);

        project.add_line(NarrativeLine::new("War").with_status(LineStatus::Climax));
        assert_eq!(score("act-awareness", &project).score, 0.2);

        project.dramatic_structure.current_act = Act::Resolution;
        assert_eq!(score("act-awareness", &project).score, 0.6);
    }
}
