//! APPLY: fold agent results back into the project.
//!
//! Weights move mechanically. Agents only say whether a line advanced and what
//! its status is now; a line gains one weight step when it both advanced and
//! changed status. All changes land on a working copy that replaces the project
//! in one assignment, so a failed apply leaves the project untouched.

use sha2::{Digest, Sha256};
use std::str::FromStr;
use tracing::{info, instrument, warn};

use story_state::{
    Agency, HistoryEntry, LineId, LineLevel, LineStatus, NarrativeFunction, NarrativeLine, Project,
    StoryUnit, UnitId,
};

use super::{
    resolve_line, CriticOutput, LookupMismatch, Orchestrator, PipelineRun, Role, VerifierOutput,
};
use crate::error::PipelineError;
use crate::evaluation::post_evaluation;

/// Everything APPLY consumes besides the run.
#[derive(Debug, Clone)]
pub struct ApplyInput {
    /// Final unit text.
    pub content: String,
    pub critic: CriticOutput,
    pub verifier: Option<VerifierOutput>,
    /// Entity-update notes, stored verbatim on the post-evaluation.
    pub entity_notes: Option<String>,
}

impl ApplyInput {
    pub fn new(content: impl Into<String>, critic: CriticOutput) -> Self {
        Self {
            content: content.into(),
            critic,
            verifier: None,
            entity_notes: None,
        }
    }

    pub fn with_verifier(mut self, verifier: VerifierOutput) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_entity_notes(mut self, notes: impl Into<String>) -> Self {
        self.entity_notes = Some(notes.into());
        self
    }

    /// SHA-256 over the content and both agent payloads, hex-encoded.
    pub fn apply_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(&self.critic).unwrap_or_default());
        hasher.update([0u8]);
        if let Some(verifier) = &self.verifier {
            hasher.update(serde_json::to_vec(verifier).unwrap_or_default());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// An agent update that could not be matched to a line.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedUpdate {
    pub role: Role,
    pub mismatch: LookupMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub unit_id: UnitId,
    pub unit_number: u32,
    /// Lines counted as advanced, in the order they were processed.
    pub advanced: Vec<LineId>,
    pub new_lines: Vec<LineId>,
    pub skipped: Vec<SkippedUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied(ApplyReport),
    /// A unit already carries this input's apply key; nothing changed.
    AlreadyApplied { unit_number: u32 },
}

/// One mechanical weight step, capped at 1.0.
pub fn bump_weight(line: &mut NarrativeLine, step: f64) {
    line.weight = (line.weight + step).clamp(0.0, 1.0);
}

fn parse_label<T: FromStr>(field: &'static str, raw: Option<&str>) -> Option<T> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(field, value = raw, "ignoring unknown label");
            None
        }
    }
}

/// Mutation state for one apply, over the working copy.
struct Fold<'a> {
    lines: &'a mut Vec<NarrativeLine>,
    cycle: i64,
    unit_id: &'a UnitId,
    unit_number: u32,
    weight_step: f64,
    advanced: Vec<LineId>,
    skipped: Vec<SkippedUpdate>,
}

impl Fold<'_> {
    fn resolve(&mut self, role: Role, id: Option<&str>, name: Option<&str>) -> Option<usize> {
        match resolve_line(&self.lines[..], id, name) {
            Ok(index) => Some(index),
            Err(mismatch) => {
                warn!(%role, %mismatch, "skipping unmatched update");
                self.skipped.push(SkippedUpdate { role, mismatch });
                None
            }
        }
    }

    fn mark_advanced(&mut self, id: &LineId) {
        if !self.advanced.contains(id) {
            self.advanced.push(id.clone());
        }
    }

    fn history_entry(
        &self,
        note: String,
        weight_before: f64,
        status_before: LineStatus,
        line: &NarrativeLine,
    ) -> HistoryEntry {
        HistoryEntry {
            unit_id: Some(self.unit_id.to_string()),
            unit_number: self.unit_number,
            note,
            weight_before,
            weight_after: line.weight,
            status_before,
            status_after: line.status,
            agency_after: Some(line.agency),
        }
    }

    fn critic(&mut self, critic: &CriticOutput) {
        for update in &critic.line_updates {
            let Some(index) = self.resolve(Role::Critic, update.id.as_deref(), update.name.as_deref())
            else {
                continue;
            };

            let new_status: Option<LineStatus> =
                parse_label("status", update.new_status.as_deref());
            let agency: Option<Agency> = parse_label("agency", update.agency.as_deref());

            let line = &mut self.lines[index];
            let weight_before = line.weight;
            let status_before = line.status;

            if let Some(status) = new_status {
                line.status = status;
            }
            if let Some(agency) = agency {
                line.agency = agency;
            }
            if let Some(projection) = &update.new_projection {
                line.projection = projection.clone();
            }

            if !update.advanced {
                continue;
            }
            if line.status != status_before {
                bump_weight(line, self.weight_step);
            }
            line.last_advanced_in_unit = self.cycle;

            let line = &self.lines[index];
            let entry = self.history_entry(
                update.note.clone().unwrap_or_default(),
                weight_before,
                status_before,
                line,
            );
            let id = line.id.clone();
            self.lines[index].record(entry);
            self.mark_advanced(&id);
        }
    }

    fn verifier(&mut self, verifier: &VerifierOutput) {
        for report in &verifier.lines {
            if !report.touched {
                continue;
            }
            let Some(touch) = report.touch() else {
                continue;
            };
            if !touch.advances() {
                continue;
            }
            let Some(index) =
                self.resolve(Role::Verifier, report.id.as_deref(), report.name.as_deref())
            else {
                continue;
            };
            if self.advanced.contains(&self.lines[index].id) {
                continue;
            }

            let new_status: Option<LineStatus> =
                parse_label("status", report.new_status.as_deref());

            let line = &mut self.lines[index];
            line.last_advanced_in_unit = self.cycle;

            let Some(status) = new_status.filter(|s| *s != line.status) else {
                continue;
            };
            let weight_before = line.weight;
            let status_before = line.status;
            line.status = status;
            bump_weight(line, self.weight_step);

            let line = &self.lines[index];
            let note = format!("[verifier] {}", report.note.as_deref().unwrap_or_default());
            let entry = self.history_entry(note.trim_end().to_string(), weight_before, status_before, line);
            let id = line.id.clone();
            self.lines[index].record(entry);
            self.mark_advanced(&id);
        }
    }
}

/// Slug id for a proposed line, suffixed until it is unused.
fn unique_line_id(lines: &[NarrativeLine], name: &str) -> LineId {
    let base = LineId::from_name(name);
    let taken = |id: &LineId| lines.iter().any(|l| &l.id == id);
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| LineId(format!("{}-{}", base.as_str(), n)))
        .find(|id| !taken(id))
        .unwrap_or_default()
}

impl Orchestrator {
    /// APPLY: consume the run and fold the agent outputs into `project`.
    ///
    /// Re-applying the same input is a no-op reported as
    /// [`ApplyOutcome::AlreadyApplied`]. A run selected before the project
    /// gained a unit is rejected as [`PipelineError::StaleRun`].
    #[instrument(skip_all, fields(cycle = run.cycle))]
    pub fn apply(
        &self,
        run: PipelineRun,
        project: &mut Project,
        input: ApplyInput,
    ) -> Result<ApplyOutcome, PipelineError> {
        let key = input.apply_key();
        if let Some(unit) = project
            .story_units
            .iter()
            .find(|u| u.apply_key.as_deref() == Some(key.as_str()))
        {
            info!(unit = unit.number, "input already applied");
            return Ok(ApplyOutcome::AlreadyApplied {
                unit_number: unit.number,
            });
        }

        let project_cycle = project.current_cycle();
        if run.cycle != project_cycle {
            return Err(PipelineError::StaleRun {
                run_cycle: run.cycle,
                project_cycle,
            });
        }

        let cycle = run.cycle;
        let unit_number = u32::try_from(cycle + 1).unwrap_or(1);
        let chapter_id = UnitId::for_chapter(unit_number);
        let unit_id = if project.story_units.iter().any(|u| u.id == chapter_id) {
            UnitId::new()
        } else {
            chapter_id
        };

        let mut working = project.clone();
        let before = working.narrative_lines.clone();

        let mut fold = Fold {
            lines: &mut working.narrative_lines,
            cycle,
            unit_id: &unit_id,
            unit_number,
            weight_step: self.config.weight_step,
            advanced: Vec::new(),
            skipped: Vec::new(),
        };
        fold.critic(&input.critic);
        if let Some(verifier) = &input.verifier {
            fold.verifier(verifier);
        }
        let Fold {
            advanced, skipped, ..
        } = fold;

        let mut new_lines = Vec::new();
        for proposal in &input.critic.new_lines {
            let name = proposal.name.trim();
            if name.is_empty() {
                warn!("skipping proposed line without a name");
                continue;
            }
            let mut line = NarrativeLine::new(name)
                .with_id(unique_line_id(&working.narrative_lines, name))
                .with_description(proposal.description.clone())
                .with_status(
                    parse_label("status", proposal.status.as_deref())
                        .unwrap_or(LineStatus::Emerging),
                )
                .with_level(parse_label("level", proposal.level.as_deref()).unwrap_or(LineLevel::Micro))
                .with_function(
                    parse_label("narrative_function", proposal.narrative_function.as_deref())
                        .unwrap_or(NarrativeFunction::Connector),
                )
                .with_agency(
                    parse_label("agency", proposal.agency.as_deref()).unwrap_or(Agency::Reactive),
                )
                .with_weight(self.config.new_line_weight)
                .created_in(cycle)
                .advanced_in(cycle);
            line.urgency = 0.0;
            line.projection = proposal.projection.clone().unwrap_or_default();
            line.tags = proposal.tags.clone();
            line.dependencies = proposal
                .dependencies
                .iter()
                .map(|d| LineId::from(d.as_str()))
                .collect();
            new_lines.push(working.add_line(line));
        }

        let title = input
            .critic
            .suggested_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| format!("Chapter {}", unit_number), str::to_string);

        let mut unit = StoryUnit::new(unit_number)
            .with_title(title)
            .with_content(input.content)
            .with_summary(input.critic.summary.clone().unwrap_or_default());
        unit.id = unit_id.clone();
        unit.commit_pre_evaluation(run.pre_evaluation)?;

        let mut post = post_evaluation(
            &self.scoring,
            &self.rules,
            &before,
            &working,
            &advanced,
            cycle,
        );
        if let Some(notes) = input.entity_notes {
            post.narrative_notes = notes;
        }
        unit.commit_post_evaluation(post, advanced.clone())?;
        unit.apply_key = Some(key);

        working.add_unit(unit);
        *project = working;

        info!(
            unit = unit_number,
            advanced = advanced.len(),
            new_lines = new_lines.len(),
            skipped = skipped.len(),
            "cycle applied"
        );

        Ok(ApplyOutcome::Applied(ApplyReport {
            unit_id,
            unit_number,
            advanced,
            new_lines,
            skipped,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CriticLineUpdate, NewLineProposal, VerifierLineReport};

    fn project() -> Project {
        let mut project = Project::new("Test");
        project.add_line(
            NarrativeLine::new("War")
                .with_id("line-war")
                .with_status(LineStatus::Active)
                .with_weight(0.5),
        );
        project.add_line(
            NarrativeLine::new("Love")
                .with_id("line-love")
                .with_status(LineStatus::Emerging)
                .with_weight(0.4),
        );
        project.add_line(
            NarrativeLine::new("Omen")
                .with_id("line-omen")
                .with_status(LineStatus::Dormant)
                .with_weight(0.2),
        );
        project
    }

    fn update(name: &str, status: Option<&str>, advanced: bool) -> CriticLineUpdate {
        CriticLineUpdate {
            name: Some(name.to_string()),
            new_status: status.map(str::to_string),
            advanced,
            note: Some(format!("{} moved", name)),
            ..CriticLineUpdate::default()
        }
    }

    fn applied(outcome: ApplyOutcome) -> ApplyReport {
        match outcome {
            ApplyOutcome::Applied(report) => report,
            other => panic!("expected an applied outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_bump_weight_is_mechanical() {
        let mut line = NarrativeLine::new("War").with_weight(0.5);
        bump_weight(&mut line, 0.05);
        bump_weight(&mut line, 0.05);
        assert!((line.weight - 0.6).abs() < 1e-9);

        let mut heavy = NarrativeLine::new("Heavy").with_weight(0.98);
        bump_weight(&mut heavy, 0.05);
        assert_eq!(heavy.weight, 1.0);
    }

    #[test]
    fn test_critic_weight_rule() {
        let orchestrator = Orchestrator::default();
        let mut project = project();
        let run = orchestrator.select(&mut project);

        let critic = CriticOutput {
            line_updates: vec![
                update("War", Some("climax"), true),
                update("Love", Some("emerging"), true),
                update("Omen", Some("emerging"), false),
            ],
            ..CriticOutput::default()
        };
        let report = applied(
            orchestrator
                .apply(run, &mut project, ApplyInput::new("Text.", critic))
                .unwrap(),
        );

        let war = project.line(&LineId::from("line-war")).unwrap();
        assert_eq!(war.status, LineStatus::Climax);
        assert!((war.weight - 0.55).abs() < 1e-9);
        assert_eq!(war.last_advanced_in_unit, 0);
        assert_eq!(war.history.len(), 1);

        // Advanced without a status change: weight unchanged.
        let love = project.line(&LineId::from("line-love")).unwrap();
        assert_eq!(love.weight, 0.4);
        assert_eq!(love.history.len(), 1);

        // Status changed without advancing: no weight, no history.
        let omen = project.line(&LineId::from("line-omen")).unwrap();
        assert_eq!(omen.status, LineStatus::Emerging);
        assert_eq!(omen.weight, 0.2);
        assert!(omen.history.is_empty());

        assert_eq!(report.advanced.len(), 2);
        assert_eq!(report.unit_number, 1);
        let unit = &project.story_units[0];
        assert_eq!(unit.title, "Chapter 1");
        assert!(unit.is_completed());
        assert!(unit.pre_evaluation.is_some());
        assert!(unit.post_evaluation.is_some());
    }

    #[test]
    fn test_verifier_rules() {
        let orchestrator = Orchestrator::default();
        let mut project = project();
        project.add_unit(StoryUnit::new(1).completed());
        let run = orchestrator.select(&mut project);

        let critic = CriticOutput {
            line_updates: vec![update("War", None, true)],
            ..CriticOutput::default()
        };
        let report_for = |name: &str, kind: &str, status: Option<&str>| VerifierLineReport {
            name: Some(name.to_string()),
            touched: true,
            kind: Some(kind.to_string()),
            new_status: status.map(str::to_string),
            note: Some("seen".to_string()),
            ..VerifierLineReport::default()
        };
        let verifier = VerifierOutput {
            lines: vec![
                report_for("War", "directly advanced", Some("resolved")),
                report_for("Love", "mentioned", None),
                report_for("Omen", "mentionnée", Some("emerging")),
                report_for("Ghost", "mentioned", None),
            ],
        };

        let report = applied(
            orchestrator
                .apply(
                    run,
                    &mut project,
                    ApplyInput::new("Text.", critic).with_verifier(verifier),
                )
                .unwrap(),
        );

        // The critic already advanced War; the verifier leaves it alone.
        let war = project.line(&LineId::from("line-war")).unwrap();
        assert_eq!(war.status, LineStatus::Active);

        // Mentioned without a status: touched but not counted as advanced.
        let love = project.line(&LineId::from("line-love")).unwrap();
        assert_eq!(love.last_advanced_in_unit, 1);
        assert!(love.history.is_empty());

        let omen = project.line(&LineId::from("line-omen")).unwrap();
        assert_eq!(omen.status, LineStatus::Emerging);
        assert!((omen.weight - 0.25).abs() < 1e-9);
        assert!(omen.history[0].note.starts_with("[verifier]"));

        assert_eq!(
            report.advanced,
            vec![LineId::from("line-war"), LineId::from("line-omen")]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].role, Role::Verifier);
    }

    #[test]
    fn test_new_lines_and_title() {
        let orchestrator = Orchestrator::default();
        let mut project = project();
        let run = orchestrator.select(&mut project);

        let critic = CriticOutput {
            new_lines: vec![
                NewLineProposal {
                    name: "War".to_string(),
                    ..NewLineProposal::default()
                },
                NewLineProposal {
                    name: "Lost Key".to_string(),
                    level: Some("major".to_string()),
                    ..NewLineProposal::default()
                },
            ],
            suggested_title: Some("Embers".to_string()),
            summary: Some("Things burn.".to_string()),
            ..CriticOutput::default()
        };
        let report = applied(
            orchestrator
                .apply(run, &mut project, ApplyInput::new("Text.", critic))
                .unwrap(),
        );

        assert_eq!(
            report.new_lines,
            vec![LineId::from("line-war-2"), LineId::from("line-lost-key")]
        );
        let key = project.line(&LineId::from("line-lost-key")).unwrap();
        assert_eq!(key.weight, 0.30);
        assert_eq!(key.status, LineStatus::Emerging);
        assert_eq!(key.level, LineLevel::Major);
        assert_eq!(key.narrative_function, NarrativeFunction::Connector);
        assert_eq!(key.agency, Agency::Reactive);
        assert_eq!(key.created_in_unit, 0);
        assert_eq!(key.last_advanced_in_unit, 0);

        let unit = &project.story_units[0];
        assert_eq!(unit.title, "Embers");
        assert_eq!(unit.summary, "Things burn.");
        assert_eq!(unit.id, UnitId::for_chapter(1));
    }

    #[test]
    fn test_reapply_is_a_no_op() {
        let orchestrator = Orchestrator::default();
        let mut project = project();
        let run = orchestrator.select(&mut project);
        let critic = CriticOutput {
            line_updates: vec![update("War", Some("climax"), true)],
            ..CriticOutput::default()
        };
        let input = ApplyInput::new("Text.", critic);

        orchestrator
            .apply(run.clone(), &mut project, input.clone())
            .unwrap();
        let snapshot = project.clone();

        let outcome = orchestrator.apply(run, &mut project, input).unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied { unit_number: 1 });
        assert_eq!(project, snapshot);
    }

    #[test]
    fn test_stale_run_is_rejected() {
        let orchestrator = Orchestrator::default();
        let mut project = project();
        let run = orchestrator.select(&mut project);
        project.add_unit(StoryUnit::new(1).completed());
        let snapshot = project.clone();

        let err = orchestrator
            .apply(run, &mut project, ApplyInput::new("Text.", CriticOutput::default()))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StaleRun {
                run_cycle: 0,
                project_cycle: 1
            }
        ));
        assert_eq!(project, snapshot);
    }
}
