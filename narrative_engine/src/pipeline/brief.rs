//! Role briefs: owned, serializable data slices handed to external agents.
//!
//! Each brief type carries only what its role may see. The writer brief has no
//! numeric field and no rule name in its type, so scores cannot leak into
//! drafting.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use story_state::{Agency, LineStatus, Project};

use super::{AnalystOutput, Orchestrator, PipelineRun, Role, SelectedLine};
use crate::error::PipelineError;

/// Agent outputs gathered so far in the cycle.
#[derive(Debug, Clone, Default)]
pub struct BriefInputs {
    pub analyst_output: Option<AnalystOutput>,
    pub draft: Option<String>,
}

impl BriefInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analyst_output(mut self, output: AnalystOutput) -> Self {
        self.analyst_output = Some(output);
        self
    }

    pub fn with_draft(mut self, draft: impl Into<String>) -> Self {
        self.draft = Some(draft.into());
        self
    }
}

/// Name, status and description: the narrative facts about a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFacts {
    pub name: String,
    pub status: LineStatus,
    pub description: String,
}

impl LineFacts {
    fn from_selected(line: &SelectedLine) -> Self {
        Self {
            name: line.name.clone(),
            status: line.status,
            description: line.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryNote {
    pub unit_number: u32,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystLine {
    pub name: String,
    pub status: LineStatus,
    pub description: String,
    pub agency: Agency,
    pub projection: Vec<String>,
    pub history: Vec<HistoryNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystBrief {
    /// `Ch.N "title": summary`, oldest first.
    pub previous_units: Vec<String>,
    pub lines: Vec<AnalystLine>,
    pub alerts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriterBrief {
    pub unit_number: u32,
    pub previous_units: Vec<String>,
    pub lines: Vec<LineFacts>,
    pub constraints: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticLine {
    pub name: String,
    pub status: LineStatus,
    pub agency: Agency,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticBrief {
    pub draft: String,
    pub lines: Vec<CriticLine>,
    pub constraints: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifierBrief {
    pub draft: String,
    /// Every non-resolved line of the project, not only the selection.
    pub lines: Vec<LineFacts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorBrief {
    pub draft: String,
    pub previous_unit: Option<String>,
    pub line_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdateBrief {
    pub draft: String,
    pub lines: Vec<LineFacts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum Brief {
    Analyst(AnalystBrief),
    Writer(WriterBrief),
    Critic(CriticBrief),
    Verifier(VerifierBrief),
    Editor(EditorBrief),
    EntityUpdate(EntityUpdateBrief),
}

impl Brief {
    pub fn role(&self) -> Role {
        match self {
            Brief::Analyst(_) => Role::Analyst,
            Brief::Writer(_) => Role::Writer,
            Brief::Critic(_) => Role::Critic,
            Brief::Verifier(_) => Role::Verifier,
            Brief::Editor(_) => Role::Editor,
            Brief::EntityUpdate(_) => Role::EntityUpdate,
        }
    }

    /// Plain-text rendering suitable as an agent prompt body.
    pub fn to_prompt_string(&self) -> String {
        match self {
            Brief::Analyst(b) => b.render(),
            Brief::Writer(b) => b.render(),
            Brief::Critic(b) => b.render(),
            Brief::Verifier(b) => b.render(),
            Brief::Editor(b) => b.render(),
            Brief::EntityUpdate(b) => b.render(),
        }
    }
}

fn summaries_or(previous: &[String], fallback: &str) -> String {
    if previous.is_empty() {
        fallback.to_string()
    } else {
        previous.join("\n")
    }
}

fn facts_block(lines: &[LineFacts]) -> String {
    lines
        .iter()
        .map(|l| format!("■ {} [{}]\n  {}", l.name, l.status, l.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl AnalystBrief {
    fn render(&self) -> String {
        let mut lines = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                lines.push_str("\n\n");
            }
            let _ = writeln!(lines, "■ {} [{}]", line.name, line.status);
            let _ = writeln!(lines, "  {}", line.description);
            let _ = writeln!(lines, "  Agency: {}", line.agency.as_str());
            lines.push_str("  Possible projections:\n");
            if line.projection.is_empty() {
                lines.push_str("  (none)\n");
            }
            for projection in &line.projection {
                let _ = writeln!(lines, "  → {}", projection);
            }
            lines.push_str("  Recent history:");
            if line.history.is_empty() {
                lines.push_str("\n  (none)");
            }
            for entry in &line.history {
                let _ = write!(lines, "\n  - Ch.{}: {}", entry.unit_number, entry.note);
            }
        }

        let alerts = if self.alerts.is_empty() {
            "No alerts.".to_string()
        } else {
            self.alerts
                .iter()
                .map(|a| format!("- {}", a))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "You are the Analyst. State what each narrative line NEEDS at this point of the story: \
             what must happen, never how it should be written. No scenes, no dialogue.\n\n\
             PREVIOUS CHAPTERS:\n{}\n\n\
             LINES TO ADDRESS:\n{}\n\n\
             ENGINE ALERTS:\n{}\n\n\
             TASK:\nFor each line give its narrative need (progress, pause, inflection, escalation), \
             a priority (high / medium / low), the required agency (act / endure / observe) and the \
             retained projection, if any. Add general constraints: how many lines may hold the \
             foreground, whether micro-events are needed.\n\n\
             Answer as JSON: {{\"perLine\": {{<line>: {{\"need\", \"priority\", \"requiredAgency\", \
             \"chosenProjection\"}}}}, \"generalConstraints\"}}.",
            summaries_or(&self.previous_units, "No previous chapter."),
            lines,
            alerts
        )
    }
}

impl WriterBrief {
    fn render(&self) -> String {
        format!(
            "You are the Writer. Write chapter {} of the novel.\n\n\
             PREVIOUS CHAPTER SUMMARIES:\n{}\n\n\
             ASSIGNED NARRATIVE LINES:\n{}\n\n\
             CONSTRAINTS FROM THE ANALYST:\n{}\n\n\
             WRITING RULES:\n\
             - Literary prose, never didactic narration\n\
             - Show, don't explain\n\
             - Paragraphs separated by blank lines\n\
             - Do not close the chapter on a settled ending\n\n\
             You do not know what comes next. Text only, no commentary.",
            self.unit_number,
            summaries_or(&self.previous_units, "First chapter."),
            facts_block(&self.lines),
            self.constraints
        )
    }
}

impl CriticBrief {
    fn render(&self) -> String {
        let lines = self
            .lines
            .iter()
            .map(|l| {
                format!(
                    "■ {} [{}] agency: {}\n  {}",
                    l.name,
                    l.status,
                    l.agency.as_str(),
                    l.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "You are the Critic. Assess the chapter and report the STATUS and AGENCY of each \
             assigned line. Do not propose weights: the engine computes them.\n\n\
             CHAPTER TEXT:\n{}\n\n\
             ASSIGNED LINES (state before the chapter):\n{}\n\n\
             CONSTRAINTS GIVEN TO THE WRITER:\n{}\n\n\
             TASK:\nFor each line: advanced (yes/no), new status (dormant / emerging / active / \
             climax / resolving / resolved), observed agency (passive / reactive / proactive), a \
             factual note, an updated projection. Also: new lines to create, inconsistencies, a \
             2-3 sentence summary and a suggested title.\n\n\
             Answer as JSON: {{\"lineUpdates\": [{{\"id\"|\"name\", \"newStatus\", \"agency\", \
             \"advanced\", \"note\", \"newProjection\"}}], \"newLines\", \"suggestedTitle\", \
             \"summary\"}}.",
            self.draft,
            lines,
            self.constraints.as_deref().unwrap_or("(none)")
        )
    }
}

impl VerifierBrief {
    fn render(&self) -> String {
        format!(
            "You are the Verifier. Reread the chapter and find EVERY narrative line it touches, \
             even implicitly: a character mentioned, a theme brushed, a tension fed indirectly.\n\n\
             CHAPTER TEXT:\n{}\n\n\
             ALL OPEN LINES OF THE PROJECT:\n{}\n\n\
             TASK:\nFor each line: touched (yes/no), type (directly advanced / mentioned / \
             thematic / absent), a short quote or note, and a new status if one is needed.\n\n\
             Answer as JSON: {{\"lines\": [{{\"id\"|\"name\", \"touched\", \"type\", \"note\", \
             \"newStatus\"}}]}}.",
            self.draft,
            facts_block(&self.lines)
        )
    }
}

impl EditorBrief {
    fn render(&self) -> String {
        format!(
            "You are the Editor. Polish the chapter for continuity and rhythm without changing \
             what happens.\n\n\
             PREVIOUS CHAPTER:\n{}\n\n\
             LINES IN PLAY:\n{}\n\n\
             CHAPTER TEXT:\n{}\n\n\
             Return the edited text only.",
            self.previous_unit.as_deref().unwrap_or("First chapter."),
            self.line_names.join(", "),
            self.draft
        )
    }
}

impl EntityUpdateBrief {
    fn render(&self) -> String {
        format!(
            "You are the Entity Keeper. List what changed in this chapter for the characters, \
             places and objects attached to these lines.\n\n\
             LINES:\n{}\n\n\
             CHAPTER TEXT:\n{}\n\n\
             Return short factual notes, one per entity.",
            facts_block(&self.lines),
            self.draft
        )
    }
}

impl Orchestrator {
    /// BRIEF(role): build the data slice for one agent call. Pure.
    pub fn brief(
        &self,
        run: &PipelineRun,
        role: Role,
        project: &Project,
        inputs: &BriefInputs,
    ) -> Result<Brief, PipelineError> {
        let selected = &run.selection.lines;
        let draft = || {
            inputs
                .draft
                .clone()
                .ok_or(PipelineError::MissingInput {
                    role,
                    input: "the draft",
                })
        };

        let brief = match role {
            Role::Analyst => Brief::Analyst(AnalystBrief {
                previous_units: previous_units(project, self.config.analyst_summary_depth),
                lines: selected
                    .iter()
                    .map(|l| AnalystLine {
                        name: l.name.clone(),
                        status: l.status,
                        description: l.description.clone(),
                        agency: l.agency,
                        projection: l.projection.clone(),
                        history: l
                            .history
                            .iter()
                            .map(|h| HistoryNote {
                                unit_number: h.unit_number,
                                note: h.note.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                alerts: run
                    .selection
                    .context
                    .alerts
                    .iter()
                    .map(|a| a.message.clone())
                    .collect(),
            }),
            Role::Writer => {
                let analyst = inputs
                    .analyst_output
                    .as_ref()
                    .ok_or(PipelineError::MissingInput {
                        role,
                        input: "the analyst output",
                    })?;
                Brief::Writer(WriterBrief {
                    unit_number: next_unit_number(run),
                    previous_units: previous_units(project, self.config.writer_summary_depth),
                    lines: selected.iter().map(LineFacts::from_selected).collect(),
                    constraints: analyst.constraints_text(),
                })
            }
            Role::Critic => Brief::Critic(CriticBrief {
                draft: draft()?,
                lines: selected
                    .iter()
                    .map(|l| CriticLine {
                        name: l.name.clone(),
                        status: l.status,
                        agency: l.agency,
                        description: l.description.clone(),
                    })
                    .collect(),
                constraints: inputs
                    .analyst_output
                    .as_ref()
                    .map(AnalystOutput::constraints_text),
            }),
            Role::Verifier => Brief::Verifier(VerifierBrief {
                draft: draft()?,
                lines: project
                    .unresolved_lines()
                    .map(|l| LineFacts {
                        name: l.name.clone(),
                        status: l.status,
                        description: l.description.clone(),
                    })
                    .collect(),
            }),
            Role::Editor => Brief::Editor(EditorBrief {
                draft: draft()?,
                previous_unit: previous_units(project, 1).pop(),
                line_names: selected.iter().map(|l| l.name.clone()).collect(),
            }),
            Role::EntityUpdate => Brief::EntityUpdate(EntityUpdateBrief {
                draft: draft()?,
                lines: selected.iter().map(LineFacts::from_selected).collect(),
            }),
        };
        Ok(brief)
    }
}

fn next_unit_number(run: &PipelineRun) -> u32 {
    u32::try_from(run.cycle + 1).unwrap_or(1)
}

/// Summaries of the last `depth` completed units, oldest first.
fn previous_units(project: &Project, depth: usize) -> Vec<String> {
    project
        .recent_completed_units(depth)
        .into_iter()
        .map(|u| format!("Ch.{} \"{}\": {}", u.number, u.title, u.summary))
        .collect()
}
