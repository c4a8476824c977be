//! Structural and craft rules. These consult project-level structures: the
//! dramatic arc, thematic questions and the tension graph.

use std::collections::BTreeMap;

use story_state::{Act, TensionKind};

use super::{Alert, AlertKind, Rule, RuleContext, RuleId, RulesConfig};
use crate::config::Vocabulary;
use crate::error::RuleError;

const DEFAULT_STALE_THRESHOLD: u32 = 3;

/// Built-in structural rules in registry order.
pub fn build(config: &RulesConfig, vocabulary: &Vocabulary) -> Vec<Box<dyn Rule>> {
    let threshold = |id: RuleId| config.threshold(id.as_str()).unwrap_or(DEFAULT_STALE_THRESHOLD);

    let critical_tags = config
        .get(RuleId::PrematureSubversion.as_str())
        .and_then(|c| c.get_str_list("critical_tags"))
        .unwrap_or_else(|| vocabulary.critical_tags.clone());

    vec![
        Box::new(PrematureSubversion { critical_tags }),
        Box::new(AgencyDeficit {
            threshold: threshold(RuleId::AgencyDeficit),
        }),
        Box::new(ThematicDrift {
            threshold: threshold(RuleId::ThematicDrift),
        }),
        Box::new(TensionStagnation {
            threshold: threshold(RuleId::TensionStagnation),
        }),
        Box::new(PacingActDuration::default()),
        Box::new(PerspectiveDesync { min_distance: 3 }),
    ]
}

/// A whole tag group revealed as compromised while the story is still in its
/// setup, before the reader had a chance to believe in it.
#[derive(Debug, Clone)]
pub struct PrematureSubversion {
    pub critical_tags: Vec<String>,
}

impl PrematureSubversion {
    fn is_critical(&self, tag: &str) -> bool {
        self.critical_tags.iter().any(|c| c.eq_ignore_ascii_case(tag.trim()))
    }
}

impl Rule for PrematureSubversion {
    fn id(&self) -> RuleId {
        RuleId::PrematureSubversion
    }

    fn name(&self) -> &'static str {
        "Premature subversion"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        if ctx.project.dramatic_structure.current_act != Act::Setup {
            return Ok(Vec::new());
        }

        // tag -> (members, critical members)
        let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for line in ctx.open_lines() {
            let critical = line.tags.iter().any(|t| self.is_critical(t));
            for tag in line.tags.iter().filter(|t| !self.is_critical(t)) {
                let entry = groups.entry(tag.trim().to_lowercase()).or_default();
                entry.0 += 1;
                if critical {
                    entry.1 += 1;
                }
            }
        }

        let alerts = groups
            .into_iter()
            .filter(|(_, (members, critical))| *members >= 2 && critical == members)
            .map(|(tag, (members, _))| {
                Alert::new(
                    self.id().as_str(),
                    self.name(),
                    AlertKind::Warning,
                    0.7,
                    format!(
                        "All {} \"{}\" lines are already shown as compromised during the setup. \
                         Give the reader a moment of belief first.",
                        members, tag
                    ),
                )
            })
            .collect();
        Ok(alerts)
    }
}

/// A line whose characters have endured rather than acted for too long.
#[derive(Debug, Clone)]
pub struct AgencyDeficit {
    pub threshold: u32,
}

impl Rule for AgencyDeficit {
    fn id(&self) -> RuleId {
        RuleId::AgencyDeficit
    }

    fn name(&self) -> &'static str {
        "Agency deficit"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let threshold = self.threshold.max(1) as i64;

        let alerts = ctx
            .open_lines()
            .filter_map(|line| {
                let since = line.passive_since()?;
                let passive_for = ctx.current_cycle - since;
                (passive_for >= threshold).then(|| {
                    let ratio = passive_for as f64 / (2 * threshold) as f64;
                    Alert::new(
                        self.id().as_str(),
                        self.name(),
                        AlertKind::Warning,
                        (0.4 + ratio * 0.6).min(1.0),
                        format!(
                            "\"{}\" has been passive for {} units. Its characters need to choose, \
                             not only endure.",
                            line.name, passive_for
                        ),
                    )
                    .for_line(line)
                })
            })
            .collect();
        Ok(alerts)
    }
}

/// A thematic question the story has stopped feeding.
#[derive(Debug, Clone)]
pub struct ThematicDrift {
    pub threshold: u32,
}

impl Rule for ThematicDrift {
    fn id(&self) -> RuleId {
        RuleId::ThematicDrift
    }

    fn name(&self) -> &'static str {
        "Thematic drift"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let threshold = self.threshold.max(1) as i64;

        let alerts = ctx
            .project
            .thematic_questions
            .iter()
            .filter_map(|question| {
                let gap = question.staleness(ctx.current_cycle);
                (gap >= threshold).then(|| {
                    Alert::new(
                        self.id().as_str(),
                        self.name(),
                        AlertKind::Guideline,
                        gap as f64 / (2 * threshold) as f64,
                        format!(
                            "The question \"{}\" has not been fed for {} units",
                            question.question, gap
                        ),
                    )
                })
            })
            .collect();
        Ok(alerts)
    }
}

/// An active tension whose two endpoints have both gone quiet.
#[derive(Debug, Clone)]
pub struct TensionStagnation {
    pub threshold: u32,
}

impl Rule for TensionStagnation {
    fn id(&self) -> RuleId {
        RuleId::TensionStagnation
    }

    fn name(&self) -> &'static str {
        "Tension stagnation"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let threshold = self.threshold.max(1) as i64;
        let mut alerts = Vec::new();

        for tension in ctx.project.line_tensions.iter().filter(|t| t.active) {
            let (Some(a), Some(b)) = (ctx.line(&tension.line_a), ctx.line(&tension.line_b)) else {
                continue;
            };
            if a.is_resolved() || b.is_resolved() {
                continue;
            }
            let stale = |gap: i64| gap >= threshold;
            if stale(a.gap(ctx.current_cycle)) && stale(b.gap(ctx.current_cycle)) {
                alerts.push(Alert::new(
                    self.id().as_str(),
                    self.name(),
                    AlertKind::Warning,
                    0.3 + 0.5 * tension.strength,
                    format!(
                        "The tension between \"{}\" and \"{}\" is stagnating: neither side has \
                         moved for {}+ units",
                        a.name, b.name, threshold
                    ),
                ));
            }
        }
        Ok(alerts)
    }
}

/// The current act has run past its share of the planned length.
#[derive(Debug, Clone)]
pub struct PacingActDuration {
    pub setup_limit: f64,
    pub confrontation_limit: f64,
    pub resolution_limit: f64,
}

impl Default for PacingActDuration {
    fn default() -> Self {
        Self {
            setup_limit: 0.30,
            confrontation_limit: 0.80,
            resolution_limit: 1.0,
        }
    }
}

impl PacingActDuration {
    fn limit(&self, act: Act) -> f64 {
        match act {
            Act::Setup => self.setup_limit,
            Act::Confrontation => self.confrontation_limit,
            Act::Resolution => self.resolution_limit,
        }
    }
}

impl Rule for PacingActDuration {
    fn id(&self) -> RuleId {
        RuleId::PacingActDuration
    }

    fn name(&self) -> &'static str {
        "Act duration"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let structure = &ctx.project.dramatic_structure;
        let Some(total) = structure.total_planned_units.filter(|t| *t > 0) else {
            return Ok(Vec::new());
        };

        let progress = ctx.current_cycle as f64 / total as f64;
        let act = structure.current_act;
        let overrun = progress - self.limit(act);
        if overrun <= 0.0 {
            return Ok(Vec::new());
        }

        Ok(vec![Alert::new(
            self.id().as_str(),
            self.name(),
            AlertKind::Guideline,
            0.4 + overrun,
            format!(
                "The {} act has reached {:.0}% of the planned {} units; its share ends at {:.0}%",
                act,
                progress * 100.0,
                total,
                self.limit(act) * 100.0
            ),
        )])
    }
}

/// Two views of the same subject that have drifted far apart in progress.
#[derive(Debug, Clone)]
pub struct PerspectiveDesync {
    pub min_distance: u8,
}

impl Rule for PerspectiveDesync {
    fn id(&self) -> RuleId {
        RuleId::PerspectiveDesync
    }

    fn name(&self) -> &'static str {
        "Perspective desync"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let mut alerts = Vec::new();

        for tension in ctx
            .project
            .line_tensions
            .iter()
            .filter(|t| t.active && t.kind == TensionKind::Perspective)
        {
            let (Some(a), Some(b)) = (ctx.line(&tension.line_a), ctx.line(&tension.line_b)) else {
                continue;
            };
            let distance = a.status.ordinal().abs_diff(b.status.ordinal());
            if distance < self.min_distance {
                continue;
            }
            alerts.push(Alert::new(
                self.id().as_str(),
                self.name(),
                AlertKind::Warning,
                0.5 + 0.1 * f64::from(distance - self.min_distance),
                format!(
                    "\"{}\" ({}) and \"{}\" ({}) show the same subject but are {} stages apart",
                    a.name, a.status, b.name, b.status, distance
                ),
            ));
        }
        Ok(alerts)
    }
}
