//! Mechanical rules: pure bookkeeping over line statuses, weights and ages.

use story_state::LineStatus;

use super::{Alert, AlertKind, Rule, RuleContext, RuleId, RulesConfig};
use crate::error::RuleError;

/// Built-in mechanical rules in registry order.
pub fn build(config: &RulesConfig) -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(Neglect {
            threshold: config.threshold(RuleId::Neglect.as_str()),
        }),
        Box::new(WeightImbalance { max_spread: 0.6 }),
        Box::new(TooManyActive {
            threshold: config.threshold(RuleId::TooManyActive.as_str()),
        }),
        Box::new(ClimaxConvergence),
        Box::new(UnresolvedPressure {
            threshold: config.threshold(RuleId::UnresolvedPressure.as_str()),
        }),
    ]
}

/// An open line that has not advanced for too many cycles.
#[derive(Debug, Clone, Default)]
pub struct Neglect {
    /// Overrides the project's `neglect_threshold` when set.
    pub threshold: Option<u32>,
}

impl Rule for Neglect {
    fn id(&self) -> RuleId {
        RuleId::Neglect
    }

    fn name(&self) -> &'static str {
        "Neglected line"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let threshold = self
            .threshold
            .unwrap_or(ctx.project.settings.neglect_threshold)
            .max(1) as i64;

        let alerts = ctx
            .open_lines()
            .filter_map(|line| {
                let gap = line.cycles_since_advance(ctx.current_cycle);
                (gap >= threshold).then(|| {
                    Alert::new(
                        self.id().as_str(),
                        self.name(),
                        AlertKind::Warning,
                        gap as f64 / (2 * threshold) as f64,
                        format!("\"{}\" has not progressed for {} units", line.name, gap),
                    )
                    .for_line(line)
                })
            })
            .collect();
        Ok(alerts)
    }
}

/// Weight spread among open lines is wide enough to eclipse the light ones.
#[derive(Debug, Clone)]
pub struct WeightImbalance {
    pub max_spread: f64,
}

impl Rule for WeightImbalance {
    fn id(&self) -> RuleId {
        RuleId::WeightImbalance
    }

    fn name(&self) -> &'static str {
        "Weight imbalance"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let weights: Vec<f64> = ctx.open_lines().map(|l| l.weight).collect();
        if weights.len() < 2 {
            return Ok(Vec::new());
        }

        let max = weights.iter().copied().fold(f64::MIN, f64::max);
        let min = weights.iter().copied().fold(f64::MAX, f64::min);
        let spread = max - min;
        if spread <= self.max_spread {
            return Ok(Vec::new());
        }

        Ok(vec![Alert::new(
            self.id().as_str(),
            self.name(),
            AlertKind::Guideline,
            spread,
            format!(
                "Wide weight spread ({:.2} to {:.2}). Some lines risk being eclipsed.",
                min, max
            ),
        )])
    }
}

/// Too many lines in the foreground at once.
#[derive(Debug, Clone, Default)]
pub struct TooManyActive {
    /// Overrides the project's `max_active_lines_warning` when set.
    pub threshold: Option<u32>,
}

impl Rule for TooManyActive {
    fn id(&self) -> RuleId {
        RuleId::TooManyActive
    }

    fn name(&self) -> &'static str {
        "Narrative overload"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let threshold = self
            .threshold
            .unwrap_or(ctx.project.settings.max_active_lines_warning)
            .max(1) as usize;
        let count = ctx.lines.iter().filter(|l| l.status.is_foreground()).count();
        if count <= threshold {
            return Ok(Vec::new());
        }

        Ok(vec![Alert::new(
            self.id().as_str(),
            self.name(),
            AlertKind::Warning,
            count as f64 / (2 * threshold) as f64,
            format!(
                "{} lines active at once. The story risks losing clarity.",
                count
            ),
        )])
    }
}

/// Several lines reaching their climax together.
#[derive(Debug, Clone, Default)]
pub struct ClimaxConvergence;

impl Rule for ClimaxConvergence {
    fn id(&self) -> RuleId {
        RuleId::ClimaxConvergence
    }

    fn name(&self) -> &'static str {
        "Climax convergence"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let names: Vec<String> = ctx
            .lines
            .iter()
            .filter(|l| l.status == LineStatus::Climax)
            .map(|l| format!("\"{}\"", l.name))
            .collect();
        if names.len() < 2 {
            return Ok(Vec::new());
        }

        Ok(vec![Alert::new(
            self.id().as_str(),
            self.name(),
            AlertKind::Guideline,
            0.5,
            format!(
                "{} lines in simultaneous climax ({}). An opportunity for convergence.",
                names.len(),
                names.join(", ")
            ),
        )])
    }
}

/// A line open for a long time without nearing resolution.
#[derive(Debug, Clone, Default)]
pub struct UnresolvedPressure {
    /// Overrides the project's `resolution_pressure_threshold` when set.
    pub threshold: Option<u32>,
}

impl Rule for UnresolvedPressure {
    fn id(&self) -> RuleId {
        RuleId::UnresolvedPressure
    }

    fn name(&self) -> &'static str {
        "Resolution pressure"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Alert>, RuleError> {
        let threshold = self
            .threshold
            .unwrap_or(ctx.project.settings.resolution_pressure_threshold)
            .max(1) as i64;

        let alerts = ctx
            .lines
            .iter()
            .filter(|l| !matches!(
                l.status,
                LineStatus::Resolved | LineStatus::Resolving | LineStatus::Climax
            ))
            .filter_map(|line| {
                let age = line.age(ctx.current_cycle);
                (age >= threshold).then(|| {
                    Alert::new(
                        self.id().as_str(),
                        self.name(),
                        AlertKind::Constraint,
                        age as f64 / (2 * threshold) as f64,
                        format!(
                            "\"{}\" has been open for {} units without nearing resolution",
                            line.name, age
                        ),
                    )
                    .for_line(line)
                })
            })
            .collect();
        Ok(alerts)
    }
}
