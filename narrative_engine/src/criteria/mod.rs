//! Criteria evaluation: grading narrative health through evaluator profiles.
//!
//! A profile is a weighted list of criteria. Each criterion with a known id is
//! scored by a small heuristic over the project; unknown ids degrade to a
//! neutral score instead of failing.

mod heuristics;
mod profiles;

pub use profiles::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

use story_state::Project;

use crate::config::Vocabulary;
use heuristics::Facts;

/// Score every criterion starts from, and the score of unknown ones.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// One weighted criterion of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_criterion_weight")]
    pub weight: f64,
}

fn default_criterion_weight() -> f64 {
    0.5
}

impl Criterion {
    pub fn new(id: &str, name: &str, weight: f64, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub id: String,
    pub name: String,
    pub weight: f64,
    /// Always within 0.0 - 1.0.
    pub score: f64,
    pub observations: Vec<String>,
    pub suggestions: Vec<String>,
}

impl CriterionResult {
    fn neutral(criterion: &Criterion) -> Self {
        Self {
            id: criterion.id.clone(),
            name: criterion.name.clone(),
            weight: criterion.weight,
            score: NEUTRAL_SCORE,
            observations: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    fn scored(mut self, score: f64) -> Self {
        self.score = score.clamp(0.0, 1.0);
        self
    }

    fn observe(mut self, observation: impl Into<String>) -> Self {
        self.observations.push(observation.into());
        self
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Overall verdict bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLabel {
    Solid,
    AcceptableWithReservations,
    Fragile,
    Problematic,
}

impl HealthLabel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            HealthLabel::Solid
        } else if score > 0.5 {
            HealthLabel::AcceptableWithReservations
        } else if score > 0.3 {
            HealthLabel::Fragile
        } else {
            HealthLabel::Problematic
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub label: HealthLabel,
    /// Names of up to two best criteria scoring at least 0.6.
    pub strengths: Vec<String>,
    /// Names of up to two worst criteria scoring below 0.5.
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

impl EvaluationSummary {
    fn from_results(results: &[CriterionResult], overall: f64) -> Self {
        let mut ascending: Vec<&CriterionResult> = results.iter().collect();
        ascending.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        let mut descending: Vec<&CriterionResult> = results.iter().collect();
        descending.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        Self {
            label: HealthLabel::from_score(overall),
            strengths: descending
                .iter()
                .take(2)
                .filter(|r| r.score >= 0.6)
                .map(|r| r.name.clone())
                .collect(),
            weaknesses: ascending
                .iter()
                .take(2)
                .filter(|r| r.score < 0.5)
                .map(|r| r.name.clone())
                .collect(),
            suggestions: results
                .iter()
                .flat_map(|r| r.suggestions.iter().cloned())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvaluation {
    pub profile_id: String,
    pub profile_name: String,
    pub role: ProfileRole,
    pub overall_score: f64,
    pub criteria: Vec<CriterionResult>,
    pub summary: EvaluationSummary,
}

/// Scores projects against evaluator profiles.
#[derive(Debug, Clone, Default)]
pub struct CriteriaEvaluator {
    vocabulary: Vocabulary,
}

impl CriteriaEvaluator {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    #[instrument(skip_all, fields(profile = %profile.id))]
    pub fn evaluate(&self, profile: &Profile, project: &Project) -> ProfileEvaluation {
        let facts = Facts::new(project, &self.vocabulary);

        let criteria: Vec<CriterionResult> = profile
            .criteria
            .iter()
            .map(|criterion| {
                let result = heuristics::evaluate(criterion, &facts);
                debug!(criterion = %criterion.id, score = result.score, "criterion scored");
                result
            })
            .collect();

        let total_weight: f64 = criteria.iter().map(|r| r.weight).sum();
        let overall_score = if total_weight > 0.0 {
            criteria.iter().map(|r| r.score * r.weight).sum::<f64>() / total_weight
        } else {
            0.0
        };

        ProfileEvaluation {
            profile_id: profile.id.clone(),
            profile_name: profile.name.clone(),
            role: profile.role,
            overall_score,
            summary: EvaluationSummary::from_results(&criteria, overall_score),
            criteria,
        }
    }
}
