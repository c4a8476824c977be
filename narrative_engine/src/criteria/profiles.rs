//! Evaluator profiles: built-in personas and TOML-defined ones.
//!
//! ```toml
//! [[profiles]]
//! id = "editor-in-chief"
//! name = "The Editor"
//! role = "critic"
//!
//! [[profiles.criteria]]
//! id = "pacing"
//! name = "Pacing"
//! weight = 0.9
//! ```

use serde::{Deserialize, Serialize};

use super::Criterion;
use crate::error::ConfigError;

/// What a profile reads the project as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    Analyst,
    Writer,
    Critic,
    Reader,
    Strategist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub role: ProfileRole,
    #[serde(default)]
    pub expertise: String,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

impl Profile {
    pub fn new(id: &str, name: &str, role: ProfileRole) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role,
            expertise: String::new(),
            criteria: Vec::new(),
        }
    }

    pub fn with_expertise(mut self, expertise: &str) -> Self {
        self.expertise = expertise.to_string();
        self
    }

    pub fn with_criterion(mut self, id: &str, name: &str, weight: f64, description: &str) -> Self {
        self.criteria.push(Criterion::new(id, name, weight, description));
        self
    }
}

/// The four built-in personas.
pub fn builtin_profiles() -> Vec<Profile> {
    vec![
        Profile::new("narratologist", "The Narratologist", ProfileRole::Critic)
            .with_expertise("Story structure, arcs and the timing of reversals.")
            .with_criterion("pacing", "Pacing", 0.8, "Tension alternates with relief.")
            .with_criterion(
                "subversion-timing",
                "Subversion timing",
                0.9,
                "Heroes are established before being undermined.",
            )
            .with_criterion("arc-completeness", "Arc completeness", 0.7, "No open line stalls.")
            .with_criterion("setup-payoff", "Setup and payoff", 0.8, "What is planted pays off.")
            .with_criterion("micro-hooks", "Micro-hooks", 0.6, "Small threads keep the reader turning pages."),
        Profile::new("social-critic", "The Social Critic", ProfileRole::Critic)
            .with_expertise("Representation, satire and systemic critique.")
            .with_criterion("show-dont-tell", "Show, don't tell", 0.9, "Themes are dramatized, not stated.")
            .with_criterion("ambiguity", "Moral ambiguity", 0.85, "No camp is uniformly good or bad.")
            .with_criterion("systemic-critique", "Systemic critique", 0.8, "Institutions, not only individuals, are questioned.")
            .with_criterion("dignity", "Dignity", 0.9, "Marginalized characters have agency.")
            .with_criterion("satire-subtlety", "Satire subtlety", 0.7, "Satire stays below caricature."),
        Profile::new("naive-reader", "The Naive Reader", ProfileRole::Reader)
            .with_expertise("First-read pleasure and emotional investment.")
            .with_criterion("page-turner", "Page-turner", 0.9, "Chapters end on an open question.")
            .with_criterion("character-attachment", "Character attachment", 0.85, "Characters develop over time.")
            .with_criterion("clarity", "Clarity", 0.8, "The reader knows who wants what.")
            .with_criterion("surprise", "Surprise", 0.7, "Events are not all predictable.")
            .with_criterion("world-desire", "World desire", 0.6, "The world makes the reader want to stay."),
        Profile::new("showrunner", "The Showrunner", ProfileRole::Strategist)
            .with_expertise("Serial momentum, cast economy and season structure.")
            .with_criterion("serial-momentum", "Serial momentum", 0.9, "Each unit moves a major line and plants the next.")
            .with_criterion("revelation-economy", "Revelation economy", 0.85, "Turning points keep pace with progress.")
            .with_criterion("cast-management", "Cast management", 0.7, "No open line vanishes for long.")
            .with_criterion("tonal-consistency", "Tonal consistency", 0.75, "The tone holds across units.")
            .with_criterion("act-awareness", "Act awareness", 0.9, "Each act keeps to its share of the story."),
    ]
}

/// Look up a profile by id among the given ones.
pub fn find_profile<'a>(profiles: &'a [Profile], id: &str) -> Option<&'a Profile> {
    profiles.iter().find(|p| p.id == id)
}

#[derive(Deserialize)]
struct ProfileDocument {
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// Parse `[[profiles]]` tables.
pub fn profiles_from_toml(content: &str) -> Result<Vec<Profile>, ConfigError> {
    let document: ProfileDocument = toml::from_str(content).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })?;
    Ok(document.profiles)
}
