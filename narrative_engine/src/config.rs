//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! [scoring]
//! decay_rate = 0.3
//!
//! [pipeline]
//! max_selected = 4
//!
//! [rules.neglect]
//! threshold = 4
//!
//! [rules.premature-subversion]
//! enabled = false
//!
//! [vocabulary]
//! critical_tags = ["satire", "toxic"]
//! ```
//!
//! Every field has a default, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;
use crate::rules::RulesConfig;
use crate::scoring::ScoringConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub vocabulary: Vocabulary,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}

/// Keyword lists the tag- and text-based heuristics match against.
///
/// Matching is case-insensitive. The defaults carry English and French forms
/// since project documents are often written in French.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Tags marking a line as morally compromised.
    #[serde(default = "default_critical_tags")]
    pub critical_tags: Vec<String>,

    /// Tags marking a marginalized character line.
    #[serde(default = "default_marginalized_tags")]
    pub marginalized_tags: Vec<String>,

    /// Fragments in unit summaries that signal a heroic moment.
    #[serde(default = "default_hero_markers")]
    pub hero_markers: Vec<String>,

    /// Fragments in a closing paragraph that leave the ending open.
    #[serde(default = "default_open_ending_markers")]
    pub open_ending_markers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_critical_tags() -> Vec<String> {
    strings(&[
        "satire",
        "corrupt",
        "corrompu",
        "toxic",
        "toxique",
        "antagonist",
        "antagoniste",
    ])
}

fn default_marginalized_tags() -> Vec<String> {
    strings(&[
        "moral pivot",
        "pivot moral",
        "marginalized",
        "marginalisé",
        "scapegoat",
        "souffre-douleur",
    ])
}

fn default_hero_markers() -> Vec<String> {
    strings(&["heroi", "héroï", "saves", "rescue", "sauve"])
}

fn default_open_ending_markers() -> Vec<String> {
    strings(&["suddenly", "somewhere", "but", "soudain", "quelque part", "mais"])
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            critical_tags: default_critical_tags(),
            marginalized_tags: default_marginalized_tags(),
            hero_markers: default_hero_markers(),
            open_ending_markers: default_open_ending_markers(),
        }
    }
}

impl Vocabulary {
    pub fn is_critical_tag(&self, tag: &str) -> bool {
        contains_ignore_case(&self.critical_tags, tag)
    }

    pub fn is_marginalized_tag(&self, tag: &str) -> bool {
        contains_ignore_case(&self.marginalized_tags, tag)
    }

    /// Whether `text` contains any hero marker.
    pub fn mentions_hero_moment(&self, text: &str) -> bool {
        contains_any(text, &self.hero_markers)
    }

    /// Whether `text` contains a question mark or any open-ending marker.
    pub fn reads_as_open_ending(&self, text: &str) -> bool {
        text.contains('?') || contains_any(text, &self.open_ending_markers)
    }
}

fn contains_ignore_case(list: &[String], value: &str) -> bool {
    let value = value.trim().to_lowercase();
    list.iter().any(|item| item.to_lowercase() == value)
}

fn contains_any(text: &str, fragments: &[String]) -> bool {
    let text = text.to_lowercase();
    fragments
        .iter()
        .any(|fragment| text.contains(&fragment.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.vocabulary, Vocabulary::default());
        assert!(config.rules.is_rule_enabled("neglect"));
    }

    #[test]
    fn test_parse_sections() {
        let toml = r#"
[scoring]
decay_rate = 0.5

[pipeline]
max_selected = 4

[rules.neglect]
threshold = 4

[rules.climax-convergence]
enabled = false

[vocabulary]
critical_tags = ["Villain"]
"#;
        let config = EngineConfig::parse(toml).unwrap();
        assert_eq!(config.scoring.decay_rate, 0.5);
        assert_eq!(config.scoring.urgency_cap, 0.95);
        assert_eq!(config.pipeline.max_selected, 4);
        assert_eq!(config.pipeline.min_selected, 3);
        assert_eq!(config.rules.threshold("neglect"), Some(4));
        assert!(!config.rules.is_rule_enabled("climax-convergence"));
        assert!(config.vocabulary.is_critical_tag("villain"));
        assert!(!config.vocabulary.is_critical_tag("satire"));
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::parse("[scoring\ndecay_rate = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_vocabulary_matching() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_critical_tag("Toxique"));
        assert!(vocab.is_marginalized_tag("Souffre-douleur"));
        assert!(vocab.mentions_hero_moment("She SAVES the convoy."));
        assert!(vocab.reads_as_open_ending("Who sent the letter?"));
        assert!(vocab.reads_as_open_ending("Soudain, la porte s'ouvrit."));
        assert!(!vocab.reads_as_open_ending("They slept."));
    }
}
