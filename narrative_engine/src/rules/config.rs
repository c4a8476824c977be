//! Per-rule configuration: `[rules.<id>]` tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Cycle or count threshold. When unset, mechanical rules fall back to the
    /// project's settings and structural rules to their built-in default.
    #[serde(default)]
    pub threshold: Option<u32>,

    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleConfig {
    /// A string-list option, or `None` if absent or not a list of strings.
    pub fn get_str_list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.options.get(key)?.as_array()?;
        items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

/// All rule tables, keyed by rule id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulesConfig {
    pub rules: HashMap<String, RuleConfig>,
}

impl RulesConfig {
    pub fn get(&self, rule_id: &str) -> Option<&RuleConfig> {
        self.rules.get(rule_id)
    }

    /// Rules are enabled unless explicitly disabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.rules
            .get(rule_id)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    #[must_use]
    pub fn threshold(&self, rule_id: &str) -> Option<u32> {
        self.rules.get(rule_id).and_then(|c| c.threshold)
    }

    pub fn set_enabled(&mut self, rule_id: &str, enabled: bool) {
        self.rules.entry(rule_id.to_string()).or_default().enabled = Some(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Doc {
        rules: RulesConfig,
    }

    #[test]
    fn test_default_enabled() {
        let config = RulesConfig::default();
        assert!(config.is_rule_enabled("anything"));
        assert_eq!(config.threshold("neglect"), None);
    }

    #[test]
    fn test_options() {
        let doc: Doc = toml::from_str(
            r#"
[rules.premature-subversion]
critical_tags = ["villain", "corrupt"]
mixed = ["a", 1]
"#,
        )
        .unwrap();
        let rule = doc.rules.get("premature-subversion").unwrap();
        assert_eq!(
            rule.get_str_list("critical_tags"),
            Some(vec!["villain".to_string(), "corrupt".to_string()])
        );
        assert_eq!(rule.get_str_list("mixed"), None);
        assert_eq!(rule.get_str_list("missing"), None);
    }

    #[test]
    fn test_set_enabled() {
        let mut config = RulesConfig::default();
        config.set_enabled("neglect", false);
        assert!(!config.is_rule_enabled("neglect"));
    }
}
