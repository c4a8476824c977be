//! Narrative line definitions.

mod history;
mod line;

pub use history::*;
pub use line::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for narrative lines.
///
/// Stored as a string so documents written by other tools (slug ids such as
/// `line-war`) round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub String);

impl LineId {
    /// Create a new random line ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Build a readable `line-<slug>` ID from a line name.
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        for c in name.trim().to_lowercase().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c);
            } else if c.is_whitespace() || c == '-' {
                if !slug.ends_with('-') {
                    slug.push('-');
                }
            }
        }
        let slug = slug.trim_matches('-');
        if slug.is_empty() {
            return Self::new();
        }
        Self(format!("line-{}", slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for LineId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LineId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_ids() {
        assert_eq!(LineId::from_name("The Long War").as_str(), "line-the-long-war");
        assert_eq!(LineId::from_name("  Kira's  return ").as_str(), "line-kiras-return");
    }

    #[test]
    fn test_slug_falls_back_to_uuid() {
        let id = LineId::from_name("???");
        assert!(!id.as_str().starts_with("line-"));
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_transparent_serde() {
        let id = LineId::from("line-war");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"line-war\"");
    }
}
