//! Matching agent references back to lines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use story_state::NarrativeLine;

/// Why an agent reference could not be matched to exactly one line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupMismatch {
    #[error("no line matches \"{reference}\"")]
    NotFound { reference: String },

    #[error("{count} lines are named \"{name}\"")]
    Ambiguous { name: String, count: usize },

    #[error("update carries neither an id nor a name")]
    MissingReference,
}

/// Resolve an agent reference to an index into `lines`.
///
/// An exact id match wins. Otherwise the name must match exactly one line;
/// agents sometimes put a name in the id field, so the id is tried as a name
/// too. Names compare trimmed and case-insensitively.
pub fn resolve_line(
    lines: &[NarrativeLine],
    id: Option<&str>,
    name: Option<&str>,
) -> Result<usize, LookupMismatch> {
    let id = id.map(str::trim).filter(|s| !s.is_empty());
    let name = name.map(str::trim).filter(|s| !s.is_empty());

    if let Some(id) = id {
        if let Some(index) = lines.iter().position(|l| l.id.as_str() == id) {
            return Ok(index);
        }
    }

    for candidate in [name, id].into_iter().flatten() {
        let matches: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.name.trim().to_lowercase() == candidate.to_lowercase())
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => continue,
            [index] => return Ok(*index),
            _ => {
                return Err(LookupMismatch::Ambiguous {
                    name: candidate.to_string(),
                    count: matches.len(),
                })
            }
        }
    }

    match name.or(id) {
        Some(reference) => Err(LookupMismatch::NotFound {
            reference: reference.to_string(),
        }),
        None => Err(LookupMismatch::MissingReference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<NarrativeLine> {
        vec![
            NarrativeLine::new("War").with_id("line-war"),
            NarrativeLine::new("Twin").with_id("line-twin-1"),
            NarrativeLine::new("Twin").with_id("line-twin-2"),
        ]
    }

    #[test]
    fn test_id_wins_over_name() {
        let lines = lines();
        assert_eq!(resolve_line(&lines, Some("line-twin-2"), Some("War")), Ok(2));
    }

    #[test]
    fn test_unique_name_fallback() {
        let lines = lines();
        assert_eq!(resolve_line(&lines, Some("stale-id"), Some(" war ")), Ok(0));
        assert_eq!(resolve_line(&lines, Some("War"), None), Ok(0));
    }

    #[test]
    fn test_ambiguous_name_is_reported() {
        let lines = lines();
        assert_eq!(
            resolve_line(&lines, None, Some("Twin")),
            Err(LookupMismatch::Ambiguous {
                name: "Twin".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_not_found_and_missing() {
        let lines = lines();
        assert!(matches!(
            resolve_line(&lines, None, Some("Peace")),
            Err(LookupMismatch::NotFound { .. })
        ));
        assert_eq!(
            resolve_line(&lines, Some("  "), None),
            Err(LookupMismatch::MissingReference)
        );
    }
}
