use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Separator line the comment template puts between the human-written
/// description and the changeset metadata block.
pub const COMMENT_SEPARATOR: &str = "------";

/// One changeset as seen by the hook, loaded from the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangesetRef {
    /// Full changeset hash.
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub repo_root: PathBuf,
}

impl ChangesetRef {
    /// Changeset with only an id and a description (scan-only callers).
    pub fn from_description(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            author: String::new(),
            branch: String::new(),
            repo_root: PathBuf::new(),
        }
    }
}

/// Per-issue attributes collected while scanning a description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceAttrs {
    pub wants_resolve: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_worked: Option<f64>,
}

/// A single issue reference found in a changeset description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReference {
    pub issue_id: String,
    #[serde(flatten)]
    pub attrs: ReferenceAttrs,
}

/// Result of scanning one description.
///
/// Keys are unique; a later reference to the same issue overwrites the
/// attributes of the earlier one but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    entries: Vec<(String, ReferenceAttrs)>,
    /// User-facing warnings (malformed hours text and similar).
    pub warnings: Vec<String>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the attributes for `issue_id`, replacing any earlier entry.
    pub fn record(&mut self, issue_id: String, attrs: ReferenceAttrs) {
        match self.entries.iter_mut().find(|(id, _)| *id == issue_id) {
            Some((_, existing)) => *existing = attrs,
            None => self.entries.push((issue_id, attrs)),
        }
    }

    pub fn get(&self, issue_id: &str) -> Option<&ReferenceAttrs> {
        self.entries
            .iter()
            .find(|(id, _)| id == issue_id)
            .map(|(_, attrs)| attrs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceAttrs)> {
        self.entries.iter().map(|(id, attrs)| (id.as_str(), attrs))
    }

    pub fn references(&self) -> Vec<IssueReference> {
        self.entries
            .iter()
            .map(|(id, attrs)| IssueReference {
                issue_id: id.clone(),
                attrs: *attrs,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_overwrites_but_keeps_position() {
        let mut result = ScanResult::new();
        result.record("AB-1".into(), ReferenceAttrs::default());
        result.record("AB-2".into(), ReferenceAttrs::default());
        result.record(
            "AB-1".into(),
            ReferenceAttrs {
                wants_resolve: true,
                hours_worked: Some(2.0),
            },
        );

        assert_eq!(result.len(), 2);
        let ids: Vec<&str> = result.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["AB-1", "AB-2"]);
        assert!(result.get("AB-1").unwrap().wants_resolve);
        assert_eq!(result.get("AB-1").unwrap().hours_worked, Some(2.0));
    }

    #[test]
    fn reference_serializes_flat() {
        let r = IssueReference {
            issue_id: "AB-1".into(),
            attrs: ReferenceAttrs {
                wants_resolve: false,
                hours_worked: None,
            },
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["issue_id"], "AB-1");
        assert_eq!(json["wants_resolve"], false);
        assert!(json.get("hours_worked").is_none());
    }
}
