//! Per-paper metadata
//!
//! A metadata record carries the two keys the broker interprets, the
//! external document pointer and the note list, plus an open extension bag
//! for everything else (tags, timestamps, whatever a user's tooling added).
//! Unknown fields round-trip through decode/encode untouched.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Metadata stored alongside a paper's bibliographic record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMeta {
    /// Absolute path to a document the user keeps outside the repository.
    /// Ignored whenever a stored document exists for the same citekey.
    #[serde(
        rename = "external-document",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_document: Option<PathBuf>,

    /// Note identifiers attached to the paper, in attachment order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    /// Fields the broker does not interpret. Preserved as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PaperMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags recorded in the extension bag, in stored order.
    ///
    /// Non-string members of a `tags` sequence are skipped rather than
    /// erroring; tags are a convenience, not a validated field.
    pub fn tags(&self) -> Vec<String> {
        match self.extra.get("tags") {
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Append a tag unless already present.
    pub fn add_tag(&mut self, tag: &str) {
        let entry = self
            .extra
            .entry("tags".to_string())
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if !matches!(entry, Value::Sequence(_)) {
            *entry = Value::Sequence(Vec::new());
        }
        if let Value::Sequence(seq) = entry {
            if !seq.iter().any(|v| v.as_str() == Some(tag)) {
                seq.push(Value::String(tag.to_string()));
            }
        }
    }

    /// Remove a tag; drops the `tags` entry entirely when the last one goes.
    /// Returns whether the tag was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some(Value::Sequence(seq)) = self.extra.get_mut("tags") else {
            return false;
        };
        let before = seq.len();
        seq.retain(|v| v.as_str() != Some(tag));
        let removed = seq.len() < before;
        if seq.is_empty() {
            self.extra.remove("tags");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let meta = PaperMeta::new();
        assert!(meta.external_document.is_none());
        assert!(meta.notes.is_empty());
        assert!(meta.extra.is_empty());
        assert!(meta.tags().is_empty());
    }

    #[test]
    fn test_tag_accessors() {
        let mut meta = PaperMeta::new();
        meta.add_tag("search");
        meta.add_tag("web");
        meta.add_tag("search");
        assert_eq!(meta.tags(), vec!["search", "web"]);

        assert!(meta.remove_tag("search"));
        assert!(!meta.remove_tag("search"));
        assert_eq!(meta.tags(), vec!["web"]);

        assert!(meta.remove_tag("web"));
        assert!(meta.extra.get("tags").is_none());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let yaml = "external-document: /papers/pagerank.pdf\nnotes:\n- summary\ntags:\n- search\nadded: '2013-11-14 13:14:20'\nrating: 5\n";
        let meta: PaperMeta = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            meta.external_document.as_deref(),
            Some(std::path::Path::new("/papers/pagerank.pdf"))
        );
        assert_eq!(meta.notes, vec!["summary"]);
        assert_eq!(meta.tags(), vec!["search"]);
        assert_eq!(
            meta.extra.get("added").and_then(Value::as_str),
            Some("2013-11-14 13:14:20")
        );

        let encoded = serde_yaml::to_string(&meta).unwrap();
        let again: PaperMeta = serde_yaml::from_str(&encoded).unwrap();
        assert_eq!(again, meta);
    }

    #[test]
    fn test_absent_keys_stay_absent_when_encoded() {
        let encoded = serde_yaml::to_string(&PaperMeta::new()).unwrap();
        assert!(!encoded.contains("external-document"));
        assert!(!encoded.contains("notes"));
    }
}
