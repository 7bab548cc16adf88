//! BibTeX entry data structures

use serde::{Deserialize, Serialize};

/// BibTeX entry kind (the `@article`, `@book`, ... tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Article,
    Book,
    Booklet,
    InBook,
    InCollection,
    InProceedings,
    Manual,
    MastersThesis,
    Misc,
    PhdThesis,
    Proceedings,
    TechReport,
    Unpublished,
    Unknown,
}

impl EntryKind {
    /// Parse an entry kind from its tag (case-insensitive)
    pub fn parse(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "article" => Self::Article,
            "book" => Self::Book,
            "booklet" => Self::Booklet,
            "inbook" => Self::InBook,
            "incollection" => Self::InCollection,
            "inproceedings" | "conference" => Self::InProceedings,
            "manual" => Self::Manual,
            "mastersthesis" => Self::MastersThesis,
            "misc" => Self::Misc,
            "phdthesis" => Self::PhdThesis,
            "proceedings" => Self::Proceedings,
            "techreport" => Self::TechReport,
            "unpublished" => Self::Unpublished,
            _ => Self::Unknown,
        }
    }

    /// Canonical lowercase tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Book => "book",
            Self::Booklet => "booklet",
            Self::InBook => "inbook",
            Self::InCollection => "incollection",
            Self::InProceedings => "inproceedings",
            Self::Manual => "manual",
            Self::MastersThesis => "mastersthesis",
            Self::Misc => "misc",
            Self::PhdThesis => "phdthesis",
            Self::Proceedings => "proceedings",
            Self::TechReport => "techreport",
            Self::Unpublished => "unpublished",
            Self::Unknown => "misc",
        }
    }
}

impl Default for EntryKind {
    fn default() -> Self {
        Self::Article
    }
}

/// A single field (key-value pair) of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibField {
    pub name: String,
    pub value: String,
}

/// One bibliography entry: a kind, a cite key, and an ordered field list.
///
/// Field order is preserved so that formatting an entry writes fields back in
/// the order they were parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibEntry {
    pub key: String,
    pub kind: EntryKind,
    pub fields: Vec<BibField>,
}

impl BibEntry {
    /// Create an empty entry with the given key and kind
    pub fn new(key: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            key: key.into(),
            kind,
            fields: Vec::new(),
        }
    }

    /// Append a field without checking for duplicates
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(BibField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Set a field, replacing an existing one with the same name
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        let lower = name.to_lowercase();
        match self.fields.iter_mut().find(|f| f.name.to_lowercase() == lower) {
            Some(field) => field.value = value.into(),
            None => self.add_field(name, value),
        }
    }

    /// Look up a field value by name (case-insensitive)
    pub fn get_field(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.fields
            .iter()
            .find(|f| f.name.to_lowercase() == lower)
            .map(|f| f.value.as_str())
    }

    /// Remove a field by name (case-insensitive), returning its value
    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        let lower = name.to_lowercase();
        let pos = self.fields.iter().position(|f| f.name.to_lowercase() == lower)?;
        Some(self.fields.remove(pos).value)
    }

    /// The author field, if present
    pub fn author(&self) -> Option<&str> {
        self.get_field("author")
    }

    /// The editor field, if present
    pub fn editor(&self) -> Option<&str> {
        self.get_field("editor")
    }

    /// The year field, if present
    pub fn year(&self) -> Option<&str> {
        self.get_field("year")
    }

    /// The title field, if present
    pub fn title(&self) -> Option<&str> {
        self.get_field("title")
    }
}
