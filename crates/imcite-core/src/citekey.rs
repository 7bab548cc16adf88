//! Citekey normalization, validation, and generation
//!
//! Citekeys double as file names across every artifact store, so the
//! permitted alphabet is ASCII minus control characters and the punctuation
//! that BibTeX or the filesystem would choke on. `normalize` maps arbitrary
//! text into that alphabet and is idempotent; `Citekey` wraps a string that
//! is already in canonical form.

use std::collections::BTreeSet;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use imcite_bibtex::BibEntry;

use crate::error::CitekeyError;

lazy_static! {
    // C0 and C1 control characters plus @ ' \ , # } { ~ % and the path
    // separator. '/' would be legal in BibTeX keys but citekeys become
    // file names here.
    static ref FORBIDDEN: Regex = Regex::new(r"[\x00-\x1f\x7f-\x9f@'\\,#}{~%/]").unwrap();
}

/// Map arbitrary text into the citekey alphabet.
///
/// Applies Unicode NFKD decomposition, drops every non-ASCII remnant
/// (diacritics decompose into base letter plus combining mark, so `é`
/// becomes `e`), then strips the forbidden characters. Idempotent.
pub fn normalize(s: &str) -> String {
    let ascii: String = s.nfkd().filter(char::is_ascii).collect();
    FORBIDDEN.replace_all(&ascii, "").into_owned()
}

/// A citekey in canonical form.
///
/// Canonical means `normalize` maps the string to itself; the constructor
/// enforces this, so holding a `Citekey` is proof the key is usable as a
/// file name in every store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Citekey(String);

impl Citekey {
    /// Wrap a string that must already be canonical.
    ///
    /// Fails with `InvalidCitekey` when normalization would change the
    /// string, or when it is empty. No implicit re-normalization: a caller
    /// handing over `"Föö99"` gets an error, not a silently different key.
    pub fn new(s: impl Into<String>) -> Result<Self, CitekeyError> {
        let s = s.into();
        if s.is_empty() || normalize(&s) != s {
            return Err(CitekeyError::InvalidCitekey(s));
        }
        Ok(Self(s))
    }

    /// Normalize first, then wrap; fails only when nothing survives
    pub fn sanitized(s: &str) -> Result<Self, CitekeyError> {
        let cleaned = normalize(s);
        if cleaned.is_empty() {
            return Err(CitekeyError::InvalidCitekey(s.to_string()));
        }
        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Citekey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Citekey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive a citekey candidate from a bibliographic record.
///
/// The candidate is the last name of the first author (first editor when no
/// author field exists) concatenated with the year, or with nothing when the
/// year is absent, normalized into the citekey alphabet. Fails with
/// `MissingAuthor` when neither an author nor an editor is present. The
/// result is not checked for uniqueness; see [`uniquify`].
pub fn generate(entry: &BibEntry) -> Result<Citekey, CitekeyError> {
    let people = entry
        .author()
        .or_else(|| entry.editor())
        .ok_or(CitekeyError::MissingAuthor)?;
    let last = first_person_last_name(people).ok_or(CitekeyError::MissingAuthor)?;
    let year = entry.year().unwrap_or("");
    Citekey::sanitized(&format!("{last}{year}"))
}

/// Make `base` unique against a set of taken keys.
///
/// Returns `base` unchanged when free; otherwise tries letter suffixes
/// `a`..`z`, then numeric suffixes `2`, `3`, ..., falling back to a UUID
/// fragment past a safety limit that real repositories never reach.
pub fn uniquify(base: Citekey, taken: &BTreeSet<Citekey>) -> Citekey {
    if !taken.contains(&base) {
        return base;
    }

    for letter in 'a'..='z' {
        let candidate = Citekey(format!("{base}{letter}"));
        if !taken.contains(&candidate) {
            return candidate;
        }
    }

    let mut counter = 2u32;
    loop {
        let candidate = Citekey(format!("{base}{counter}"));
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
        if counter > 10_000 {
            let id = uuid::Uuid::new_v4().to_string();
            let fragment = id.split('-').next().unwrap_or("x");
            return Citekey(format!("{base}_{fragment}"));
        }
    }
}

/// Last name of the first person in a BibTeX name list.
///
/// Handles `Last, First and ...` and `First Last and ...`; for the latter
/// the last whitespace-separated word is taken.
fn first_person_last_name(people: &str) -> Option<String> {
    let first = people.split(" and ").next().unwrap_or(people).trim();
    if first.is_empty() {
        return None;
    }
    if let Some(comma) = first.find(',') {
        let last = first[..comma].trim();
        return (!last.is_empty()).then(|| last.to_string());
    }
    first.split_whitespace().last().map(str::to_string)
}
