//! BibTeX formatting
//!
//! Writes `BibEntry` values back out as BibTeX text. Formatting an entry and
//! parsing the result yields an equal entry, which the storage layer relies
//! on for its push/pull round trip.

use super::entry::BibEntry;

/// Format a single entry as BibTeX text
pub fn format_entry(entry: &BibEntry) -> String {
    let mut out = String::new();
    out.push('@');
    out.push_str(entry.kind.as_str());
    out.push('{');
    out.push_str(&entry.key);
    out.push_str(",\n");

    for field in &entry.fields {
        out.push_str("    ");
        out.push_str(&field.name);
        out.push_str(" = ");
        push_value(&mut out, &field.value);
        out.push_str(",\n");
    }

    out.push('}');
    out
}

/// Format several entries, blank-line separated
pub fn format_entries(entries: &[BibEntry]) -> String {
    entries
        .iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Write a field value, leaving purely numeric values unbraced
fn push_value(out: &mut String, value: &str) {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        out.push_str(value);
    } else {
        out.push('{');
        out.push_str(value);
        out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use crate::parser::parse_one;

    fn sample() -> BibEntry {
        let mut entry = BibEntry::new("Page99", EntryKind::TechReport);
        entry.add_field("author", "Page, Lawrence and Brin, Sergey");
        entry.add_field("title", "The {PageRank} Citation Ranking");
        entry.add_field("year", "1999");
        entry
    }

    #[test]
    fn test_format_shape() {
        let text = format_entry(&sample());
        assert!(text.starts_with("@techreport{Page99,"));
        assert!(text.contains("author = {Page, Lawrence and Brin, Sergey},"));
        assert!(text.contains("year = 1999,"));
        assert!(text.ends_with('}'));
    }

    #[test]
    fn test_round_trip_preserves_entry() {
        let entry = sample();
        let parsed = parse_one(&format_entry(&entry)).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_empty_value_braced() {
        let mut entry = BibEntry::new("k", EntryKind::Misc);
        entry.add_field("note", "");
        let text = format_entry(&entry);
        assert!(text.contains("note = {},"));
        assert_eq!(parse_one(&text).unwrap(), entry);
    }

    #[test]
    fn test_format_entries_separated() {
        let a = BibEntry::new("a", EntryKind::Misc);
        let b = BibEntry::new("b", EntryKind::Misc);
        let text = format_entries(&[a, b]);
        assert!(text.contains("@misc{a,"));
        assert!(text.contains("\n\n@misc{b,"));
    }
}
