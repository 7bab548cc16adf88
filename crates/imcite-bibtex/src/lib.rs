//! BibTeX parsing and formatting for the imcite reference manager
//!
//! A small, dependency-light codec: text in, `BibEntry` values out, and back.
//! The storage core consumes this crate purely as an encode/decode capability
//! and never inspects BibTeX syntax itself.

mod entry;
mod formatter;
pub mod parser;

pub use entry::{BibEntry, BibField, EntryKind};
pub use formatter::{format_entries, format_entry};
pub use parser::{parse, parse_one, ParseError, ParseIssue, ParseResult};
