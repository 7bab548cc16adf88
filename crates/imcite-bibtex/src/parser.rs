//! BibTeX parser built on nom
//!
//! Handles the format as it appears in the wild:
//! - `@string` definitions, expanded into referencing fields
//! - `@preamble` and `@comment` blocks, consumed and discarded
//! - braced and quoted field values, including nested braces
//! - string concatenation with `#`
//! - free text between entries, treated as commentary
//!
//! Parsing is recovering: a malformed entry is recorded as an issue and the
//! parser resumes at the next `@`.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::map,
    IResult,
};
use std::collections::HashMap;

use super::entry::{BibEntry, EntryKind};

/// A recovered parse problem, reported with the line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub line: u32,
    pub message: String,
}

/// Entries recovered from a BibTeX source, plus any skipped garbage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub entries: Vec<BibEntry>,
    pub issues: Vec<ParseIssue>,
}

/// Failure to extract an entry from a source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed entry near line {0}")]
    Syntax(u32),
    #[error("no entry found in input")]
    Empty,
}

/// Parse every entry in a BibTeX source, recovering from malformed ones
pub fn parse(input: &str) -> ParseResult {
    let mut result = ParseResult::default();
    let mut strings: HashMap<String, String> = HashMap::new();
    let mut remaining = input;
    let mut line = 1u32;

    loop {
        let (rest, skipped) = advance_to_entry(remaining);
        line += count_lines(skipped);
        remaining = rest;

        if remaining.is_empty() {
            return result;
        }

        match parse_block(remaining, &strings) {
            Ok((rest, block)) => {
                line += count_lines(&remaining[..remaining.len() - rest.len()]);
                match block {
                    Block::Entry(entry) => result.entries.push(entry),
                    Block::StringDef(name, value) => {
                        strings.insert(name.to_lowercase(), value);
                    }
                    Block::Ignored => {}
                }
                remaining = rest;
            }
            Err(_) => {
                result.issues.push(ParseIssue {
                    line,
                    message: "malformed entry".to_string(),
                });
                // Resume at the next @, past the one that failed
                match remaining[1..].find('@') {
                    Some(pos) => {
                        line += count_lines(&remaining[..pos + 1]);
                        remaining = &remaining[pos + 1..];
                    }
                    None => return result,
                }
            }
        }
    }
}

/// Parse the first entry of a BibTeX source.
///
/// Meta blocks (`@string`, `@comment`, `@preamble`) before it are processed
/// as usual. Fails with `ParseError::Empty` when the source holds no entry at
/// all, or `ParseError::Syntax` when it holds only malformed ones.
pub fn parse_one(input: &str) -> Result<BibEntry, ParseError> {
    let result = parse(input);
    if let Some(entry) = result.entries.into_iter().next() {
        return Ok(entry);
    }
    match result.issues.first() {
        Some(issue) => Err(ParseError::Syntax(issue.line)),
        None => Err(ParseError::Empty),
    }
}

/// One `@...` block of a BibTeX file
enum Block {
    Entry(BibEntry),
    StringDef(String, String),
    Ignored,
}

fn count_lines(text: &str) -> u32 {
    text.matches('\n').count() as u32
}

/// Skip free text (implicit commentary) up to the next `@`
fn advance_to_entry(input: &str) -> (&str, &str) {
    match input.find('@') {
        Some(pos) => (&input[pos..], &input[..pos]),
        None => ("", input),
    }
}

/// Parse one `@` block: an entry, a string definition, or ignorable matter
fn parse_block<'a>(input: &'a str, strings: &HashMap<String, String>) -> IResult<&'a str, Block> {
    let (rest, _) = char('@')(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, tag) = take_while1(|c: char| c.is_ascii_alphanumeric())(rest)?;

    match tag.to_lowercase().as_str() {
        "string" => {
            let (rest, (name, value)) = parse_string_def(rest, strings)?;
            Ok((rest, Block::StringDef(name, value)))
        }
        "preamble" => {
            let (rest, _) = parse_delimited_value(rest, strings)?;
            Ok((rest, Block::Ignored))
        }
        "comment" => {
            let (rest, _) = skip_comment(rest)?;
            Ok((rest, Block::Ignored))
        }
        _ => {
            let (rest, entry) = parse_entry_block(rest, tag, strings)?;
            Ok((rest, Block::Entry(entry)))
        }
    }
}

/// `@string{name = value}`
fn parse_string_def<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, name) = field_name(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, value) = parse_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;
    Ok((rest, (name.to_string(), value)))
}

/// `{ <value> }` wrapper used by @preamble
fn parse_delimited_value<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, String> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, value) = parse_value(rest, strings)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('}')(rest)?;
    Ok((rest, value))
}

/// `@comment{...}` or a bare comment running to end of line
fn skip_comment(input: &str) -> IResult<&str, ()> {
    let (rest, _) = multispace0(input)?;
    if rest.starts_with('{') {
        let (rest, _) = braced_raw(rest)?;
        Ok((rest, ()))
    } else {
        let end = rest.find('\n').unwrap_or(rest.len());
        Ok((&rest[end..], ()))
    }
}

/// `{key, field = value, ...}` after the entry tag
fn parse_entry_block<'a>(
    input: &'a str,
    tag: &str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, BibEntry> {
    let (rest, _) = multispace0(input)?;
    let (rest, _) = char('{')(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, key) = take_while1(|c: char| c.is_ascii_alphanumeric() || "_-:.+/".contains(c))(rest)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char(',')(rest)?;

    let mut entry = BibEntry::new(key, EntryKind::parse(tag));
    let mut remaining = rest;
    loop {
        let (rest, _) = multispace0(remaining)?;
        if rest.starts_with('}') {
            remaining = rest;
            break;
        }
        match parse_field(rest, strings) {
            Ok((rest, (name, value))) => {
                entry.add_field(name, value);
                let (rest, _) = multispace0(rest)?;
                remaining = rest.strip_prefix(',').unwrap_or(rest);
            }
            // No further fields; leave whatever is left for the closing brace
            Err(_) => {
                remaining = rest;
                break;
            }
        }
    }

    let (rest, _) = multispace0(remaining)?;
    let (rest, _) = char('}')(rest)?;
    Ok((rest, entry))
}

fn field_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

/// `name = value`
fn parse_field<'a>(
    input: &'a str,
    strings: &HashMap<String, String>,
) -> IResult<&'a str, (String, String)> {
    let (rest, name) = field_name(input)?;
    let (rest, _) = multispace0(rest)?;
    let (rest, _) = char('=')(rest)?;
    let (rest, value) = parse_value(rest, strings)?;
    Ok((rest, (name.to_string(), value)))
}

/// A field value: braced, quoted, bare number, or string reference,
/// possibly concatenated with `#`
fn parse_value<'a>(input: &'a str, strings: &HashMap<String, String>) -> IResult<&'a str, String> {
    let mut value = String::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        let (rest, part) = alt((
            braced_value,
            quoted_value,
            map(take_while1(|c: char| c.is_ascii_digit()), str::to_string),
            map(field_name, |name| {
                strings
                    .get(&name.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| name.to_string())
            }),
        ))(rest)?;
        value.push_str(&part);

        let (rest, _) = multispace0(rest)?;
        match rest.strip_prefix('#') {
            Some(after) => remaining = after,
            None => return Ok((rest, value)),
        }
    }
}

/// `{...}` with the outer braces stripped
fn braced_value(input: &str) -> IResult<&str, String> {
    let (rest, raw) = braced_raw(input)?;
    Ok((rest, raw[1..raw.len() - 1].to_string()))
}

/// Raw `{...}` span, tracking nesting and backslash escapes
fn braced_raw(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'{') {
        return Err(nom_error(input));
    }

    let mut depth = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[pos + 1..], &input[..pos + 1]));
                }
            }
            b'\\' => pos += 1,
            _ => {}
        }
        pos += 1;
    }
    Err(nom_error(input))
}

/// `"..."`, keeping embedded braces and backslash escapes verbatim
fn quoted_value(input: &str) -> IResult<&str, String> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'"') {
        return Err(nom_error(input));
    }

    let mut value = String::new();
    let mut depth = 0usize;
    let mut pos = 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' if depth == 0 => return Ok((&input[pos + 1..], value)),
            b'{' => {
                depth += 1;
                value.push('{');
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                value.push('}');
            }
            b'\\' if pos + 1 < bytes.len() => {
                value.push('\\');
                pos += 1;
                value.push(bytes[pos] as char);
            }
            c => value.push(c as char),
        }
        pos += 1;
    }
    Err(nom_error(input))
}

fn nom_error(input: &str) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char))
}
