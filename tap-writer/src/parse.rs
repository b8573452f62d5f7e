// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse TAP test lines produced by the serializer.

use crate::{Directive, ParseLineError, TestStatus};

/// A TAP test line, parsed back into its parts.
///
/// Returned by [`parse_line`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedLine {
    /// Whether the line is `ok` or `not ok`.
    pub status: TestStatus,

    /// The ordinal number, if present.
    pub number: Option<usize>,

    /// The unescaped description.
    pub description: String,

    /// The directive, if the line carries a `SKIP` or `TODO` directive.
    pub directive: Option<Directive>,
}

/// Parses a single TAP test line such as `not ok 2 mod.py::test_x # TODO reason`.
///
/// Descriptions are unescaped, so a line rendered by [`TestLine`](crate::TestLine) parses back to
/// the same description. A comment after an unescaped `#` that is not a `SKIP` or `TODO`
/// directive is ignored.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseLineError> {
    let line = line.trim_end_matches(['\n', '\r']);

    let (status, rest) = if let Some(rest) = line.strip_prefix("not ok") {
        (TestStatus::NotOk, rest)
    } else if let Some(rest) = line.strip_prefix("ok") {
        (TestStatus::Ok, rest)
    } else {
        return Err(ParseLineError::new(
            line,
            "test lines must start with `ok` or `not ok`",
        ));
    };
    if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return Err(ParseLineError::new(
            line,
            "`ok` or `not ok` must be followed by whitespace",
        ));
    }
    let rest = rest.trim_start();

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (number, rest) = if digits_end > 0
        && (digits_end == rest.len() || rest[digits_end..].starts_with([' ', '\t']))
    {
        let number = rest[..digits_end]
            .parse::<usize>()
            .map_err(|_| ParseLineError::new(line, "test number out of range"))?;
        (Some(number), rest[digits_end..].trim_start())
    } else {
        (None, rest)
    };

    let (raw_description, comment) = split_at_unescaped_hash(rest);
    let description = unescape_description(raw_description.trim_end());
    let directive = comment.and_then(parse_directive);

    Ok(ParsedLine {
        status,
        number,
        description,
        directive,
    })
}

fn split_at_unescaped_hash(text: &str) -> (&str, Option<&str>) {
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '#' => return (&text[..idx], Some(&text[idx + 1..])),
            _ => {}
        }
    }
    (text, None)
}

fn unescape_description(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '#')) => out.push(next),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => match parse_unicode_escape(chars.as_str()) {
                Some((decoded, len)) => {
                    out.push(decoded);
                    chars = chars.as_str()[len..].chars();
                }
                None => out.push_str("\\u"),
            },
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parses the `{hex}` part of a `\u{hex}` escape, returning the character and the length consumed.
fn parse_unicode_escape(text: &str) -> Option<(char, usize)> {
    let body = text.strip_prefix('{')?;
    let end = body.find('}')?;
    let decoded = u32::from_str_radix(&body[..end], 16)
        .ok()
        .and_then(char::from_u32)?;
    Some((decoded, end + 2))
}

fn parse_directive(comment: &str) -> Option<Directive> {
    let comment = comment.trim();
    let keyword_end = comment
        .find(|c: char| c.is_whitespace())
        .unwrap_or(comment.len());
    let (keyword, reason) = comment.split_at(keyword_end);
    let reason = reason.trim();

    if keyword.eq_ignore_ascii_case("SKIP") {
        Some(Directive::skip(reason))
    } else if keyword.eq_ignore_ascii_case("TODO") {
        Some(Directive::todo(reason))
    } else {
        None
    }
}
