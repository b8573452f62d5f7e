// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize `TestLine`s and the surrounding protocol lines.

use crate::TestLine;
use std::{borrow::Cow, io};
use swrite::{SWrite, swrite};

static VERSION_13_LINE: &str = "TAP version 13";
static YAML_START: &str = "---";
static YAML_END: &str = "...";
static YAML_INDENT: &str = "  ";

pub(crate) fn serialize_version(mut writer: impl io::Write) -> io::Result<()> {
    writeln!(writer, "{VERSION_13_LINE}")
}

pub(crate) fn serialize_plan(count: usize, mut writer: impl io::Write) -> io::Result<()> {
    writeln!(writer, "1..{count}")
}

pub(crate) fn serialize_header(unit: &str, mut writer: impl io::Write) -> io::Result<()> {
    writeln!(writer, "# TAP results for {}", single_line(unit))
}

pub(crate) fn serialize_test_line(
    line: &TestLine,
    number: usize,
    version_13: bool,
    mut writer: impl io::Write,
) -> io::Result<()> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestLine {
        status,
        description,
        directive,
        diagnostics,
        yaml_block,
    } = line;

    write!(writer, "{status} {number}")?;
    let description = escape_description(description);
    if !description.is_empty() {
        write!(writer, " {description}")?;
    }
    if let Some(directive) = directive {
        write!(writer, " # {}", directive.kind().as_str())?;
        let reason = single_line(directive.reason());
        let reason = reason.trim();
        if !reason.is_empty() {
            write!(writer, " {reason}")?;
        }
    }
    writeln!(writer)?;

    for diagnostic in diagnostics {
        serialize_diagnostic(diagnostic, &mut writer)?;
    }

    if version_13 {
        if let Some(yaml_block) = yaml_block {
            serialize_yaml_block(yaml_block, &mut writer)?;
        }
    }

    Ok(())
}

fn serialize_diagnostic(diagnostic: &str, mut writer: impl io::Write) -> io::Result<()> {
    // A diagnostic spanning several lines must not leak unprefixed lines into the stream.
    for text in diagnostic.lines() {
        if text.starts_with('#') {
            writeln!(writer, "{text}")?;
        } else if text.is_empty() {
            writeln!(writer, "#")?;
        } else {
            writeln!(writer, "# {text}")?;
        }
    }
    if diagnostic.is_empty() {
        writeln!(writer, "#")?;
    }
    Ok(())
}

fn serialize_yaml_block(yaml_block: &str, mut writer: impl io::Write) -> io::Result<()> {
    writeln!(writer, "{YAML_INDENT}{YAML_START}")?;
    for text in yaml_block.lines() {
        if text.is_empty() {
            writeln!(writer)?;
        } else {
            writeln!(writer, "{YAML_INDENT}{text}")?;
        }
    }
    writeln!(writer, "{YAML_INDENT}{YAML_END}")
}

/// Escapes a description so that it can't be confused with a directive, and parses back to the
/// same text.
///
/// `\` and `#` are backslash-escaped, line breaks and tabs become `\n`, `\r` and `\t`, and
/// whitespace at either end is written as a `\u{..}` escape so that it survives trimming.
pub(crate) fn escape_description(description: &str) -> Cow<'_, str> {
    let needs_escape = description.contains(['\\', '#', '\n', '\r', '\t'])
        || description.starts_with(char::is_whitespace)
        || description.ends_with(char::is_whitespace);
    if !needs_escape {
        return Cow::Borrowed(description);
    }

    let core_start = description.len() - description.trim_start().len();
    let core_end = description.trim_end().len();
    let mut out = String::with_capacity(description.len() + 8);
    for (idx, c) in description.char_indices() {
        match c {
            '\\' => out.push_str("\\\\"),
            '#' => out.push_str("\\#"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_whitespace() && (idx < core_start || idx >= core_end) => {
                swrite!(out, "\\u{{{:x}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\n', '\r']) {
        let parts: Vec<_> = text.split(['\n', '\r']).filter(|s| !s.is_empty()).collect();
        Cow::Owned(parts.join(" "))
    } else {
        Cow::Borrowed(text)
    }
}
