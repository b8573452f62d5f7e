// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembling diagnostic lines from failure narratives and captured output.
//!
//! Diagnostics are plain lines in TAP comment form: `# text`, or a lone `#` for an empty line.
//! Captured output is attached in a fixed order (log, then standard output, then standard error),
//! each block introduced by a separator line.

use crate::{config::LoggingPolicy, events::CapturedOutput};
use swrite::{SWrite, swrite};

/// The separator line introducing captured log records.
pub static LOG_SEPARATOR: &str = "# --- Captured Log ---";

/// The separator line introducing captured standard output.
pub static STDOUT_SEPARATOR: &str = "# --- Captured Stdout ---";

/// The separator line introducing captured standard error.
pub static STDERR_SEPARATOR: &str = "# --- Captured Stderr ---";

/// Formats a single line of text as a diagnostic line.
pub fn diagnostic_line(text: &str) -> String {
    let mut line = String::from("#");
    if !text.is_empty() {
        swrite!(line, " {text}");
    }
    line
}

/// Formats multi-line text as diagnostic lines, one per input line.
///
/// Empty text produces no lines.
pub fn format_as_diagnostics(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines().map(diagnostic_line)
}

/// Returns the narrative's lines followed by the captured blocks selected by `policy`.
pub fn assemble(narrative: &str, captured: &CapturedOutput, policy: LoggingPolicy) -> Vec<String> {
    let mut lines: Vec<_> = format_as_diagnostics(narrative).collect();
    lines.extend(assemble_captured(captured, policy));
    lines
}

/// Returns just the captured blocks selected by `policy`, each introduced by its separator.
///
/// A block is only included if that output was captured. Captured output that is present but
/// empty produces the separator followed by a lone `#`.
pub fn assemble_captured(captured: &CapturedOutput, policy: LoggingPolicy) -> Vec<String> {
    let blocks = [
        (policy.includes_log(), LOG_SEPARATOR, captured.log.as_deref()),
        (
            policy.includes_stdout(),
            STDOUT_SEPARATOR,
            captured.stdout.as_deref(),
        ),
        (
            policy.includes_stderr(),
            STDERR_SEPARATOR,
            captured.stderr.as_deref(),
        ),
    ];

    let mut lines = Vec::new();
    for (included, separator, text) in blocks {
        let Some(text) = text.filter(|_| included) else {
            continue;
        };
        lines.push(separator.to_owned());
        let start = lines.len();
        lines.extend(format_as_diagnostics(text));
        if lines.len() == start {
            lines.push(diagnostic_line(""));
        }
    }
    lines
}
