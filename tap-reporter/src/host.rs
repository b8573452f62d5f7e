// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapting raw host reports into [`OutcomeEvent`]s.
//!
//! Some classification signals are only available as text conventions in the host's narrative.
//! They are recognized here, once, and recorded as [`NarrativeHints`].

use crate::{
    errors::{AdaptError, UnrecognizedMarkerArgumentCount},
    events::{CapturedOutput, ExpectedFailure, NarrativeHints, OutcomeEvent},
};
use tap_metadata::{LongRepr, PhaseReport, ReportOutcome, SubtestContext};

/// The narrative a host reports for an unexpected success without a structured marker.
pub static UNEXPECTED_SUCCESS_NARRATIVE: &str = "Unexpected success";

/// The narrative prefix a host reports for a strict expected failure that passed.
pub static STRICT_XPASS_NARRATIVE: &str = "[XPASS(strict)]";

/// The marker that attaches a YAML block to a test. It takes exactly one argument: the body.
pub static YAML_MARKER: &str = "TESTIDS";

static CAPTURED_LOG_PREFIX: &str = "Captured log";
static CAPTURED_STDOUT_PREFIX: &str = "Captured stdout";
static CAPTURED_STDERR_PREFIX: &str = "Captured stderr";

/// The label of a subtest that was given neither a message nor parameters.
static ANONYMOUS_SUBTEST_LABEL: &str = "(<subtest>)";

impl OutcomeEvent {
    /// Adapts a raw host report into an event.
    ///
    /// Fails if a marker that takes exactly one argument received some other number of
    /// arguments.
    pub fn from_report(report: &PhaseReport) -> Result<Self, AdaptError> {
        let location = &report.location;
        let mut event = OutcomeEvent::new(
            &location.path,
            &location.name,
            report.when.into(),
            report.outcome.into(),
        );

        event.expected_failure = report
            .wasxfail
            .as_ref()
            .map(|reason| ExpectedFailure::new(Some(reason.clone())));

        // The text of an expected failure that occurred is the failure, not a skip narrative.
        let is_plain_skip = report.outcome == ReportOutcome::Skipped && report.wasxfail.is_none();
        match (&report.longrepr, is_plain_skip) {
            (Some(LongRepr::Location(_, _, message)), true) => {
                event.skip_reason = Some(message.clone());
            }
            (Some(LongRepr::Text(text)), true) => {
                event.skip_reason = Some(text.clone());
            }
            (Some(LongRepr::Location(path, line, message)), _) => {
                event.failure_narrative = Some(match line {
                    Some(line) => format!("{path}:{line}: {message}"),
                    None => format!("{path}: {message}"),
                });
            }
            (Some(LongRepr::Text(text)), _) => {
                event.failure_narrative = Some(text.clone());
            }
            (None, _) => {}
        }

        if report.outcome == ReportOutcome::Failed {
            event.hints = narrative_hints(event.failure_narrative.as_deref().unwrap_or_default());
        }
        event.strict = report.xfail_strict || event.hints.contains(NarrativeHints::STRICT_XPASS);
        event.captured = captured_output(report);
        event.subtest = report.subtest.as_ref().map(subtest_label);
        event.yaml_block = yaml_block(report, &event)?;

        Ok(event)
    }
}

fn narrative_hints(narrative: &str) -> NarrativeHints {
    let mut hints = NarrativeHints::empty();
    if narrative.contains(UNEXPECTED_SUCCESS_NARRATIVE) {
        hints |= NarrativeHints::UNEXPECTED_SUCCESS;
    }
    if narrative.contains(STRICT_XPASS_NARRATIVE) {
        hints |= NarrativeHints::STRICT_XPASS;
    }
    hints
}

/// Renders a subtest as `[msg] (key=value, ...)`, with parameters in key order.
fn subtest_label(context: &SubtestContext) -> String {
    let mut parts = Vec::new();
    if let Some(msg) = &context.msg {
        parts.push(format!("[{msg}]"));
    }
    if !context.params.is_empty() {
        let params: Vec<_> = context
            .params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        parts.push(format!("({})", params.join(", ")));
    }
    if parts.is_empty() {
        ANONYMOUS_SUBTEST_LABEL.to_owned()
    } else {
        parts.join(" ")
    }
}

fn captured_output(report: &PhaseReport) -> CapturedOutput {
    let mut captured = CapturedOutput::default();
    for section in &report.sections {
        let title = section.title();
        let slot = if title.starts_with(CAPTURED_LOG_PREFIX) {
            &mut captured.log
        } else if title.starts_with(CAPTURED_STDOUT_PREFIX) {
            &mut captured.stdout
        } else if title.starts_with(CAPTURED_STDERR_PREFIX) {
            &mut captured.stderr
        } else {
            continue;
        };
        // Sections for the same stream from different phases are joined in order.
        let text = slot.get_or_insert_with(String::new);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(section.text());
    }
    captured
}

fn yaml_block(report: &PhaseReport, event: &OutcomeEvent) -> Result<Option<String>, AdaptError> {
    let Some(marker) = report.markers.iter().find(|marker| marker.name == YAML_MARKER) else {
        return Ok(None);
    };
    match marker.args.as_slice() {
        [body] => Ok(Some(body.trim_matches('\n').to_owned())),
        args => Err(UnrecognizedMarkerArgumentCount::new(
            YAML_MARKER,
            event.description(),
            args.len(),
        )
        .into()),
    }
}
