// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome events: one per execution phase of one test.

use bitflags::bitflags;
use tap_metadata::{ReportOutcome, ReportPhase};

/// The reason a host records for an expected failure that was given no reason.
///
/// An imperative expected failure without a message is recorded as `reason: `, which carries no
/// information and is treated as an empty reason.
pub const NO_REASON_PLACEHOLDER: &str = "reason:";

/// An outcome event for a single execution phase of a single test.
///
/// Events are produced by a test host (or adapted from its raw reports, see
/// [`OutcomeEvent::from_report`]) and consumed by [`classify`](crate::classify::classify).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutcomeEvent {
    /// The identifier of the containing module or file. Stable across the phases of a test.
    pub test_unit_id: String,

    /// The name of the test within its unit.
    pub full_name: String,

    /// The phase this event is for.
    pub phase: Phase,

    /// The result of the phase.
    pub result: PhaseResult,

    /// Present if the test was marked as an expected failure.
    pub expected_failure: Option<ExpectedFailure>,

    /// True if an unexpected success must be enforced as a failure.
    pub strict: bool,

    /// Text describing a failure, such as a stack trace or assertion detail.
    pub failure_narrative: Option<String>,

    /// The skip narrative, typically of the form `Skipped: <reason>`.
    pub skip_reason: Option<String>,

    /// Output captured during the phase.
    pub captured: CapturedOutput,

    /// Classification signals recovered from the narrative text.
    pub hints: NarrativeHints,

    /// The body of a TAP version 13 YAML block attached to the test.
    pub yaml_block: Option<String>,

    /// Present if this event is for a subtest: the label appended to the test's description,
    /// for example `[sub_msg] (i=0)`.
    pub subtest: Option<String>,
}

impl OutcomeEvent {
    /// Creates a new event with no marker, narrative, captured output or hints.
    pub fn new(
        test_unit_id: impl Into<String>,
        full_name: impl Into<String>,
        phase: Phase,
        result: PhaseResult,
    ) -> Self {
        Self {
            test_unit_id: test_unit_id.into(),
            full_name: full_name.into(),
            phase,
            result,
            expected_failure: None,
            strict: false,
            failure_narrative: None,
            skip_reason: None,
            captured: CapturedOutput::default(),
            hints: NarrativeHints::empty(),
            yaml_block: None,
            subtest: None,
        }
    }

    /// Returns the description used for this test in TAP output: `<unit>::<name>`, followed by
    /// the subtest label for a subtest.
    pub fn description(&self) -> String {
        format!(
            "{}::{}{}",
            self.test_unit_id,
            self.full_name,
            self.subtest.as_deref().unwrap_or_default()
        )
    }
}

/// The execution phase of a test.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Fixture setup, before the test body runs.
    Setup,
    /// The test body.
    Call,
    /// Fixture teardown.
    Teardown,
}

impl From<ReportPhase> for Phase {
    fn from(phase: ReportPhase) -> Self {
        match phase {
            ReportPhase::Setup => Phase::Setup,
            ReportPhase::Call => Phase::Call,
            ReportPhase::Teardown => Phase::Teardown,
        }
    }
}

/// The result of a single phase.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PhaseResult {
    /// The phase passed.
    Passed,
    /// The phase failed.
    Failed,
    /// The phase was skipped.
    Skipped,
}

impl From<ReportOutcome> for PhaseResult {
    fn from(outcome: ReportOutcome) -> Self {
        match outcome {
            ReportOutcome::Passed => PhaseResult::Passed,
            ReportOutcome::Failed => PhaseResult::Failed,
            ReportOutcome::Skipped => PhaseResult::Skipped,
        }
    }
}

/// An expected-failure marker, with its optional reason.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExpectedFailure {
    reason: Option<String>,
}

impl ExpectedFailure {
    /// Creates a new marker with the given reason.
    pub fn new(reason: Option<String>) -> Self {
        Self { reason }
    }

    /// Returns the reason as recorded by the host.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the reason formatted as a directive suffix: `": <reason>"`, or an empty string if
    /// the reason is missing, empty, or the host's placeholder for no reason.
    pub fn reason_suffix(&self) -> String {
        match self.reason.as_deref().map(str::trim) {
            None | Some("") | Some(NO_REASON_PLACEHOLDER) => String::new(),
            Some(reason) => format!(": {reason}"),
        }
    }
}

/// Output captured during a phase.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CapturedOutput {
    /// Captured log records.
    pub log: Option<String>,
    /// Captured standard output.
    pub stdout: Option<String>,
    /// Captured standard error.
    pub stderr: Option<String>,
}

impl CapturedOutput {
    /// Returns true if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.log.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}

bitflags! {
    /// Classification signals that a host only encodes in its narrative text.
    ///
    /// These are computed once, when raw host reports are adapted into [`OutcomeEvent`]s, so that
    /// classification never has to scan text.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct NarrativeHints: u8 {
        /// A failure that is really an unexpected success of an expected failure, reported by a
        /// convention that has no structured marker.
        const UNEXPECTED_SUCCESS = 1 << 0;

        /// A strict expected failure that passed.
        const STRICT_XPASS = 1 << 1;
    }
}
