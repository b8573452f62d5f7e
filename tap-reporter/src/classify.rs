// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifying the phase events of a test into a single canonical TAP fact.
//!
//! A test produces an [`OutcomeEvent`] per phase, plus one call-phase event for each of its
//! subtests. A failed or skipped setup phase decides how the whole test is reported. Otherwise
//! every call-phase event is reported as its own fact, so that a failing subtest is never hidden
//! behind a passing test. A teardown phase never produces a fact of its own.

use crate::{
    config::{ExpectedFailureMode, LoggingPolicy, TapConfig},
    diagnostics::{assemble, assemble_captured, diagnostic_line},
    errors::MalformedSkipReason,
    events::{NarrativeHints, OutcomeEvent, Phase, PhaseResult},
};
use tap_writer::{Directive, LineExtras, TestLine, TestStatus};
use tracing::{debug, warn};

/// The directive reason prefix for an expected failure that did fail.
pub static EXPECTED_FAILURE: &str = "expected failure";

/// The directive reason prefix for an expected failure that passed.
pub static UNEXPECTED_SUCCESS: &str = "unexpected success";

/// The diagnostic written for a failure that carried no narrative or selected captured output.
pub static NO_FAILURE_DETAILS: &str = "(no failure details were reported)";

/// The canonical result of one test, ready to be written out as a TAP line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CanonicalFact {
    /// The test unit the test belongs to.
    pub test_unit_id: String,

    /// The description of the test: `<unit>::<name>`.
    pub description: String,

    /// Whether the test is reported as `ok` or `not ok`.
    pub status: TestStatus,

    /// An optional `SKIP` or `TODO` directive.
    pub directive: Option<Directive>,

    /// Diagnostic lines, in `# text` form.
    ///
    /// Always non-empty for a `not ok` fact without a directive.
    pub diagnostics: Vec<String>,

    /// An optional YAML block body.
    pub yaml_block: Option<String>,
}

impl CanonicalFact {
    fn new(event: &OutcomeEvent, status: TestStatus, directive: Option<Directive>) -> Self {
        Self {
            test_unit_id: event.test_unit_id.clone(),
            description: event.description(),
            status,
            directive,
            diagnostics: Vec::new(),
            yaml_block: event.yaml_block.clone(),
        }
    }

    fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Returns true if this fact counts as a failure of the run: `not ok` without a directive.
    pub fn is_failure(&self) -> bool {
        self.status == TestStatus::NotOk && self.directive.is_none()
    }

    /// Splits off the diagnostics and YAML block, in the form the encoder accepts.
    pub fn extras(&self) -> LineExtras {
        LineExtras {
            diagnostics: self.diagnostics.clone(),
            yaml_block: self.yaml_block.clone(),
        }
    }

    /// Converts this fact into an unnumbered TAP line.
    pub fn to_test_line(&self) -> TestLine {
        let mut line = TestLine::new(self.status, self.description.clone());
        line.set_directive(self.directive.clone())
            .add_diagnostics(self.diagnostics.iter().cloned());
        if let Some(yaml_block) = &self.yaml_block {
            line.set_yaml_block(yaml_block.clone());
        }
        line
    }
}

/// Options that affect how facts are classified.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ClassifyOptions {
    /// Which captured output is attached as diagnostics.
    pub logging_policy: LoggingPolicy,

    /// Attach captured output to passing tests as well.
    pub log_passing_tests: bool,

    /// How an expected failure that did fail is reported.
    pub expected_failure_mode: ExpectedFailureMode,
}

impl From<&TapConfig> for ClassifyOptions {
    fn from(config: &TapConfig) -> Self {
        Self {
            logging_policy: config.logging_policy,
            log_passing_tests: config.log_passing_tests,
            expected_failure_mode: config.expected_failure_mode,
        }
    }
}

/// The phase event that decides how a test is reported.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApplicableOutcome<'a> {
    /// Setup failed, so the test body never ran.
    SetupFailure(&'a OutcomeEvent),

    /// Setup skipped the test.
    SetupSkip(&'a OutcomeEvent),

    /// The test body passed.
    CallPassed(&'a OutcomeEvent),

    /// The test body failed.
    CallFailed(&'a OutcomeEvent),

    /// The test body skipped itself.
    CallSkipped(&'a OutcomeEvent),
}

impl<'a> ApplicableOutcome<'a> {
    /// Selects the outcome of the test itself among a test's phase events.
    ///
    /// Subtest events are not considered, unless the test reported nothing else from its call
    /// phase. Returns `None` if no event decides the outcome, for example a lone teardown event or
    /// a passing setup event whose call event hasn't been seen.
    pub fn select(events: &'a [OutcomeEvent]) -> Option<Self> {
        Self::setup_outcome(events).or_else(|| {
            let mut calls = events.iter().filter(|event| event.phase == Phase::Call);
            let call = calls
                .clone()
                .find(|event| event.subtest.is_none())
                .or_else(|| calls.next())?;
            Some(Self::from_call(call))
        })
    }

    /// Selects every outcome to report among a test's phase events.
    ///
    /// A failed or skipped setup phase is the only outcome. Otherwise there is one outcome per
    /// call-phase event, in the order they were reported.
    pub fn select_all(events: &'a [OutcomeEvent]) -> Vec<Self> {
        match Self::setup_outcome(events) {
            Some(setup) => vec![setup],
            None => events
                .iter()
                .filter(|event| event.phase == Phase::Call)
                .map(Self::from_call)
                .collect(),
        }
    }

    fn setup_outcome(events: &'a [OutcomeEvent]) -> Option<Self> {
        events.iter().find_map(|event| match (event.phase, event.result) {
            (Phase::Setup, PhaseResult::Failed) => Some(Self::SetupFailure(event)),
            (Phase::Setup, PhaseResult::Skipped) => Some(Self::SetupSkip(event)),
            _ => None,
        })
    }

    fn from_call(call: &'a OutcomeEvent) -> Self {
        match call.result {
            PhaseResult::Passed => Self::CallPassed(call),
            PhaseResult::Failed => Self::CallFailed(call),
            PhaseResult::Skipped => Self::CallSkipped(call),
        }
    }

    /// Returns the event this outcome was selected from.
    pub fn event(&self) -> &'a OutcomeEvent {
        match *self {
            Self::SetupFailure(event)
            | Self::SetupSkip(event)
            | Self::CallPassed(event)
            | Self::CallFailed(event)
            | Self::CallSkipped(event) => event,
        }
    }
}

/// Classifies the phase events of one test into the canonical fact for the test itself.
///
/// Returns `None` if the events don't include an applicable outcome.
pub fn classify(events: &[OutcomeEvent], options: &ClassifyOptions) -> Option<CanonicalFact> {
    ApplicableOutcome::select(events).map(|outcome| classify_outcome(outcome, options))
}

/// Classifies the phase events of one test into a fact for the test and one for each subtest.
///
/// Returns an empty list if the events don't include an applicable outcome.
pub fn classify_all(events: &[OutcomeEvent], options: &ClassifyOptions) -> Vec<CanonicalFact> {
    ApplicableOutcome::select_all(events)
        .into_iter()
        .map(|outcome| classify_outcome(outcome, options))
        .collect()
}

/// Classifies a single applicable outcome.
pub fn classify_outcome(
    outcome: ApplicableOutcome<'_>,
    options: &ClassifyOptions,
) -> CanonicalFact {
    let event = outcome.event();
    let policy = options.logging_policy;

    match (outcome, &event.expected_failure) {
        (ApplicableOutcome::SetupSkip(_) | ApplicableOutcome::CallSkipped(_), Some(marker)) => {
            // The expected failure occurred.
            let status = match options.expected_failure_mode {
                ExpectedFailureMode::NotOkTodo => TestStatus::NotOk,
                ExpectedFailureMode::OkTodo => TestStatus::Ok,
            };
            let directive = Directive::todo(format!("{EXPECTED_FAILURE}{}", marker.reason_suffix()));
            let narrative = event.failure_narrative.as_deref().unwrap_or_default();
            CanonicalFact::new(event, status, Some(directive))
                .with_diagnostics(assemble(narrative, &event.captured, policy))
        }
        (ApplicableOutcome::CallPassed(_), Some(marker)) => {
            // Hosts report a strict unexpected success as a failure, so this is never strict.
            let directive =
                Directive::todo(format!("{UNEXPECTED_SUCCESS}{}", marker.reason_suffix()));
            CanonicalFact::new(event, TestStatus::Ok, Some(directive))
                .with_diagnostics(passing_diagnostics(event, options))
        }
        (ApplicableOutcome::CallPassed(_), None) => {
            CanonicalFact::new(event, TestStatus::Ok, None)
                .with_diagnostics(passing_diagnostics(event, options))
        }
        (ApplicableOutcome::SetupFailure(_) | ApplicableOutcome::CallFailed(_), _) => {
            classify_failure(event, policy)
        }
        (ApplicableOutcome::SetupSkip(_) | ApplicableOutcome::CallSkipped(_), None) => {
            let reason = match event.skip_reason.as_deref() {
                Some(narrative) => skip_reason(narrative).unwrap_or_else(|error| {
                    warn!("{error}: reporting `{}` with an empty skip reason", event.description());
                    String::new()
                }),
                None => {
                    debug!("no skip narrative for `{}`", event.description());
                    String::new()
                }
            };
            CanonicalFact::new(event, TestStatus::Ok, Some(Directive::skip(reason)))
        }
    }
}

fn classify_failure(event: &OutcomeEvent, policy: LoggingPolicy) -> CanonicalFact {
    let narrative = event.failure_narrative.as_deref().unwrap_or_default();

    if event.hints.contains(NarrativeHints::UNEXPECTED_SUCCESS) {
        return CanonicalFact::new(
            event,
            TestStatus::Ok,
            Some(Directive::todo(UNEXPECTED_SUCCESS)),
        );
    }

    let mut diagnostics = assemble(narrative, &event.captured, policy);
    if event.hints.contains(NarrativeHints::STRICT_XPASS) {
        let directive = Directive::todo(format!("{UNEXPECTED_SUCCESS}: {}", narrative.trim()));
        return CanonicalFact::new(event, TestStatus::NotOk, Some(directive))
            .with_diagnostics(diagnostics);
    }

    if diagnostics.is_empty() {
        diagnostics.push(diagnostic_line(NO_FAILURE_DETAILS));
    }
    CanonicalFact::new(event, TestStatus::NotOk, None).with_diagnostics(diagnostics)
}

fn passing_diagnostics(event: &OutcomeEvent, options: &ClassifyOptions) -> Vec<String> {
    if options.log_passing_tests {
        assemble_captured(&event.captured, options.logging_policy)
    } else {
        Vec::new()
    }
}

/// Extracts the reason from a skip narrative of the form `<prefix>: <reason>`.
///
/// The reason is everything after the first `:`, trimmed.
pub fn skip_reason(narrative: &str) -> Result<String, MalformedSkipReason> {
    match narrative.split_once(':') {
        Some((_, reason)) => Ok(reason.trim().to_owned()),
        None => Err(MalformedSkipReason::new(narrative)),
    }
}
