// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reporting session: the run-scoped owner of the TAP encoder.
//!
//! A session is an explicit value created at the start of a run and consumed at the end of it.
//! All of its operations take `&mut self`; callers that report from several threads serialize
//! them through a single coordinating task or a `Mutex`.

use crate::{
    classify::{CanonicalFact, ClassifyOptions, classify_all},
    config::TapConfig,
    errors::SessionError,
    events::OutcomeEvent,
};
use debug_ignore::DebugIgnore;
use std::{error, io::Write};
use tap_metadata::CountSource;
use tap_writer::{Directive, LineExtras, TestStatus, Tracker, TrackerBuilder, WriteError};
use tracing::{debug, warn};

/// The contract a TAP encoder fulfils for a [`ReportingSession`].
///
/// The encoder owns numbering, escaping and the fan-out to destinations. The session never
/// writes TAP text itself.
pub trait TapEncoder {
    /// The error returned when a destination can't be written to.
    type Error: error::Error + Send + Sync + 'static;

    /// Records the number of tests expected in the run.
    fn set_plan(&mut self, count: usize) -> Result<(), Self::Error>;

    /// Adds an `ok` line.
    fn add_ok(
        &mut self,
        unit: &str,
        description: &str,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), Self::Error>;

    /// Adds a `not ok` line.
    fn add_not_ok(
        &mut self,
        unit: &str,
        description: &str,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), Self::Error>;

    /// Adds an `ok` line with a `SKIP` directive.
    fn add_skip(&mut self, unit: &str, description: &str, reason: &str) -> Result<(), Self::Error>;

    /// Finishes the run, writing out every destination.
    fn generate_reports(&mut self) -> Result<(), Self::Error>;
}

impl TapEncoder for Tracker {
    type Error = WriteError;

    fn set_plan(&mut self, count: usize) -> Result<(), Self::Error> {
        Tracker::set_plan(self, count)
    }

    fn add_ok(
        &mut self,
        unit: &str,
        description: &str,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), Self::Error> {
        Tracker::add_ok(self, unit, description, directive, extras)
    }

    fn add_not_ok(
        &mut self,
        unit: &str,
        description: &str,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), Self::Error> {
        Tracker::add_not_ok(self, unit, description, directive, extras)
    }

    fn add_skip(
        &mut self,
        unit: &str,
        description: &str,
        reason: &str,
    ) -> Result<(), Self::Error> {
        Tracker::add_skip(self, unit, description, reason)
    }

    fn generate_reports(&mut self) -> Result<(), Self::Error> {
        Tracker::generate_reports(self)
    }
}

/// Returns a [`TrackerBuilder`] set up for the file destinations in `config`.
pub fn tracker_builder(config: &TapConfig) -> TrackerBuilder {
    let mut builder = TrackerBuilder::new();
    builder
        .set_per_file(config.destinations.per_file)
        .set_combined(config.destinations.combined)
        .set_version_13(config.tap_version_13);
    if let Some(outdir) = &config.outdir {
        builder.set_outdir(outdir);
    }
    builder
}

/// Counts of what a session reported.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionSummary {
    /// The number of facts reported.
    pub facts: usize,

    /// The number of facts that were `not ok` without a directive.
    pub failures: usize,

    /// The plan that was forwarded to the encoder, if any.
    pub plan: Option<usize>,
}

impl SessionSummary {
    /// Returns true if no test failed.
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum PlanState {
    Unknown,
    Pending { count: usize, source: CountSource },
    Forwarded { count: usize },
    // The encoder closes each destination with the number of lines it wrote.
    Trailing,
}

/// A single TAP reporting run.
///
/// If no destination is configured, the session is inert: facts are still counted, but the
/// encoder is never built and nothing is written.
#[derive(Debug)]
pub struct ReportingSession<E> {
    config: TapConfig,
    options: ClassifyOptions,
    encoder: Option<DebugIgnore<E>>,
    plan: PlanState,
    summary: SessionSummary,
}

impl ReportingSession<Tracker> {
    /// Starts a session backed by a [`Tracker`], streaming to `stream` if the stream destination
    /// is enabled.
    pub fn start_with_tracker(config: TapConfig, stream: impl Write + Send + 'static) -> Self {
        Self::start(config, |config| {
            let builder = tracker_builder(config);
            if config.destinations.stream {
                builder.build_streaming(stream)
            } else {
                builder.build()
            }
        })
    }
}

impl<E: TapEncoder> ReportingSession<E> {
    /// Starts a session. `build_encoder` is only called if at least one destination is enabled.
    pub fn start(config: TapConfig, build_encoder: impl FnOnce(&TapConfig) -> E) -> Self {
        let encoder = if config.destinations.is_empty() {
            debug!("no TAP destinations enabled: reporting is a pass-through");
            None
        } else {
            Some(DebugIgnore(build_encoder(&config)))
        };
        let options = ClassifyOptions::from(&config);
        Self {
            config,
            options,
            encoder,
            plan: PlanState::Unknown,
            summary: SessionSummary::default(),
        }
    }

    /// Returns true if this session writes output.
    pub fn is_active(&self) -> bool {
        self.encoder.is_some()
    }

    /// Returns the config for this session.
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Returns what has been reported so far.
    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Records the number of tests in the run.
    ///
    /// The plan is forwarded to the encoder right before the first fact, or when the session
    /// finishes. Until then a count from the coordinator supersedes a local count. Once the
    /// plan has been forwarded, a differing count is ignored. A count that arrives after the
    /// first fact is ignored too: the encoder then closes the run with the number of facts
    /// reported.
    pub fn on_plan_known(&mut self, count: usize, source: CountSource) {
        if !self.is_active() {
            return;
        }
        if !self.config.destinations.needs_plan() {
            debug!("ignoring plan of {count}: no stream or combined destination");
            return;
        }

        match self.plan {
            PlanState::Unknown => {
                self.plan = PlanState::Pending { count, source };
            }
            PlanState::Pending {
                count: existing,
                source: CountSource::Coordinator,
            } if source == CountSource::Local => {
                debug!(
                    "ignoring local test count {count}: \
                     coordinator count {existing} takes precedence"
                );
            }
            PlanState::Pending { .. } => {
                self.plan = PlanState::Pending { count, source };
            }
            PlanState::Forwarded { count: forwarded } => {
                if forwarded != count {
                    warn!(
                        "test count changed from {forwarded} to {count} after the plan \
                         was written, ignoring"
                    );
                }
            }
            PlanState::Trailing => {
                debug!("ignoring test count {count}: the plan counts the results reported");
            }
        }
    }

    /// Records that tests may report subtests.
    ///
    /// Each subtest is reported as its own fact, so the collected test count no longer matches
    /// the number of facts. The plan is then written last, counting the facts reported.
    pub fn expect_subtests(&mut self) {
        if !self.is_active() || !self.config.destinations.needs_plan() {
            return;
        }
        match self.plan {
            PlanState::Unknown | PlanState::Pending { .. } => {
                debug!("subtests expected: the plan will count the results reported");
                self.plan = PlanState::Trailing;
            }
            PlanState::Forwarded { count } => {
                warn!("subtests announced after the plan of {count} was written, ignoring");
            }
            PlanState::Trailing => {}
        }
    }

    /// Classifies a completed test's events and reports the resulting facts: one for the test,
    /// and one for each of its subtests.
    ///
    /// Returns the facts, which are empty if the events produced no trackable result.
    pub fn report_test(
        &mut self,
        events: &[OutcomeEvent],
    ) -> Result<Vec<CanonicalFact>, SessionError> {
        let facts = classify_all(events, &self.options);
        if facts.is_empty() {
            debug!("no trackable result for {} events", events.len());
        }
        for fact in &facts {
            self.on_fact(fact.clone())?;
        }
        Ok(facts)
    }

    /// Forwards a fact to the encoder.
    pub fn on_fact(&mut self, fact: CanonicalFact) -> Result<(), SessionError> {
        self.summary.facts += 1;
        if fact.is_failure() {
            self.summary.failures += 1;
        }
        if !self.is_active() {
            return Ok(());
        }

        self.forward_plan()?;
        if let PlanState::Forwarded { count } = self.plan {
            if self.summary.facts == count + 1 {
                warn!(
                    "more results reported than the plan of {count}: \
                     hosts that report subtests must announce them"
                );
            }
        }
        let Some(encoder) = &mut self.encoder else {
            return Ok(());
        };

        // Use the destructuring syntax to ensure that all fields are handled.
        let CanonicalFact {
            test_unit_id,
            description,
            status,
            directive,
            diagnostics,
            yaml_block,
        } = fact;
        let extras = LineExtras {
            diagnostics,
            yaml_block,
        };

        let result = match (status, directive) {
            (TestStatus::Ok, Some(Directive::Skip(reason))) if extras == LineExtras::default() => {
                encoder.add_skip(&test_unit_id, &description, &reason)
            }
            (TestStatus::Ok, directive) => {
                encoder.add_ok(&test_unit_id, &description, directive, extras)
            }
            (TestStatus::NotOk, directive) => {
                encoder.add_not_ok(&test_unit_id, &description, directive, extras)
            }
        };
        result.map_err(encoder_error)
    }

    /// Finishes the run: forwards a pending plan, then generates reports.
    ///
    /// Consuming the session guarantees reports are generated exactly once.
    pub fn finish(mut self) -> Result<SessionSummary, SessionError> {
        self.finish_impl()?;
        Ok(self.summary)
    }

    fn finish_impl(&mut self) -> Result<(), SessionError> {
        self.forward_plan()?;
        let Some(encoder) = &mut self.encoder else {
            return Ok(());
        };
        encoder.generate_reports().map_err(encoder_error)?;
        if self.plan == PlanState::Trailing && self.config.destinations.needs_plan() {
            self.summary.plan = Some(self.summary.facts);
        }
        Ok(())
    }

    fn forward_plan(&mut self) -> Result<(), SessionError> {
        let Some(encoder) = &mut self.encoder else {
            return Ok(());
        };
        match self.plan {
            PlanState::Pending { count, .. } => {
                encoder.set_plan(count).map_err(encoder_error)?;
                self.plan = PlanState::Forwarded { count };
                self.summary.plan = Some(count);
            }
            PlanState::Unknown => {
                // Nothing to forward: from here on the plan counts the results reported.
                self.plan = PlanState::Trailing;
            }
            PlanState::Forwarded { .. } | PlanState::Trailing => {}
        }
        Ok(())
    }
}

fn encoder_error(error: impl error::Error + Send + Sync + 'static) -> SessionError {
    SessionError::Encoder(Box::new(error))
}
