// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [tap-report](https://crates.io/crates/tap-report): reducing the
//! per-phase outcomes reported by a test host to canonical
//! [Test Anything Protocol](https://testanything.org/) facts.
//!
//! The flow of a run is:
//!
//! 1. Raw host reports are adapted into [`OutcomeEvent`](events::OutcomeEvent)s by
//!    [`OutcomeEvent::from_report`](events::OutcomeEvent::from_report).
//! 2. A [`TestAccumulator`](accumulator::TestAccumulator) groups events until each test
//!    completes.
//! 3. [`classify_all`](classify::classify_all) turns a completed test's events into
//!    [`CanonicalFact`](classify::CanonicalFact)s, one for the test and one for each of its
//!    subtests, with diagnostics built by [`diagnostics::assemble`].
//! 4. A [`ReportingSession`](session::ReportingSession) forwards facts and the plan to a
//!    [`TapEncoder`](session::TapEncoder), and finishes the run.

pub mod accumulator;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod events;
mod host;
pub mod session;

pub use host::{STRICT_XPASS_NARRATIVE, UNEXPECTED_SUCCESS_NARRATIVE, YAML_MARKER};
