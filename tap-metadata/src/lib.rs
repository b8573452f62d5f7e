// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable input consumed by `tap-report`, and the exit codes it documents.
//!
//! A test host writes one JSON object per line: a [`HostMessage::PhaseReport`] for every phase
//! (setup, call, teardown) of every test, and a [`HostMessage::CollectionFinished`] once the
//! number of tests to run is known.

mod exit_codes;
mod reports;

pub use exit_codes::*;
pub use reports::*;
