// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `tap-report` command-line tool.
//!
//! This crate is not meant to be used as a library: its interface is the command line.

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::TapReportApp;
#[doc(hidden)]
pub use errors::ExpectedError;
#[doc(hidden)]
pub use output::{OutputContext, StderrStyles};
