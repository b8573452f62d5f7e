// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Generate and read [Test Anything Protocol](https://testanything.org/) output in Rust.
//!
//! The main type here is [`Tracker`], which accepts test results one at a time, assigns ordinal
//! numbers, and fans them out to the configured destinations: a live stream, one file per test
//! unit, or a single combined file.

mod errors;
mod parse;
mod report;
mod serialize;
mod tracker;

pub use errors::*;
pub use parse::*;
pub use report::*;
pub use tracker::*;
