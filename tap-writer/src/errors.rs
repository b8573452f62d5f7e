// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use thiserror::Error;

/// An error that occurs while writing TAP output to one of its destinations.
///
/// Returned by the add and report-generation methods on [`Tracker`](crate::Tracker).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    /// An error occurred while writing to the output stream.
    #[error("error writing TAP output to stream")]
    Stream(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurs while parsing a single TAP test line.
///
/// Returned by [`parse_line`](crate::parse_line).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid TAP test line `{line}`: {reason}")]
pub struct ParseLineError {
    line: String,
    reason: &'static str,
}

impl ParseLineError {
    pub(crate) fn new(line: impl Into<String>, reason: &'static str) -> Self {
        Self {
            line: line.into(),
            reason,
        }
    }

    /// Returns the line that failed to parse.
    pub fn line(&self) -> &str {
        &self.line
    }
}
