// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by tap-reporter.

use crate::config::LoggingPolicy;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that failed to parse, or `None` for the built-in defaults.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

impl fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config_file {
            Some(config_file) => write!(f, "failed to parse tap-report config at `{config_file}`"),
            None => write!(f, "failed to parse built-in tap-report config"),
        }
    }
}

impl error::Error for ConfigParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// The kind of error that occurred while parsing the config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// Error returned while parsing a [`LoggingPolicy`] value from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "unrecognized value for logging policy: {input}\n(known values: {})",
    LoggingPolicy::variants().join(", ")
)]
pub struct LoggingPolicyParseError {
    input: String,
}

impl LoggingPolicyParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A skip narrative did not have the expected `<prefix>: <reason>` structure.
///
/// This is recovered from locally: the test is still reported as skipped, with an empty reason.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("skip narrative `{narrative}` does not contain a `:`-delimited reason")]
pub struct MalformedSkipReason {
    narrative: String,
}

impl MalformedSkipReason {
    pub(crate) fn new(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
        }
    }

    /// Returns the narrative that failed to parse.
    pub fn narrative(&self) -> &str {
        &self.narrative
    }
}

/// A marker that takes exactly one argument received a different number of arguments.
///
/// This indicates a malformed test source, and is not recoverable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "incorrect number of arguments passed to marker `{marker}` on `{test}`: \
     expected 1, received {count}"
)]
pub struct UnrecognizedMarkerArgumentCount {
    marker: String,
    test: String,
    count: usize,
}

impl UnrecognizedMarkerArgumentCount {
    pub(crate) fn new(marker: impl Into<String>, test: impl Into<String>, count: usize) -> Self {
        Self {
            marker: marker.into(),
            test: test.into(),
            count,
        }
    }

    /// Returns the description of the offending test.
    pub fn test(&self) -> &str {
        &self.test
    }

    /// Returns the number of arguments the marker received.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// An error that occurred while adapting a raw host report into an
/// [`OutcomeEvent`](crate::events::OutcomeEvent).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdaptError {
    /// A marker received the wrong number of arguments.
    #[error(transparent)]
    MarkerArgumentCount(#[from] UnrecognizedMarkerArgumentCount),
}

/// An error that occurred while forwarding results through a
/// [`ReportingSession`](crate::session::ReportingSession).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The encoder failed to write to one of its destinations.
    #[error("error writing TAP output")]
    Encoder(#[source] Box<dyn error::Error + Send + Sync>),
}
