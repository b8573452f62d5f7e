// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use tap_metadata::TapExitCode;
use tap_reporter::errors::{AdaptError, ConfigParseError, SessionError};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders: errors are expected to be printed with
// display_to_stderr, which colorizes them.

/// An error that tap-report knows how to report and map to an exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to open input")]
    InputOpenError {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to read input")]
    InputReadError {
        #[source]
        error: std::io::Error,
    },
    #[error("failed to parse host report")]
    HostReportParseError {
        line_number: usize,
        #[source]
        error: serde_json::Error,
    },
    #[error("invalid test marker")]
    MarkerError {
        #[from]
        err: AdaptError,
    },
    #[error("failed to write TAP output")]
    WriteOutputError {
        #[from]
        err: SessionError,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. } | Self::InputOpenError { .. } => {
                TapExitCode::SETUP_ERROR
            }
            Self::InputReadError { .. } | Self::HostReportParseError { .. } => {
                TapExitCode::HOST_REPORT_ERROR
            }
            Self::MarkerError { .. } => TapExitCode::MARKER_ERROR,
            Self::WriteOutputError { .. } => TapExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParseError { err } => {
                // The error already names the file.
                error!("{err}");
                err.source()
            }
            Self::InputOpenError { path, error } => {
                error!("failed to open input file `{}`", path.style(styles.bold));
                Some(error as &dyn Error)
            }
            Self::InputReadError { error } => {
                error!("failed to read host reports");
                Some(error as &dyn Error)
            }
            Self::HostReportParseError { line_number, error } => {
                error!(
                    "failed to parse host report on line {}",
                    line_number.style(styles.bold)
                );
                Some(error as &dyn Error)
            }
            Self::MarkerError { err } => {
                error!("{err}");
                None
            }
            Self::WriteOutputError { err } => {
                error!("{err}");
                err.source()
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {err}");
            next_error = err.source();
        }
    }
}
