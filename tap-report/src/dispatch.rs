// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, ValueEnum};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};
use tap_metadata::{HostMessage, TapExitCode};
use tap_reporter::{
    accumulator::TestAccumulator,
    config::{ExpectedFailureMode, LoggingPolicy, TapConfig},
    events::OutcomeEvent,
    session::{ReportingSession, SessionSummary},
};
use tracing::{debug, warn};

/// Turn the results of a test run into Test Anything Protocol output.
///
/// Host reports are read as JSON lines, one message per line, from a file or from standard input.
/// Each completed test is reported as it finishes.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style(), max_term_width = 100)]
pub struct TapReportApp {
    /// File containing host reports as JSON lines [default: standard input]
    #[arg(value_name = "PATH")]
    input: Option<Utf8PathBuf>,

    /// Config file [default: built-in defaults only]
    #[arg(long, value_name = "PATH", env = "TAP_REPORT_CONFIG")]
    config_file: Option<Utf8PathBuf>,

    #[command(flatten)]
    tap_opts: TapOpts,

    #[command(flatten)]
    output: OutputOpts,
}

impl TapReportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code on success.
    pub fn exec(self, _output: OutputContext) -> Result<i32> {
        let mut config = TapConfig::from_sources(self.config_file.as_deref())?;
        self.tap_opts.apply(&mut config);

        let reader = open_input(self.input.as_deref())?;
        let summary = report(config, reader, io::stdout())?;
        debug!(
            "reported {} tests ({} failed)",
            summary.facts, summary.failures
        );

        if summary.is_success() {
            Ok(TapExitCode::OK)
        } else {
            Ok(TapExitCode::TEST_RUN_FAILED)
        }
    }
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "TAP options")]
struct TapOpts {
    /// Stream TAP output to standard output as tests complete
    #[arg(long = "tap-stream", visible_alias = "tap")]
    stream: bool,

    /// Write one TAP file per test unit
    #[arg(long = "tap-files")]
    files: bool,

    /// Write all results to a single TAP file, testresults.tap
    #[arg(long = "tap-combined")]
    combined: bool,

    /// Directory TAP files are written to [default: current directory]
    #[arg(long = "tap-outdir", value_name = "DIR")]
    outdir: Option<Utf8PathBuf>,

    /// Captured output attached as diagnostics: none, log, stdout, stderr, stdout+stderr, all
    #[arg(long = "tap-logging", value_name = "POLICY")]
    logging: Option<LoggingPolicy>,

    /// Attach captured output to passing tests as well
    #[arg(long = "tap-log-passing-tests")]
    log_passing_tests: bool,

    /// How an expected failure that did fail is reported
    #[arg(long = "tap-expected-failure", value_enum, value_name = "MODE")]
    expected_failure_mode: Option<ExpectedFailureModeOpt>,

    /// Produce TAP version 13 output
    #[arg(long = "tap-version-13")]
    version_13: bool,
}

impl TapOpts {
    /// Layers the command line on top of `config`. Flags only ever turn settings on.
    fn apply(self, config: &mut TapConfig) {
        let TapOpts {
            stream,
            files,
            combined,
            outdir,
            logging,
            log_passing_tests,
            expected_failure_mode,
            version_13,
        } = self;

        config.destinations.stream |= stream;
        config.destinations.per_file |= files;
        config.destinations.combined |= combined;
        if let Some(outdir) = outdir {
            config.outdir = Some(outdir);
        }
        if let Some(logging) = logging {
            config.logging_policy = logging;
        }
        config.log_passing_tests |= log_passing_tests;
        if let Some(mode) = expected_failure_mode {
            config.expected_failure_mode = mode.into();
        }
        config.tap_version_13 |= version_13;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ExpectedFailureModeOpt {
    /// `not ok ... # TODO expected failure`
    NotOkTodo,

    /// `ok ... # TODO expected failure`
    OkTodo,
}

impl From<ExpectedFailureModeOpt> for ExpectedFailureMode {
    fn from(opt: ExpectedFailureModeOpt) -> Self {
        match opt {
            ExpectedFailureModeOpt::NotOkTodo => ExpectedFailureMode::NotOkTodo,
            ExpectedFailureModeOpt::OkTodo => ExpectedFailureMode::OkTodo,
        }
    }
}

fn open_input(path: Option<&Utf8Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) if path.as_str() != "-" => {
            let file = File::open(path).map_err(|error| ExpectedError::InputOpenError {
                path: path.to_owned(),
                error,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

/// Reads host reports from `reader` and reports them, streaming to `stream` if enabled.
fn report(
    config: TapConfig,
    reader: impl BufRead,
    stream: impl Write + Send + 'static,
) -> Result<SessionSummary> {
    let mut session = ReportingSession::start_with_tracker(config, stream);
    let mut accumulator = TestAccumulator::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|error| ExpectedError::InputReadError { error })?;
        if line.trim().is_empty() {
            continue;
        }
        let message = HostMessage::from_json_line(&line).map_err(|error| {
            ExpectedError::HostReportParseError {
                line_number: idx + 1,
                error,
            }
        })?;

        match message {
            HostMessage::CollectionFinished(summary) => {
                session.on_plan_known(summary.count, summary.source);
                if summary.subtests {
                    session.expect_subtests();
                }
            }
            HostMessage::PhaseReport(report) => {
                let event = OutcomeEvent::from_report(&report)?;
                if let Some(events) = accumulator.push(event) {
                    session.report_test(&events)?;
                }
            }
            other => {
                warn!("ignoring unrecognized host message on line {}: {other:?}", idx + 1);
            }
        }
    }

    if accumulator.pending_len() > 0 {
        debug!(
            "{} tests never reported teardown, reporting them now",
            accumulator.pending_len()
        );
    }
    let pending: Vec<_> = accumulator.drain_pending().collect();
    for events in pending {
        session.report_test(&events)?;
    }

    Ok(session.finish()?)
}
