// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for a TAP reporting run.
//!
//! Configuration is layered: the built-in defaults, then an optional user config file, then
//! command-line overrides applied by the caller.

use crate::errors::{ConfigParseError, ConfigParseErrorKind, LoggingPolicyParseError};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, fmt, str::FromStr};
use tracing::warn;

/// Which captured output streams are attached to a test as diagnostics.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingPolicy {
    /// Attach nothing.
    #[default]
    None,

    /// Attach captured log records.
    Log,

    /// Attach captured standard output.
    Stdout,

    /// Attach captured standard error.
    Stderr,

    /// Attach captured standard output and standard error.
    #[serde(rename = "stdout+stderr")]
    StdoutAndStderr,

    /// Attach everything that was captured.
    All,
}

impl LoggingPolicy {
    /// Returns string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["none", "log", "stdout", "stderr", "stdout+stderr", "all"]
    }

    /// Returns the string representation of this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Log => "log",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::StdoutAndStderr => "stdout+stderr",
            Self::All => "all",
        }
    }

    /// Returns true if captured log records are attached.
    pub fn includes_log(self) -> bool {
        matches!(self, Self::Log | Self::All)
    }

    /// Returns true if captured standard output is attached.
    pub fn includes_stdout(self) -> bool {
        matches!(self, Self::Stdout | Self::StdoutAndStderr | Self::All)
    }

    /// Returns true if captured standard error is attached.
    pub fn includes_stderr(self) -> bool {
        matches!(self, Self::Stderr | Self::StdoutAndStderr | Self::All)
    }
}

impl FromStr for LoggingPolicy {
    type Err = LoggingPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let policy = match s {
            "none" => Self::None,
            "log" => Self::Log,
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            "stdout+stderr" => Self::StdoutAndStderr,
            "all" => Self::All,
            other => return Err(LoggingPolicyParseError::new(other)),
        };
        Ok(policy)
    }
}

impl fmt::Display for LoggingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an expected failure that did fail is reported.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpectedFailureMode {
    /// `not ok ... # TODO expected failure`.
    #[default]
    NotOkTodo,

    /// `ok ... # TODO expected failure`.
    OkTodo,
}

/// The set of destinations TAP output is written to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Destinations {
    /// Write each line to a stream as soon as the test completes.
    pub stream: bool,

    /// Write one file per test unit.
    pub per_file: bool,

    /// Write a single combined file.
    pub combined: bool,
}

impl Destinations {
    /// Returns true if no destination is enabled. A run with no destinations produces no output.
    pub fn is_empty(&self) -> bool {
        !(self.stream || self.per_file || self.combined)
    }

    /// Returns true if a destination that carries a run-wide plan line is enabled.
    ///
    /// Per-file output always computes its own plan from the unit's line count.
    pub fn needs_plan(&self) -> bool {
        self.stream || self.combined
    }
}

/// Configuration for a single TAP reporting run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TapConfig {
    /// The destinations output is written to.
    pub destinations: Destinations,

    /// The directory per-file and combined output is written to.
    pub outdir: Option<Utf8PathBuf>,

    /// Which captured output is attached as diagnostics.
    pub logging_policy: LoggingPolicy,

    /// Attach captured output to passing tests as well.
    pub log_passing_tests: bool,

    /// How an expected failure that did fail is reported.
    pub expected_failure_mode: ExpectedFailureMode,

    /// Produce TAP version 13 output.
    pub tap_version_13: bool,
}

impl TapConfig {
    /// The default config, embedded in this crate.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the built-in defaults, layering `config_file` on top of them if provided.
    ///
    /// Unknown keys in `config_file` are reported as warnings.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(config_file, |config_file, unknown| {
            let mut unknown_str = String::new();
            if unknown.len() == 1 {
                unknown_str.push(' ');
                unknown_str.extend(unknown.iter().next().map(String::as_str));
            } else {
                for ignored_key in unknown {
                    unknown_str.push_str("\n  - ");
                    unknown_str.push_str(ignored_key);
                }
            }
            warn!("ignoring unknown configuration keys in config file {config_file}:{unknown_str}");
        })
    }

    fn from_sources_impl(
        config_file: Option<&Utf8Path>,
        mut unknown_callback: impl FnMut(&Utf8Path, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }

        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file.map(ToOwned::to_owned), kind))?;
        if let Some(config_file) = config_file {
            if !unknown.is_empty() {
                unknown_callback(config_file, &unknown);
            }
        }

        Ok(deserialized.tap.into_config())
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(TapConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: TapConfigDeserialize =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // The config crate also reports the key: drop it in favor of the path.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
struct TapConfigDeserialize {
    tap: TapSectionDeserialize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TapSectionDeserialize {
    stream: bool,
    files: bool,
    combined: bool,
    #[serde(default)]
    outdir: Option<Utf8PathBuf>,
    logging: LoggingPolicy,
    log_passing_tests: bool,
    expected_failure_mode: ExpectedFailureMode,
    version_13: bool,
}

impl TapSectionDeserialize {
    fn into_config(self) -> TapConfig {
        TapConfig {
            destinations: Destinations {
                stream: self.stream,
                per_file: self.files,
                combined: self.combined,
            },
            outdir: self.outdir,
            logging_policy: self.logging,
            log_passing_tests: self.log_passing_tests,
            expected_failure_mode: self.expected_failure_mode,
            tap_version_13: self.version_13,
        }
    }
}
