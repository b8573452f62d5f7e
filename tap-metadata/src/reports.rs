// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single message written by a test host, one per line of JSON.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum HostMessage {
    /// Collection finished and the number of tests to run is known.
    CollectionFinished(CollectionSummary),

    /// One phase of one test finished.
    PhaseReport(PhaseReport),
}

impl HostMessage {
    /// Parses a single line of JSON into a message.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// The number of tests a run is expected to report.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectionSummary {
    /// The number of tests collected.
    pub count: usize,

    /// Where the count came from.
    #[serde(default)]
    pub source: CountSource,

    /// True if tests may report subtests. Each subtest is reported as its own result, so the
    /// number of results is only known once the run is over.
    #[serde(default)]
    pub subtests: bool,
}

/// The origin of a [`CollectionSummary`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountSource {
    /// The count was computed by the local process.
    #[default]
    Local,

    /// The count was reported by a distributed-execution coordinator once every worker finished
    /// collecting. This count is authoritative and supersedes a local count.
    Coordinator,
}

/// The raw report for one phase of one test, as the host produces it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PhaseReport {
    /// Where the test lives.
    pub location: ReportLocation,

    /// The phase this report is for.
    pub when: ReportPhase,

    /// The outcome of the phase.
    pub outcome: ReportOutcome,

    /// Present if the test was marked as an expected failure: the marker's reason, possibly
    /// empty.
    #[serde(default)]
    pub wasxfail: Option<String>,

    /// True if the expected-failure marker was strict.
    #[serde(default)]
    pub xfail_strict: bool,

    /// The long representation of the outcome: failure text, or a skip location.
    #[serde(default)]
    pub longrepr: Option<LongRepr>,

    /// Captured output sections, as `[title, text]` pairs.
    #[serde(default)]
    pub sections: Vec<ReportSection>,

    /// Markers applied to the test.
    #[serde(default)]
    pub markers: Vec<ReportMarker>,

    /// Present if this report is for a subtest of the test rather than the test itself.
    #[serde(default)]
    pub subtest: Option<SubtestContext>,
}

/// Identifies a subtest within its test.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubtestContext {
    /// The message the subtest was given, if any.
    #[serde(default)]
    pub msg: Option<String>,

    /// The subtest's parameters, with values already rendered as text by the host.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// The location of a test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReportLocation {
    /// The path of the module or file containing the test.
    pub path: String,

    /// The line the test is defined at, if known.
    #[serde(default)]
    pub line: Option<u32>,

    /// The name of the test within its module, including any parameters.
    pub name: String,
}

/// The execution phase a [`PhaseReport`] describes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportPhase {
    /// Fixture setup.
    Setup,
    /// The test body.
    Call,
    /// Fixture teardown.
    Teardown,
}

/// The outcome recorded in a [`PhaseReport`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportOutcome {
    /// The phase passed.
    Passed,
    /// The phase failed.
    Failed,
    /// The phase was skipped.
    Skipped,
}

/// The long representation of an outcome.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LongRepr {
    /// Free-form failure text.
    Text(String),

    /// A `[path, line, message]` triple, as produced for skips. The message is typically of the
    /// form `Skipped: <reason>`.
    Location(String, Option<u32>, String),
}

/// A captured output section, serialized as a `[title, text]` pair.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReportSection(pub String, pub String);

impl ReportSection {
    /// Returns the section title, for example `Captured stdout call`.
    pub fn title(&self) -> &str {
        &self.0
    }

    /// Returns the captured text.
    pub fn text(&self) -> &str {
        &self.1
    }
}

/// A marker applied to a test, along with its positional arguments.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReportMarker {
    /// The marker name.
    pub name: String,

    /// The marker's positional arguments.
    #[serde(default)]
    pub args: Vec<String>,
}
