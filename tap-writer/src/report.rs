// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::serialize::serialize_test_line;
use std::fmt;

/// The status of a single TAP test line: `ok` or `not ok`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TestStatus {
    /// The test passed (`ok`).
    Ok,

    /// The test did not pass (`not ok`).
    NotOk,
}

impl TestStatus {
    /// Returns the protocol keyword for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Ok => "ok",
            TestStatus::NotOk => "not ok",
        }
    }

    /// Returns true if this is `ok`.
    pub fn is_ok(self) -> bool {
        matches!(self, TestStatus::Ok)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a TAP directive, without its reason.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DirectiveKind {
    /// `# SKIP`
    Skip,

    /// `# TODO`
    Todo,
}

impl DirectiveKind {
    /// Returns the protocol keyword for this directive.
    pub fn as_str(self) -> &'static str {
        match self {
            DirectiveKind::Skip => "SKIP",
            DirectiveKind::Todo => "TODO",
        }
    }
}

/// A directive annotating a TAP test line, along with its free-text reason.
///
/// The reason may be empty, in which case only the keyword is rendered.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Directive {
    /// The test was skipped.
    Skip(String),

    /// The test is not expected to pass yet.
    Todo(String),
}

impl Directive {
    /// Creates a new `SKIP` directive.
    pub fn skip(reason: impl Into<String>) -> Self {
        Directive::Skip(reason.into())
    }

    /// Creates a new `TODO` directive.
    pub fn todo(reason: impl Into<String>) -> Self {
        Directive::Todo(reason.into())
    }

    /// Returns the kind of this directive.
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::Skip(_) => DirectiveKind::Skip,
            Directive::Todo(_) => DirectiveKind::Todo,
        }
    }

    /// Returns the reason attached to this directive.
    pub fn reason(&self) -> &str {
        match self {
            Directive::Skip(reason) | Directive::Todo(reason) => reason,
        }
    }
}

/// A single test result, rendered as one TAP test line plus optional diagnostics.
///
/// Ordinal numbers are not part of a `TestLine`: they are assigned by the destination the line is
/// written to.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct TestLine {
    /// Whether the test passed.
    pub status: TestStatus,

    /// The test description.
    pub description: String,

    /// An optional `SKIP` or `TODO` directive.
    pub directive: Option<Directive>,

    /// Diagnostic lines written directly beneath the test line.
    ///
    /// Lines that don't already start with `#` are prefixed with `# ` when serialized.
    pub diagnostics: Vec<String>,

    /// An optional YAML block, only rendered in TAP version 13 output.
    ///
    /// This is the body of the block: the `---` and `...` delimiters and the indentation are
    /// added by the serializer.
    pub yaml_block: Option<String>,
}

impl TestLine {
    /// Creates a new `TestLine` with the given status and description.
    pub fn new(status: TestStatus, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
            directive: None,
            diagnostics: Vec::new(),
            yaml_block: None,
        }
    }

    /// Creates a new `ok` line.
    pub fn ok(description: impl Into<String>) -> Self {
        Self::new(TestStatus::Ok, description)
    }

    /// Creates a new `not ok` line.
    pub fn not_ok(description: impl Into<String>) -> Self {
        Self::new(TestStatus::NotOk, description)
    }

    /// Sets the directive for this line.
    pub fn set_directive(&mut self, directive: impl Into<Option<Directive>>) -> &mut Self {
        self.directive = directive.into();
        self
    }

    /// Appends diagnostic lines to this line.
    pub fn add_diagnostics(
        &mut self,
        diagnostics: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.diagnostics
            .extend(diagnostics.into_iter().map(Into::into));
        self
    }

    /// Sets the YAML block for this line.
    pub fn set_yaml_block(&mut self, yaml_block: impl Into<String>) -> &mut Self {
        self.yaml_block = Some(yaml_block.into());
        self
    }

    /// Renders this line with the given ordinal number, as TAP version 12 (without the YAML
    /// block).
    pub fn to_tap_string(&self, number: usize) -> String {
        let mut buf = Vec::new();
        serialize_test_line(self, number, false, &mut buf)
            .expect("writing to a Vec<u8> never fails");
        String::from_utf8(buf).expect("TAP output is always valid UTF-8")
    }
}

/// A group of test lines that belong to the same test unit (usually a source file or module).
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestUnit {
    /// The name of this test unit.
    pub name: String,

    /// The lines recorded for this unit, in the order they were added.
    pub lines: Vec<TestLine>,

    /// The number of `not ok` lines in this unit that don't carry a directive.
    pub failures: usize,
}

impl TestUnit {
    /// Creates a new, empty `TestUnit`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
            failures: 0,
        }
    }

    /// Adds a line to this unit and updates the failure count.
    pub fn add_line(&mut self, line: TestLine) -> &mut Self {
        if line.status == TestStatus::NotOk && line.directive.is_none() {
            self.failures += 1;
        }
        self.lines.push(line);
        self
    }

    /// Returns the number of lines in this unit.
    pub fn tests(&self) -> usize {
        self.lines.len()
    }
}
