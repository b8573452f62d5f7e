// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `tap-report` failures.
///
/// `tap-report` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TapExitCode {}

impl TapExitCode {
    /// No errors occurred and tap-report exited normally.
    pub const OK: i32 = 0;

    /// One or more tests were reported as `not ok` without a directive.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// A host report could not be read or parsed.
    pub const HOST_REPORT_ERROR: i32 = 104;

    /// A test carried a malformed marker, such as a `TESTIDS` marker with more than one argument.
    pub const MARKER_ERROR: i32 = 105;

    /// Writing TAP output to a destination produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// A user issue happened while setting up a tap-report invocation, for example an invalid
    /// configuration file.
    pub const SETUP_ERROR: i32 = 96;
}
