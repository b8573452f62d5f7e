// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    Directive, TestLine, TestStatus, TestUnit, WriteError,
    serialize::{serialize_header, serialize_plan, serialize_test_line, serialize_version},
};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
};

/// The name of the file that holds combined output.
pub static COMBINED_FILE_NAME: &str = "testresults.tap";

static TAP_EXTENSION: &str = "tap";

/// Optional details attached to a test line: diagnostics, and a YAML block for TAP version 13.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LineExtras {
    /// Diagnostic lines written directly beneath the test line.
    pub diagnostics: Vec<String>,

    /// The body of a YAML block, only rendered in TAP version 13 output.
    pub yaml_block: Option<String>,
}

impl LineExtras {
    /// Creates a new `LineExtras` with just diagnostics.
    pub fn with_diagnostics(diagnostics: Vec<String>) -> Self {
        Self {
            diagnostics,
            yaml_block: None,
        }
    }
}

/// Builder for a [`Tracker`].
#[derive(Debug, Default)]
#[must_use]
pub struct TrackerBuilder {
    outdir: Option<Utf8PathBuf>,
    per_file: bool,
    combined: bool,
    header: bool,
    version_13: bool,
}

impl TrackerBuilder {
    /// Creates a new builder with no destinations enabled and per-unit headers turned on.
    pub fn new() -> Self {
        Self {
            header: true,
            ..Default::default()
        }
    }

    /// Sets the output directory for per-file and combined output.
    ///
    /// The directory is created when reports are generated, if it doesn't exist.
    pub fn set_outdir(&mut self, outdir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.outdir = Some(outdir.into());
        self
    }

    /// Writes one file per test unit.
    pub fn set_per_file(&mut self, per_file: bool) -> &mut Self {
        self.per_file = per_file;
        self
    }

    /// Writes a single combined file for all test units.
    pub fn set_combined(&mut self, combined: bool) -> &mut Self {
        self.combined = combined;
        self
    }

    /// Writes a `# TAP results for <unit>` comment before each unit's lines in file output.
    ///
    /// Headers are never written to a stream.
    pub fn set_header(&mut self, header: bool) -> &mut Self {
        self.header = header;
        self
    }

    /// Writes `TAP version 13` at the top of each destination, and renders YAML blocks.
    pub fn set_version_13(&mut self, version_13: bool) -> &mut Self {
        self.version_13 = version_13;
        self
    }

    /// Builds a tracker without a stream.
    pub fn build(&self) -> Tracker {
        self.build_impl(None)
    }

    /// Builds a tracker that streams each line to `stream` as soon as it is added.
    pub fn build_streaming(&self, stream: impl Write + Send + 'static) -> Tracker {
        self.build_impl(Some(Box::new(stream)))
    }

    fn build_impl(&self, stream: Option<Box<dyn Write + Send>>) -> Tracker {
        Tracker {
            outdir: self.outdir.clone(),
            per_file: self.per_file,
            combined: self.combined,
            header: self.header,
            version_13: self.version_13,
            stream: stream.map(|writer| StreamState {
                writer,
                started: false,
                plan_written: false,
                count: 0,
            }),
            plan: None,
            units: IndexMap::new(),
            order: Vec::new(),
        }
    }
}

/// Tracks test lines for a run and writes them out to the configured destinations.
///
/// Lines are numbered per destination: the stream and the combined file number lines across the
/// whole run, while each per-unit file restarts at 1.
pub struct Tracker {
    outdir: Option<Utf8PathBuf>,
    per_file: bool,
    combined: bool,
    header: bool,
    version_13: bool,
    stream: Option<StreamState>,
    plan: Option<usize>,
    units: IndexMap<String, TestUnit>,
    // (unit index, line index) pairs in the order lines were added.
    order: Vec<(usize, usize)>,
}

struct StreamState {
    writer: Box<dyn Write + Send>,
    started: bool,
    plan_written: bool,
    count: usize,
}

impl StreamState {
    fn start(&mut self, version_13: bool) -> io::Result<()> {
        if !self.started {
            self.started = true;
            if version_13 {
                serialize_version(&mut self.writer)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("outdir", &self.outdir)
            .field("per_file", &self.per_file)
            .field("combined", &self.combined)
            .field("streaming", &self.stream.is_some())
            .field("plan", &self.plan)
            .field("units", &self.units.len())
            .field("lines", &self.order.len())
            .finish()
    }
}

impl Tracker {
    /// Returns the plan, if one was set.
    pub fn plan(&self) -> Option<usize> {
        self.plan
    }

    /// Returns the test units seen so far, in the order they were first seen.
    pub fn units(&self) -> impl ExactSizeIterator<Item = &TestUnit> {
        self.units.values()
    }

    /// Returns the total number of lines added across all units.
    pub fn line_count(&self) -> usize {
        self.order.len()
    }

    /// Returns true if this tracker streams lines as they're added.
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Sets the plan: the total number of tests expected in this run.
    ///
    /// The plan can only be set once, before the first line is added. If streaming, the plan
    /// line is written immediately. Later calls are ignored: every destination then closes with
    /// a plan that counts the lines it was given, so the stream and the combined file always
    /// agree.
    pub fn set_plan(&mut self, count: usize) -> Result<(), WriteError> {
        if self.plan.is_some() || !self.order.is_empty() {
            return Ok(());
        }
        self.plan = Some(count);
        if let Some(stream) = &mut self.stream {
            stream.start(self.version_13).map_err(WriteError::Stream)?;
            serialize_plan(count, &mut stream.writer).map_err(WriteError::Stream)?;
            stream.plan_written = true;
        }
        Ok(())
    }

    /// Returns the plan that the stream and the combined file report: the plan if one was set,
    /// otherwise the number of lines added.
    pub fn closing_plan(&self) -> usize {
        self.plan.unwrap_or(self.order.len())
    }

    /// Adds an `ok` line.
    pub fn add_ok(
        &mut self,
        unit: &str,
        description: impl Into<String>,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), WriteError> {
        self.add_with_status(TestStatus::Ok, unit, description, directive, extras)
    }

    /// Adds a `not ok` line.
    pub fn add_not_ok(
        &mut self,
        unit: &str,
        description: impl Into<String>,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), WriteError> {
        self.add_with_status(TestStatus::NotOk, unit, description, directive, extras)
    }

    /// Adds an `ok` line with a `SKIP` directive.
    pub fn add_skip(
        &mut self,
        unit: &str,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<(), WriteError> {
        self.add_with_status(
            TestStatus::Ok,
            unit,
            description,
            Some(Directive::skip(reason)),
            LineExtras::default(),
        )
    }

    fn add_with_status(
        &mut self,
        status: TestStatus,
        unit: &str,
        description: impl Into<String>,
        directive: Option<Directive>,
        extras: LineExtras,
    ) -> Result<(), WriteError> {
        let LineExtras {
            diagnostics,
            yaml_block,
        } = extras;
        let mut line = TestLine::new(status, description);
        line.set_directive(directive).add_diagnostics(diagnostics);
        if let Some(yaml_block) = yaml_block {
            line.set_yaml_block(yaml_block);
        }
        self.add_line(unit, line)
    }

    /// Adds a line to the given unit, streaming it out if a stream is configured.
    pub fn add_line(&mut self, unit_name: &str, line: TestLine) -> Result<(), WriteError> {
        if let Some(stream) = &mut self.stream {
            stream.start(self.version_13).map_err(WriteError::Stream)?;
            stream.count += 1;
            serialize_test_line(&line, stream.count, self.version_13, &mut stream.writer)
                .map_err(WriteError::Stream)?;
        }

        let entry = self.units.entry(unit_name.to_owned());
        let unit_index = entry.index();
        let unit = entry.or_insert_with(|| TestUnit::new(unit_name));
        unit.add_line(line);
        self.order.push((unit_index, unit.lines.len() - 1));
        Ok(())
    }

    /// Writes out all destinations: finishes the stream, then writes the combined and per-unit
    /// files.
    ///
    /// If streaming and the plan was never written, the plan line is written at the end of the
    /// stream using [`Self::closing_plan`].
    pub fn generate_reports(&mut self) -> Result<(), WriteError> {
        let closing_plan = self.closing_plan();
        if let Some(stream) = &mut self.stream {
            stream.start(self.version_13).map_err(WriteError::Stream)?;
            if !stream.plan_written {
                serialize_plan(closing_plan, &mut stream.writer).map_err(WriteError::Stream)?;
                stream.plan_written = true;
            }
            stream.writer.flush().map_err(WriteError::Stream)?;
        }

        if self.combined {
            self.write_combined()?;
        }
        if self.per_file {
            self.write_per_file()?;
        }

        Ok(())
    }

    fn write_combined(&self) -> Result<(), WriteError> {
        let path = self.output_path(Utf8Path::new(COMBINED_FILE_NAME));
        let mut writer = create_file(&path)?;
        let map_err = |error| WriteError::Fs {
            file: path.clone(),
            error,
        };

        if self.version_13 {
            serialize_version(&mut writer).map_err(map_err)?;
        }
        serialize_plan(self.closing_plan(), &mut writer).map_err(map_err)?;

        let mut last_unit = None;
        for (number, &(unit_index, line_index)) in self.order.iter().enumerate() {
            let (_, unit) = self
                .units
                .get_index(unit_index)
                .expect("unit indexes are always valid");
            if self.header && last_unit != Some(unit_index) {
                serialize_header(&unit.name, &mut writer).map_err(map_err)?;
            }
            last_unit = Some(unit_index);
            serialize_test_line(
                &unit.lines[line_index],
                number + 1,
                self.version_13,
                &mut writer,
            )
            .map_err(map_err)?;
        }

        writer.flush().map_err(map_err)
    }

    fn write_per_file(&self) -> Result<(), WriteError> {
        for unit in self.units.values() {
            let path = self.output_path(&unit_file_name(&unit.name));
            let mut writer = create_file(&path)?;
            let map_err = |error| WriteError::Fs {
                file: path.clone(),
                error,
            };

            if self.version_13 {
                serialize_version(&mut writer).map_err(map_err)?;
            }
            serialize_plan(unit.tests(), &mut writer).map_err(map_err)?;
            if self.header {
                serialize_header(&unit.name, &mut writer).map_err(map_err)?;
            }
            for (number, line) in unit.lines.iter().enumerate() {
                serialize_test_line(line, number + 1, self.version_13, &mut writer)
                    .map_err(map_err)?;
            }
            writer.flush().map_err(map_err)?;
        }

        Ok(())
    }

    fn output_path(&self, file_name: &Utf8Path) -> Utf8PathBuf {
        match &self.outdir {
            Some(outdir) => outdir.join(file_name),
            None => file_name.to_owned(),
        }
    }
}

/// Returns the relative file name for a unit's per-file output.
///
/// Only the normal components of the unit name are kept, so that units never escape the output
/// directory.
fn unit_file_name(unit: &str) -> Utf8PathBuf {
    let mut path: Utf8PathBuf = Utf8Path::new(unit)
        .components()
        .filter_map(|component| match component {
            Utf8Component::Normal(name) => Some(name),
            _ => None,
        })
        .collect();
    if path.as_str().is_empty() {
        path.push("unnamed");
    }
    let file_name = format!("{}.{TAP_EXTENSION}", path.file_name().unwrap_or_default());
    path.set_file_name(file_name);
    path
}

fn create_file(path: &Utf8Path) -> Result<BufWriter<File>, WriteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|error| WriteError::Fs {
                file: parent.to_owned(),
                error,
            })?;
        }
    }
    let file = File::create(path).map_err(|error| WriteError::Fs {
        file: path.to_owned(),
        error,
    })?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    /// A cloneable in-memory stream, so tests can inspect what was written.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test_case("test_mod.py", "test_mod.py.tap" ; "file with extension")]
    #[test_case("tests/test_mod.py", "tests/test_mod.py.tap" ; "nested")]
    #[test_case("/abs/../test_mod.py", "abs/test_mod.py.tap" ; "absolute and parent")]
    #[test_case("module", "module.tap" ; "no extension")]
    #[test_case("", "unnamed.tap" ; "empty")]
    fn test_unit_file_name(unit: &str, expected: &str) {
        assert_eq!(unit_file_name(unit), Utf8PathBuf::from(expected));
    }

    #[test]
    fn test_stream_with_plan() {
        let buf = SharedBuf::default();
        let mut tracker = TrackerBuilder::new().build_streaming(buf.clone());

        tracker.set_plan(3).unwrap();
        tracker
            .add_ok("test_mod.py", "test_mod.py::test_ok", None, LineExtras::default())
            .unwrap();
        tracker
            .add_not_ok(
                "test_mod.py",
                "test_mod.py::test_not_ok",
                None,
                LineExtras::with_diagnostics(vec!["# assert False".to_owned()]),
            )
            .unwrap();
        tracker
            .add_skip("test_other.py", "test_other.py::test_skipped", "some reason")
            .unwrap();
        tracker.generate_reports().unwrap();

        assert_eq!(
            buf.contents(),
            indoc! {"
                1..3
                ok 1 test_mod.py::test_ok
                not ok 2 test_mod.py::test_not_ok
                # assert False
                ok 3 test_other.py::test_skipped # SKIP some reason
            "}
        );
    }

    #[test]
    fn test_stream_without_plan_writes_plan_last() {
        let buf = SharedBuf::default();
        let mut tracker = TrackerBuilder::new()
            .set_version_13(true)
            .build_streaming(buf.clone());

        tracker
            .add_ok("test_mod.py", "test_mod.py::test_a", None, LineExtras::default())
            .unwrap();
        tracker
            .add_ok("test_mod.py", "test_mod.py::test_b", None, LineExtras::default())
            .unwrap();
        tracker.generate_reports().unwrap();

        assert_eq!(
            buf.contents(),
            indoc! {"
                TAP version 13
                ok 1 test_mod.py::test_a
                ok 2 test_mod.py::test_b
                1..2
            "}
        );
    }

    #[test]
    fn test_late_plan_ignored_by_every_destination() {
        let dir = Utf8TempDir::new().unwrap();
        let buf = SharedBuf::default();
        let mut tracker = TrackerBuilder::new()
            .set_outdir(dir.path())
            .set_combined(true)
            .set_header(false)
            .build_streaming(buf.clone());

        tracker
            .add_ok("test_mod.py", "test_mod.py::test_a", None, LineExtras::default())
            .unwrap();
        tracker.set_plan(5).unwrap();
        tracker
            .add_ok("test_mod.py", "test_mod.py::test_b", None, LineExtras::default())
            .unwrap();
        tracker.generate_reports().unwrap();

        assert_eq!(tracker.plan(), None);
        assert_eq!(tracker.closing_plan(), 2);
        assert_eq!(
            buf.contents(),
            indoc! {"
                ok 1 test_mod.py::test_a
                ok 2 test_mod.py::test_b
                1..2
            "}
        );
        let combined = std::fs::read_to_string(dir.path().join(COMBINED_FILE_NAME)).unwrap();
        assert_eq!(
            combined,
            indoc! {"
                1..2
                ok 1 test_mod.py::test_a
                ok 2 test_mod.py::test_b
            "}
        );
    }

    #[test]
    fn test_plan_set_once() {
        let buf = SharedBuf::default();
        let mut tracker = TrackerBuilder::new().build_streaming(buf.clone());
        tracker.set_plan(1).unwrap();
        tracker.set_plan(4).unwrap();
        tracker
            .add_ok("test_mod.py", "test_mod.py::test_a", None, LineExtras::default())
            .unwrap();
        tracker.generate_reports().unwrap();

        assert_eq!(tracker.plan(), Some(1));
        assert_eq!(buf.contents(), "1..1\nok 1 test_mod.py::test_a\n");
    }

    #[test]
    fn test_combined_and_per_file() {
        let dir = Utf8TempDir::new().unwrap();
        let outdir = dir.path().join("results");
        let mut tracker = TrackerBuilder::new()
            .set_outdir(&outdir)
            .set_combined(true)
            .set_per_file(true)
            .build();

        tracker.set_plan(3).unwrap();
        tracker
            .add_ok("test_a.py", "test_a.py::test_one", None, LineExtras::default())
            .unwrap();
        tracker
            .add_not_ok(
                "test_b.py",
                "test_b.py::test_two",
                Some(Directive::todo("expected failure: a reason")),
                LineExtras::default(),
            )
            .unwrap();
        tracker
            .add_ok("test_a.py", "test_a.py::test_three", None, LineExtras::default())
            .unwrap();
        tracker.generate_reports().unwrap();

        let combined = std::fs::read_to_string(outdir.join(COMBINED_FILE_NAME)).unwrap();
        assert_eq!(
            combined,
            indoc! {"
                1..3
                # TAP results for test_a.py
                ok 1 test_a.py::test_one
                # TAP results for test_b.py
                not ok 2 test_b.py::test_two # TODO expected failure: a reason
                # TAP results for test_a.py
                ok 3 test_a.py::test_three
            "}
        );

        let per_file = std::fs::read_to_string(outdir.join("test_a.py.tap")).unwrap();
        assert_eq!(
            per_file,
            indoc! {"
                1..2
                # TAP results for test_a.py
                ok 1 test_a.py::test_one
                ok 2 test_a.py::test_three
            "}
        );
        assert!(outdir.join("test_b.py.tap").exists());
        assert_eq!(tracker.units().len(), 2);
        assert_eq!(tracker.line_count(), 3);
    }

    #[test]
    fn test_outdir_not_creatable() {
        let dir = Utf8TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut tracker = TrackerBuilder::new()
            .set_outdir(blocker.join("results"))
            .set_combined(true)
            .build();
        tracker
            .add_ok("test_a.py", "test_a.py::test_one", None, LineExtras::default())
            .unwrap();

        let error = tracker.generate_reports().unwrap_err();
        assert!(
            matches!(error, WriteError::Fs { .. }),
            "expected a file system error, found {error:?}"
        );
    }
}
