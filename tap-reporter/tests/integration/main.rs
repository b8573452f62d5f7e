// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: host reports in, TAP out.

use camino_tempfile::Utf8TempDir;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};
use tap_metadata::HostMessage;
use tap_reporter::{
    accumulator::TestAccumulator,
    config::{Destinations, TapConfig},
    events::OutcomeEvent,
    session::{ReportingSession, SessionSummary},
};
use tap_writer::{Directive, TestStatus, parse_line};

/// A cloneable in-memory stream.
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

fn stream_config() -> TapConfig {
    TapConfig {
        destinations: Destinations {
            stream: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Feeds JSON lines through the accumulator and session, and returns the streamed output.
fn run(config: TapConfig, input: &str) -> (String, SessionSummary) {
    let buf = SharedBuf::default();
    let mut session = ReportingSession::start_with_tracker(config, buf.clone());
    let mut accumulator = TestAccumulator::new();

    for line in input.lines().filter(|line| !line.trim().is_empty()) {
        match HostMessage::from_json_line(line).unwrap() {
            HostMessage::CollectionFinished(summary) => {
                session.on_plan_known(summary.count, summary.source);
                if summary.subtests {
                    session.expect_subtests();
                }
            }
            HostMessage::PhaseReport(report) => {
                let event = OutcomeEvent::from_report(&report).unwrap();
                if let Some(events) = accumulator.push(event) {
                    session.report_test(&events).unwrap();
                }
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
    let pending: Vec<_> = accumulator.drain_pending().collect();
    for events in pending {
        session.report_test(&events).unwrap();
    }

    let summary = session.finish().unwrap();
    (buf.contents(), summary)
}

#[test]
fn stream_four_tests() {
    let input = indoc! {r#"
        {"type": "collection-finished", "count": 4}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_ok"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_ok"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_ok"}, "when": "teardown", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_not_ok"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_not_ok"}, "when": "call", "outcome": "failed", "longrepr": "def test_not_ok():\n>       assert False\nE       assert False"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_not_ok"}, "when": "teardown", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_skipped"}, "when": "setup", "outcome": "skipped", "longrepr": ["test_stream.py", 10, "Skipped: some reason"]}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_skipped"}, "when": "teardown", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_broken"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_broken"}, "when": "call", "outcome": "skipped", "wasxfail": "a reason", "longrepr": "assert False"}
        {"type": "phase-report", "location": {"path": "test_stream.py", "name": "test_broken"}, "when": "teardown", "outcome": "passed"}
    "#};

    let (output, summary) = run(stream_config(), input);
    assert_eq!(
        output,
        indoc! {"
            1..4
            ok 1 test_stream.py::test_ok
            not ok 2 test_stream.py::test_not_ok
            # def test_not_ok():
            # >       assert False
            # E       assert False
            ok 3 test_stream.py::test_skipped # SKIP some reason
            not ok 4 test_stream.py::test_broken # TODO expected failure: a reason
            # assert False
        "}
    );
    assert_eq!(
        summary,
        SessionSummary {
            facts: 4,
            failures: 1,
            plan: Some(4),
        }
    );
}

#[test]
fn strict_xpass() {
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "test_strict.py", "name": "test_xpass"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_strict.py", "name": "test_xpass"}, "when": "call", "outcome": "failed", "wasxfail": "", "xfail-strict": true, "longrepr": "[XPASS(strict)] a reason"}
        {"type": "phase-report", "location": {"path": "test_strict.py", "name": "test_xpass"}, "when": "teardown", "outcome": "passed"}
    "#};

    let (output, summary) = run(stream_config(), input);
    assert_eq!(
        output,
        indoc! {"
            not ok 1 test_strict.py::test_xpass # TODO unexpected success: [XPASS(strict)] a reason
            # [XPASS(strict)] a reason
            1..1
        "}
    );
    assert!(summary.is_success());
}

#[test]
fn setup_failure() {
    let input = indoc! {r#"
        {"type": "collection-finished", "count": 1}
        {"type": "phase-report", "location": {"path": "test_setup.py", "name": "test_fixture"}, "when": "setup", "outcome": "failed", "longrepr": "E       fixture 'db' not found"}
        {"type": "phase-report", "location": {"path": "test_setup.py", "name": "test_fixture"}, "when": "teardown", "outcome": "failed", "longrepr": "teardown blew up"}
    "#};

    let (output, summary) = run(stream_config(), input);
    assert_eq!(
        output,
        indoc! {"
            1..1
            not ok 1 test_setup.py::test_fixture
            # E       fixture 'db' not found
        "}
    );
    assert_eq!(summary.failures, 1);
}

#[test]
fn completion_order() {
    // test_b completes first, so it's reported first.
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "test_order.py", "name": "test_a"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_order.py", "name": "test_b"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_order.py", "name": "test_b"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_order.py", "name": "test_b"}, "when": "teardown", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_order.py", "name": "test_a"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_order.py", "name": "test_a"}, "when": "teardown", "outcome": "passed"}
        {"type": "collection-finished", "count": 2, "source": "coordinator"}
    "#};

    let (output, summary) = run(stream_config(), input);
    assert_eq!(
        output,
        indoc! {"
            ok 1 test_order.py::test_b
            ok 2 test_order.py::test_a
            1..2
        "}
    );
    assert_eq!(summary.plan, Some(2));
}

#[test]
fn coordinator_count_wins() {
    let input = indoc! {r#"
        {"type": "collection-finished", "count": 5}
        {"type": "collection-finished", "count": 1, "source": "coordinator"}
        {"type": "phase-report", "location": {"path": "test_dist.py", "name": "test_one"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_dist.py", "name": "test_one"}, "when": "teardown", "outcome": "passed"}
    "#};

    let (output, _) = run(stream_config(), input);
    assert_eq!(output, "1..1\nok 1 test_dist.py::test_one\n");
}

#[test]
fn facts_round_trip() {
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "test_rt.py", "name": "test_ok[a#b]"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_rt.py", "name": "test_ok[a#b]"}, "when": "teardown", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_rt.py", "name": "test_skip"}, "when": "setup", "outcome": "skipped", "longrepr": ["test_rt.py", 3, "Skipped: not today"]}
        {"type": "phase-report", "location": {"path": "test_rt.py", "name": "test_xpass"}, "when": "call", "outcome": "passed", "wasxfail": "flaky"}
    "#};

    let (output, _) = run(stream_config(), input);
    let parsed: Vec<_> = output
        .lines()
        .filter(|line| line.starts_with("ok") || line.starts_with("not ok"))
        .map(|line| parse_line(line).unwrap())
        .collect();

    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[0].status, TestStatus::Ok);
    assert_eq!(parsed[0].description, "test_rt.py::test_ok[a#b]");
    assert_eq!(parsed[0].directive, None);
    // Tests that never completed are reported in the order they were first seen.
    assert_eq!(parsed[1].description, "test_rt.py::test_skip");
    assert_eq!(parsed[1].directive, Some(Directive::skip("not today")));
    assert_eq!(parsed[2].status, TestStatus::Ok);
    assert_eq!(
        parsed[2].directive,
        Some(Directive::todo("unexpected success: flaky"))
    );
    let numbers: Vec<_> = parsed.iter().map(|line| line.number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn yaml_block_in_version_13() {
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "test_ids.py", "name": "test_tagged"}, "when": "call", "outcome": "passed", "markers": [{"name": "TESTIDS", "args": ["id: 42\nowner: qa"]}]}
        {"type": "phase-report", "location": {"path": "test_ids.py", "name": "test_tagged"}, "when": "teardown", "outcome": "passed"}
    "#};

    let config = TapConfig {
        tap_version_13: true,
        ..stream_config()
    };
    let (output, _) = run(config, input);
    assert_eq!(
        output,
        indoc! {"
            TAP version 13
            ok 1 test_ids.py::test_tagged
              ---
              id: 42
              owner: qa
              ...
            1..1
        "}
    );
}

#[test]
fn inert_session_writes_nothing() {
    let input = indoc! {r#"
        {"type": "collection-finished", "count": 1}
        {"type": "phase-report", "location": {"path": "test_mod.py", "name": "test_fail"}, "when": "call", "outcome": "failed", "longrepr": "boom"}
        {"type": "phase-report", "location": {"path": "test_mod.py", "name": "test_fail"}, "when": "teardown", "outcome": "passed"}
    "#};

    let (output, summary) = run(TapConfig::default(), input);
    assert_eq!(output, "");
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.plan, None);
}

#[test]
fn subtests_stream() {
    let input = indoc! {r#"
        {"type": "collection-finished", "count": 1, "subtests": true}
        {"type": "phase-report", "location": {"path": "test_sub.py", "name": "test_subtests"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_sub.py", "name": "test_subtests"}, "when": "call", "outcome": "passed", "subtest": {"msg": "sub_msg", "params": {"i": "0"}}}
        {"type": "phase-report", "location": {"path": "test_sub.py", "name": "test_subtests"}, "when": "call", "outcome": "failed", "longrepr": "assert 1 % 2 == 0", "subtest": {"msg": "sub_msg", "params": {"i": "1"}}}
        {"type": "phase-report", "location": {"path": "test_sub.py", "name": "test_subtests"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_sub.py", "name": "test_subtests"}, "when": "teardown", "outcome": "passed"}
    "#};

    let (output, summary) = run(stream_config(), input);
    assert_eq!(
        output,
        indoc! {"
            ok 1 test_sub.py::test_subtests[sub_msg] (i=0)
            not ok 2 test_sub.py::test_subtests[sub_msg] (i=1)
            # assert 1 % 2 == 0
            ok 3 test_sub.py::test_subtests
            1..3
        "}
    );
    assert_eq!(
        summary,
        SessionSummary {
            facts: 3,
            failures: 1,
            plan: Some(3),
        }
    );
}

#[test]
fn repeated_call_reports_never_dropped() {
    // The host didn't announce subtests, so the plan undercounts, but every result is reported.
    let input = indoc! {r#"
        {"type": "collection-finished", "count": 1}
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_subtests"}, "when": "setup", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_subtests"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_subtests"}, "when": "call", "outcome": "failed", "longrepr": "assert 1 % 2 == 0"}
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_subtests"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_subtests"}, "when": "teardown", "outcome": "passed"}
    "#};

    let (output, summary) = run(stream_config(), input);
    assert_eq!(
        output,
        indoc! {"
            1..1
            ok 1 t.py::test_subtests
            not ok 2 t.py::test_subtests
            # assert 1 % 2 == 0
            ok 3 t.py::test_subtests
        "}
    );
    assert_eq!(summary.facts, 3);
    assert_eq!(summary.failures, 1);
    assert!(!summary.is_success());
}

#[test]
fn late_count_same_plan_everywhere() {
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "test_late.py", "name": "test_a"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_late.py", "name": "test_a"}, "when": "teardown", "outcome": "passed"}
        {"type": "collection-finished", "count": 3, "source": "coordinator"}
        {"type": "phase-report", "location": {"path": "test_late.py", "name": "test_b"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "test_late.py", "name": "test_b"}, "when": "teardown", "outcome": "passed"}
    "#};

    let dir = Utf8TempDir::new().unwrap();
    let config = TapConfig {
        destinations: Destinations {
            stream: true,
            combined: true,
            ..Default::default()
        },
        outdir: Some(dir.path().to_owned()),
        ..Default::default()
    };
    let (output, summary) = run(config, input);

    let stream_plan = output.lines().last().unwrap().to_owned();
    let combined = std::fs::read_to_string(dir.path().join("testresults.tap")).unwrap();
    let combined_plan = combined.lines().next().unwrap();
    assert_eq!(stream_plan, "1..2");
    assert_eq!(combined_plan, stream_plan);
    assert_eq!(summary.plan, Some(2));
}

#[test]
fn skipped_test_keeps_yaml_block() {
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "test_ids.py", "name": "test_skipped"}, "when": "setup", "outcome": "skipped", "longrepr": ["test_ids.py", 4, "Skipped: not today"], "markers": [{"name": "TESTIDS", "args": ["id: 7"]}]}
        {"type": "phase-report", "location": {"path": "test_ids.py", "name": "test_skipped"}, "when": "teardown", "outcome": "passed"}
    "#};

    let config = TapConfig {
        tap_version_13: true,
        ..stream_config()
    };
    let (output, _) = run(config, input);
    assert_eq!(
        output,
        indoc! {"
            TAP version 13
            ok 1 test_ids.py::test_skipped # SKIP not today
              ---
              id: 7
              ...
            1..1
        "}
    );
}

#[test]
fn whitespace_in_names_round_trips() {
    let input = indoc! {r#"
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_x[a\nb]"}, "when": "call", "outcome": "passed"}
        {"type": "phase-report", "location": {"path": "t.py", "name": "test_x[ ] "}, "when": "call", "outcome": "failed", "longrepr": "boom"}
    "#};

    let (output, _) = run(stream_config(), input);
    let descriptions: Vec<_> = output
        .lines()
        .filter(|line| line.starts_with("ok") || line.starts_with("not ok"))
        .map(|line| parse_line(line).unwrap().description)
        .collect();
    assert_eq!(descriptions, vec!["t.py::test_x[a\nb]", "t.py::test_x[ ] "]);
}
