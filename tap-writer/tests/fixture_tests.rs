// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use goldenfile::Mint;
use tap_writer::{Directive, LineExtras, TrackerBuilder};

#[test]
fn fixtures() {
    let mut mint = Mint::new("tests/fixtures");

    let f = mint
        .new_goldenfile("basic_stream.tap")
        .expect("creating new goldenfile succeeds");

    let mut tracker = TrackerBuilder::new()
        .set_version_13(true)
        .build_streaming(f);

    tracker.set_plan(5).expect("setting the plan succeeds");
    tracker
        .add_ok(
            "test_basic.py",
            "test_basic.py::test_ok",
            None,
            LineExtras::default(),
        )
        .expect("adding ok succeeds");
    tracker
        .add_not_ok(
            "test_basic.py",
            "test_basic.py::test_not_ok",
            None,
            LineExtras::with_diagnostics(vec![
                "# def test_not_ok():".to_owned(),
                "# >       assert False".to_owned(),
                "# E       assert False".to_owned(),
            ]),
        )
        .expect("adding not ok succeeds");
    tracker
        .add_skip(
            "test_basic.py",
            "test_basic.py::test_skipped",
            "some reason",
        )
        .expect("adding skip succeeds");
    tracker
        .add_not_ok(
            "test_basic.py",
            "test_basic.py::test_broken",
            Some(Directive::todo("expected failure: a reason")),
            LineExtras::default(),
        )
        .expect("adding todo succeeds");
    tracker
        .add_ok(
            "test_ids.py",
            "test_ids.py::test_with_ids",
            None,
            LineExtras {
                diagnostics: Vec::new(),
                yaml_block: Some("requirement: REQ-12\ncovers:\n  - login".to_owned()),
            },
        )
        .expect("adding ok with a YAML block succeeds");
    tracker
        .generate_reports()
        .expect("generating reports succeeds");
}
