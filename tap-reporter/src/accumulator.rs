// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Grouping phase events by test.

use crate::events::{OutcomeEvent, Phase};
use indexmap::IndexMap;

/// Collects phase events until each test is complete.
///
/// A test is complete once its teardown event arrives. Tests are released in completion order,
/// which is the order their results are reported in.
#[derive(Debug, Default)]
pub struct TestAccumulator {
    pending: IndexMap<(String, String), Vec<OutcomeEvent>>,
}

impl TestAccumulator {
    /// Creates a new, empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event. If this event completes its test, returns all of that test's events.
    pub fn push(&mut self, event: OutcomeEvent) -> Option<Vec<OutcomeEvent>> {
        let is_teardown = event.phase == Phase::Teardown;
        let key = (event.test_unit_id.clone(), event.full_name.clone());
        self.pending.entry(key.clone()).or_default().push(event);

        if is_teardown {
            self.pending.shift_remove(&key)
        } else {
            None
        }
    }

    /// Returns the number of tests that have events but haven't completed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drains tests that never completed, in the order they were first seen.
    pub fn drain_pending(&mut self) -> impl Iterator<Item = Vec<OutcomeEvent>> + '_ {
        self.pending.drain(..).map(|(_, events)| events)
    }
}
