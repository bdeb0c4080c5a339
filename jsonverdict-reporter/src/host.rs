// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A JSON-lines encoding of host events, for hosts that record their events to a file or pipe.
//!
//! Each non-blank line is one event:
//!
//! ```json
//! {"type": "run-started"}
//! {"type": "phase-result", "test-id": "t::a", "phase": "call", "signal": "failed"}
//! {"type": "run-finished"}
//! ```

use crate::{
    errors::HostEventError,
    events::{ExtraMarker, NodeMapping, TestPhaseEvent},
    outcome::{PhaseSignal, TestPhase},
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::io::BufRead;

/// A single event recorded by a test-execution host.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostEvent {
    /// The run started.
    RunStarted,

    /// One phase of one test produced a result.
    #[serde(rename_all = "kebab-case")]
    PhaseResult {
        /// The identifier of the test.
        test_id: String,

        /// The phase.
        phase: TestPhase,

        /// The raw signal.
        signal: PhaseSignal,

        /// Whether the test carries an expected-failure marker.
        #[serde(default)]
        expected_failure: bool,

        /// An annotation asking for the call result to be recorded in `extra`.
        #[serde(default)]
        extra: Option<ExtraMarkerSpec>,
    },

    /// The run finished.
    RunFinished,
}

/// The serialized form of an [`ExtraMarker`]. Only table mappings can be serialized.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtraMarkerSpec {
    /// The section of `extra` the result is stored in.
    pub key: String,

    /// Maps test identifiers to node names. If absent, the test identifier is used.
    #[serde(default)]
    pub mapping: Option<IndexMap<String, String>>,
}

impl From<ExtraMarkerSpec> for ExtraMarker {
    fn from(spec: ExtraMarkerSpec) -> Self {
        let mut marker = ExtraMarker::new(spec.key);
        if let Some(table) = spec.mapping {
            marker.set_mapping(NodeMapping::Table(table));
        }
        marker
    }
}

impl HostEvent {
    /// Converts a phase result into a [`TestPhaseEvent`]. Returns `None` for run events.
    pub fn into_phase_event(self) -> Option<TestPhaseEvent> {
        match self {
            HostEvent::PhaseResult {
                test_id,
                phase,
                signal,
                expected_failure,
                extra,
            } => Some(TestPhaseEvent {
                test_id,
                phase,
                signal,
                expected_failure,
                extra: extra.map(ExtraMarker::from),
            }),
            HostEvent::RunStarted | HostEvent::RunFinished => None,
        }
    }
}

/// Reads [`HostEvent`]s from JSON lines, skipping blank lines.
///
/// Yields each event along with its 1-based line number.
#[derive(Debug)]
pub struct HostEventReader<R> {
    reader: R,
    line_number: usize,
    buf: String,
}

impl<R: BufRead> HostEventReader<R> {
    /// Creates a new reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for HostEventReader<R> {
    type Item = Result<(usize, HostEvent), HostEventError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line_number += 1;
            let line_number = self.line_number;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(error) => return Some(Err(HostEventError::Read { line_number, error })),
            }

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(line)
                    .map(|event| (line_number, event))
                    .map_err(|error| HostEventError::Parse { line_number, error }),
            );
        }
    }
}
