// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events a test-execution host feeds into a [`JsonVerdictReporter`](crate::JsonVerdictReporter).

use crate::outcome::{PhaseSignal, TestPhase};
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use std::sync::Arc;

/// The result of one phase of one test.
#[derive(Clone, Debug)]
pub struct TestPhaseEvent {
    /// The identifier of the test, unique within the run.
    pub test_id: String,

    /// The phase this result is for.
    pub phase: TestPhase,

    /// The raw signal reported by the host.
    pub signal: PhaseSignal,

    /// Whether the test carries an expected-failure marker.
    pub expected_failure: bool,

    /// An annotation asking for this test's call result to be recorded in `extra`.
    pub extra: Option<ExtraMarker>,
}

impl TestPhaseEvent {
    /// Creates a new event with no expected-failure marker and no annotation.
    pub fn new(test_id: impl Into<String>, phase: TestPhase, signal: PhaseSignal) -> Self {
        Self {
            test_id: test_id.into(),
            phase,
            signal,
            expected_failure: false,
            extra: None,
        }
    }

    /// Sets the expected-failure marker.
    pub fn set_expected_failure(&mut self, expected_failure: bool) -> &mut Self {
        self.expected_failure = expected_failure;
        self
    }

    /// Attaches an extra annotation.
    pub fn set_extra(&mut self, extra: ExtraMarker) -> &mut Self {
        self.extra = Some(extra);
        self
    }
}

/// A per-test annotation: record the call result under `extra[key][node]`.
#[derive(Clone, Debug)]
pub struct ExtraMarker {
    /// The section of `extra` the result is stored in.
    pub key: String,

    /// How the test identifier is turned into a node name.
    pub mapping: NodeMapping,
}

impl ExtraMarker {
    /// Creates a marker that uses the test identifier itself as the node name.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mapping: NodeMapping::Identity,
        }
    }

    /// Sets the node mapping.
    pub fn set_mapping(&mut self, mapping: NodeMapping) -> &mut Self {
        self.mapping = mapping;
        self
    }
}

/// A function mapping a test identifier to a node name.
pub type NodeMapFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Turns test identifiers into node names for the `extra` mapping.
#[derive(Clone, Debug, Default)]
pub enum NodeMapping {
    /// The node name is the test identifier.
    #[default]
    Identity,

    /// The node name is looked up in a table. Tests missing from the table are not recorded.
    Table(IndexMap<String, String>),

    /// The node name is computed by a function. Tests it returns `None` for are not recorded.
    Function(DebugIgnore<Arc<NodeMapFn>>),
}

impl NodeMapping {
    /// Creates a function mapping.
    pub fn function(f: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        NodeMapping::Function(DebugIgnore(Arc::new(f)))
    }

    /// Returns the node name for `test_id`, or `None` if it should not be recorded.
    pub fn node_for(&self, test_id: &str) -> Option<String> {
        match self {
            NodeMapping::Identity => Some(test_id.to_owned()),
            NodeMapping::Table(table) => table.get(test_id).cloned(),
            NodeMapping::Function(f) => (f.0)(test_id),
        }
    }
}

impl From<IndexMap<String, String>> for NodeMapping {
    fn from(table: IndexMap<String, String>) -> Self {
        NodeMapping::Table(table)
    }
}
