// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridges per-phase host events to a [`RunAggregator`] and writes the final report.

use crate::{
    aggregator::RunAggregator,
    config::ReportConfig,
    errors::{ReporterError, RunOperation, RunStateError},
    events::TestPhaseEvent,
    outcome::{OutcomeKind, PhaseSignal, TestPhase, classify},
    report::RunReport,
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Observes a test run and writes a JSON verdict report when it finishes.
///
/// A host adapter calls [`on_run_started`](Self::on_run_started) once, then
/// [`on_test_phase_result`](Self::on_test_phase_result) for every phase of every test, then
/// [`on_run_finished`](Self::on_run_finished).
///
/// Each test is counted exactly once. Its phases are folded with
/// [`OutcomeKind::merge_phase`] and the result is committed when the teardown phase arrives.
#[derive(Debug)]
pub struct JsonVerdictReporter {
    path: Utf8PathBuf,
    aggregator: RunAggregator,
    // Tests whose teardown has not been seen yet, in the order they started.
    pending: IndexMap<String, OutcomeKind>,
}

impl JsonVerdictReporter {
    /// Creates a reporter that writes to the path in `config`.
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            path: config.path().to_owned(),
            aggregator: RunAggregator::new(),
            pending: IndexMap::new(),
        }
    }

    /// Returns the path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Called once when the run starts.
    pub fn on_run_started(&mut self) -> Result<(), RunStateError> {
        self.aggregator.begin_run()
    }

    /// Called for each phase of each test, between `on_run_started` and `on_run_finished`.
    pub fn on_test_phase_result(&mut self, event: TestPhaseEvent) -> Result<(), RunStateError> {
        self.aggregator.check_running(RunOperation::TestPhaseResult)?;

        let TestPhaseEvent {
            test_id,
            phase,
            signal,
            expected_failure,
            extra,
        } = event;

        let signal = signal.normalize_for(phase);
        // The expected-failure marker is about the test body: it applies to the call phase, or to
        // a skip that stands in for it.
        let expected_failure =
            expected_failure && (phase == TestPhase::Call || signal == PhaseSignal::Skipped);
        let kind = classify(signal, expected_failure);
        debug!(%test_id, %phase, %signal, expected_failure, %kind, "classified phase");

        if phase == TestPhase::Call {
            if let Some(marker) = extra {
                match marker.mapping.node_for(&test_id) {
                    Some(node) => {
                        self.aggregator
                            .record_extra(marker.key, node, signal.as_str())?;
                    }
                    None => {
                        // Unlike an identity mapping, a miss leaves `extra` untouched: no empty
                        // section is created for the key.
                        debug!(%test_id, key = %marker.key, "no extra node for test, skipping");
                    }
                }
            }
        }

        let merged = match self.pending.get(&test_id) {
            Some(held) => held.merge_phase(kind),
            None => kind,
        };

        if phase == TestPhase::Teardown {
            self.pending.shift_remove(&test_id);
            self.aggregator.record_outcome(&test_id, merged)?;
        } else {
            self.pending.insert(test_id, merged);
        }
        Ok(())
    }

    /// Called once when the run finishes: finalizes the run and writes the report.
    ///
    /// Tests whose teardown never arrived are counted with the phases seen so far.
    pub fn on_run_finished(&mut self) -> Result<RunReport, ReporterError> {
        for (test_id, kind) in std::mem::take(&mut self.pending) {
            warn!("test `{test_id}` finished without a teardown phase, counting it as {kind}");
            self.aggregator.record_outcome(&test_id, kind)?;
        }

        let report = self.aggregator.finalize_run()?;
        report.write_to_path(&self.path)?;
        debug!("generated json file: {}", self.path);
        Ok(report)
    }
}
