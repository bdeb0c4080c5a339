// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregates classified outcomes and extra annotations over a single run.

use crate::{
    errors::{RunOperation, RunStateError},
    outcome::OutcomeKind,
    report::{ExtraMap, OutcomeCounts, RunReport},
    stopwatch::{StopwatchStart, stopwatch},
};
use tracing::debug;

/// Accumulates the state of one test run.
///
/// The lifecycle is strict: [`begin_run`](Self::begin_run) once, then any number of
/// [`record_outcome`](Self::record_outcome) and [`record_extra`](Self::record_extra) calls, then
/// [`finalize_run`](Self::finalize_run). Calls out of order return a [`RunStateError`] rather
/// than producing a zeroed report.
///
/// A `RunAggregator` is meant to be driven from a single thread, one test at a time.
#[derive(Clone, Debug, Default)]
pub struct RunAggregator {
    state: RunState,
}

#[derive(Clone, Debug, Default)]
enum RunState {
    #[default]
    NotStarted,
    Running(RunningState),
    Finished(RunReport),
}

#[derive(Clone, Debug)]
struct RunningState {
    stopwatch: StopwatchStart,
    counts: OutcomeCounts,
    extra: ExtraMap,
}

impl RunAggregator {
    /// Creates a new aggregator. No run has begun yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins the run: captures the start time and starts from empty counters and annotations.
    pub fn begin_run(&mut self) -> Result<(), RunStateError> {
        match self.state {
            RunState::NotStarted => {
                let running = RunningState {
                    stopwatch: stopwatch(),
                    counts: OutcomeCounts::default(),
                    extra: ExtraMap::new(),
                };
                debug!(
                    "run began at {}",
                    running.stopwatch.snapshot().start_time.to_rfc3339()
                );
                self.state = RunState::Running(running);
                Ok(())
            }
            RunState::Running(_) => Err(RunStateError::AlreadyStarted),
            RunState::Finished(_) => Err(RunStateError::AlreadyFinished {
                operation: RunOperation::BeginRun,
            }),
        }
    }

    /// Increments the counter for `kind` by one.
    ///
    /// `test_id` is only used for logging.
    pub fn record_outcome(&mut self, test_id: &str, kind: OutcomeKind) -> Result<(), RunStateError> {
        let running = self.running_mut(RunOperation::RecordOutcome)?;
        running.counts.add(kind);
        debug!(%test_id, %kind, "recorded outcome");
        Ok(())
    }

    /// Sets `extra[section][node] = value`, creating the section on first use.
    ///
    /// A second call with the same section and node overwrites the earlier value. The value is
    /// stored verbatim: it does not have to name an [`OutcomeKind`].
    pub fn record_extra(
        &mut self,
        section: impl Into<String>,
        node: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RunStateError> {
        let running = self.running_mut(RunOperation::RecordExtra)?;
        let (section, node, value) = (section.into(), node.into(), value.into());
        debug!(%section, %node, %value, "recorded extra");
        running
            .extra
            .entry(section)
            .or_default()
            .insert(node, value);
        Ok(())
    }

    /// Returns the counters recorded so far, if the run is in progress.
    pub fn counts(&self) -> Option<&OutcomeCounts> {
        match &self.state {
            RunState::Running(running) => Some(&running.counts),
            RunState::NotStarted | RunState::Finished(_) => None,
        }
    }

    /// Returns true if [`finalize_run`](Self::finalize_run) has produced a report.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Finished(_))
    }

    /// Finalizes the run, computing the duration and `sum`, and returns the report.
    ///
    /// The report is frozen on the first successful call: calling this again returns the same
    /// report, and further `record_*` calls fail.
    pub fn finalize_run(&mut self) -> Result<RunReport, RunStateError> {
        let running = match &mut self.state {
            RunState::NotStarted => {
                return Err(RunStateError::NotStarted {
                    operation: RunOperation::FinalizeRun,
                });
            }
            RunState::Finished(report) => return Ok(report.clone()),
            RunState::Running(running) => running,
        };

        if running.counts.sum() == 0 {
            return Err(RunStateError::NoTestsRecorded);
        }

        let snapshot = running.stopwatch.snapshot();
        let report = RunReport::new(
            snapshot.start_time.naive_local(),
            snapshot.duration,
            running.counts,
            std::mem::take(&mut running.extra),
        );
        debug!(
            sum = report.sum(),
            duration = ?report.duration(),
            "run finalized"
        );
        self.state = RunState::Finished(report.clone());
        Ok(report)
    }

    /// Returns an error unless the run is in progress.
    pub(crate) fn check_running(&self, operation: RunOperation) -> Result<(), RunStateError> {
        match &self.state {
            RunState::Running(_) => Ok(()),
            RunState::NotStarted => Err(RunStateError::NotStarted { operation }),
            RunState::Finished(_) => Err(RunStateError::AlreadyFinished { operation }),
        }
    }

    fn running_mut(&mut self, operation: RunOperation) -> Result<&mut RunningState, RunStateError> {
        match &mut self.state {
            RunState::Running(running) => Ok(running),
            RunState::NotStarted => Err(RunStateError::NotStarted { operation }),
            RunState::Finished(_) => Err(RunStateError::AlreadyFinished { operation }),
        }
    }
}
