// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by jsonverdict.

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// An operation on a [`RunAggregator`](crate::aggregator::RunAggregator).
///
/// Used to describe which call violated the run lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunOperation {
    /// [`RunAggregator::begin_run`](crate::aggregator::RunAggregator::begin_run).
    BeginRun,

    /// [`RunAggregator::record_outcome`](crate::aggregator::RunAggregator::record_outcome).
    RecordOutcome,

    /// [`RunAggregator::record_extra`](crate::aggregator::RunAggregator::record_extra).
    RecordExtra,

    /// [`RunAggregator::finalize_run`](crate::aggregator::RunAggregator::finalize_run).
    FinalizeRun,

    /// [`JsonVerdictReporter::on_test_phase_result`](crate::JsonVerdictReporter::on_test_phase_result).
    TestPhaseResult,
}

impl fmt::Display for RunOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOperation::BeginRun => write!(f, "begin_run"),
            RunOperation::RecordOutcome => write!(f, "record_outcome"),
            RunOperation::RecordExtra => write!(f, "record_extra"),
            RunOperation::FinalizeRun => write!(f, "finalize_run"),
            RunOperation::TestPhaseResult => write!(f, "on_test_phase_result"),
        }
    }
}

/// The run lifecycle (`begin_run`, then `record_*`, then `finalize_run`) was not followed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunStateError {
    /// An operation was called before the run began.
    #[error("{operation} called before begin_run")]
    NotStarted {
        /// The operation that was called.
        operation: RunOperation,
    },

    /// `begin_run` was called on a run that had already begun.
    #[error("begin_run called more than once")]
    AlreadyStarted,

    /// A mutating operation was called after the run was finalized.
    #[error("{operation} called after finalize_run")]
    AlreadyFinished {
        /// The operation that was called.
        operation: RunOperation,
    },

    /// `finalize_run` was called before any test outcome was recorded.
    #[error("finalize_run called before any test outcome was recorded")]
    NoTestsRecorded,
}

/// An error that occurred while writing a [`RunReport`](crate::report::RunReport) to disk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// The report could not be serialized to JSON.
    #[error("error serializing JSON report for {file}")]
    Serialize {
        /// The destination file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file or directory being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while atomically writing the report.
    #[error("error writing JSON report to {file}")]
    AtomicWrite {
        /// The destination file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<std::io::Error>,
    },
}

/// An error returned when a run is finished.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// The run lifecycle was not followed.
    #[error(transparent)]
    RunState(#[from] RunStateError),

    /// The report could not be written.
    #[error(transparent)]
    Write(#[from] WriteReportError),
}

/// An error that occurred while loading report configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file at `{file}`")]
    Read {
        /// The config file.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config file at `{file}`")]
    Parse {
        /// The config file.
        file: Utf8PathBuf,

        /// The underlying parse error.
        #[source]
        error: toml::de::Error,
    },

    /// No report path was configured.
    #[error("no report path configured (pass --json or set `report.path`)")]
    MissingPath,

    /// The report path was empty after expansion.
    #[error("report path `{raw}` is empty")]
    EmptyPath {
        /// The path as written in the configuration.
        raw: String,
    },

    /// The current directory could not be determined or is not valid UTF-8.
    #[error("unable to resolve relative report path `{path}`")]
    CurrentDir {
        /// The relative path being resolved.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The home directory could not be determined or is not valid UTF-8.
    #[error("unable to expand `~` in report path `{raw}`: home directory unavailable")]
    HomeDir {
        /// The path as written in the configuration.
        raw: String,
    },
}

/// An error that occurred while reading a stream of host events.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostEventError {
    /// A line could not be read.
    #[error("error reading host event on line {line_number}")]
    Read {
        /// The 1-based line number.
        line_number: usize,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// A line could not be parsed as a host event.
    #[error("error parsing host event on line {line_number}")]
    Parse {
        /// The 1-based line number.
        line_number: usize,

        /// The underlying parse error.
        #[source]
        error: serde_json::Error,
    },
}

/// A report read back from JSON had a `sum` that disagreed with its counters.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("report sum is {sum}, but the outcome counters add up to {expected}")]
pub struct ReportParseError {
    pub(crate) sum: usize,
    pub(crate) expected: usize,
}
