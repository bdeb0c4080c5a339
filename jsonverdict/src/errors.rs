// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use jsonverdict_reporter::errors::{
    ConfigError, HostEventError, RunStateError, WriteReportError,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `jsonverdict`.
pub enum VerdictExitCode {}

impl VerdictExitCode {
    /// The report was written.
    pub const OK: i32 = 0;

    /// The report destination or the event source could not be set up.
    pub const SETUP_ERROR: i32 = 96;

    /// The event stream ended before `run-finished`. No report was written.
    pub const INCOMPLETE_RUN: i32 = 106;

    /// The event stream could not be read, or its events were out of order.
    pub const INVALID_EVENTS: i32 = 107;

    /// The report could not be written to its destination.
    pub const WRITE_REPORT_FAILED: i32 = 108;

    /// Writing to stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// The #[error()] strings are placeholders: errors are printed with display_to_stderr, which
// colorizes them and prints the chain of causes.

/// An error that is expected to happen while replaying an event stream.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config error")]
    Config {
        #[from]
        error: ConfigError,
    },
    #[error("failed to open events file")]
    EventsOpen {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid host event")]
    HostEvent {
        #[from]
        error: HostEventError,
    },
    #[error("event out of order")]
    RunState {
        line_number: usize,
        #[source]
        error: RunStateError,
    },
    #[error("event after run-finished")]
    EventAfterFinish { line_number: usize },
    #[error("incomplete run")]
    IncompleteRun,
    #[error("failed to write report")]
    WriteReport {
        #[source]
        error: WriteReportError,
    },
    #[error("failed to write output")]
    WriteOutput {
        #[source]
        error: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::EventsOpen { .. } => VerdictExitCode::SETUP_ERROR,
            Self::HostEvent { .. } | Self::RunState { .. } | Self::EventAfterFinish { .. } => {
                VerdictExitCode::INVALID_EVENTS
            }
            Self::IncompleteRun => VerdictExitCode::INCOMPLETE_RUN,
            Self::WriteReport { .. } => VerdictExitCode::WRITE_REPORT_FAILED,
            Self::WriteOutput { .. } => VerdictExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::Config { error } => {
                // The config error's own message is the most useful heading.
                error!("{error}");
                error.source()
            }
            Self::EventsOpen { path, error } => {
                error!("failed to open events file `{}`", path.style(styles.bold));
                Some(error as &dyn Error)
            }
            Self::HostEvent { error } => {
                error!("invalid host event stream");
                Some(error as &dyn Error)
            }
            Self::RunState { line_number, error } => {
                error!("host event on line {line_number} is out of order");
                Some(error as &dyn Error)
            }
            Self::EventAfterFinish { line_number } => {
                error!("host event on line {line_number} arrived after `run-finished`");
                None
            }
            Self::IncompleteRun => {
                error!(
                    "event stream ended without `run-finished`: the run was aborted and no report \
                     was written"
                );
                None
            }
            Self::WriteReport { error } => {
                error!("failed to write JSON report");
                Some(error as &dyn Error)
            }
            Self::WriteOutput { error } => {
                error!("failed to write to stderr");
                Some(error as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
