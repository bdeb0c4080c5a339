// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for jsonverdict: classify the phase results of a test run into outcome
//! kinds, aggregate them, and write a single JSON verdict document at the end of the run.
//!
//! The flow is:
//!
//! 1. A host adapter creates a [`JsonVerdictReporter`] and calls
//!    [`on_run_started`](JsonVerdictReporter::on_run_started).
//! 2. For every phase of every test, it calls
//!    [`on_test_phase_result`](JsonVerdictReporter::on_test_phase_result). Each phase is
//!    classified with [`outcome::classify`], and each test is counted once in a
//!    [`RunAggregator`].
//! 3. At the end it calls [`on_run_finished`](JsonVerdictReporter::on_run_finished), which
//!    produces a [`RunReport`] and writes it to disk.

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod events;
pub mod host;
pub mod outcome;
pub mod report;
mod reporter;
mod stopwatch;

pub use aggregator::RunAggregator;
pub use report::RunReport;
pub use reporter::JsonVerdictReporter;
