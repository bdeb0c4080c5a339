// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `jsonverdict` command-line tool: replays a recorded stream of host events through
//! [`jsonverdict_reporter`] and writes the JSON verdict report.
//!
//! This crate is not meant to be used as a library. Its API is unstable.

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::JsonVerdictApp;
#[doc(hidden)]
pub use errors::{ExpectedError, VerdictExitCode};
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
