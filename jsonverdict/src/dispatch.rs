// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result, VerdictExitCode},
    output::{OutputContext, OutputOpts, OutputWriter, write_generated_line},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use jsonverdict_reporter::{
    JsonVerdictReporter, RunReport,
    config::ReportConfig,
    errors::{HostEventError, ReporterError},
    host::{HostEvent, HostEventReader},
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
};
use tracing::debug;

/// Write a JSON verdict report from a recorded stream of test results.
///
/// Reads host events (one JSON object per line), classifies every test, and writes the report
/// when the `run-finished` event arrives.
#[derive(Debug, Parser)]
#[command(version, max_term_width = 100)]
pub struct JsonVerdictApp {
    /// Path to write the JSON report to
    ///
    /// Environment variables (`$VAR`, `${VAR}`) and a leading `~` are expanded. Overrides
    /// `report.path` in the config file.
    #[arg(long = "json", value_name = "PATH", env = "JSONVERDICT_PATH")]
    json_path: Option<String>,

    /// Config file to read the report path from
    #[arg(long, value_name = "PATH", env = "JSONVERDICT_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// File with recorded host events, or `-` for standard input
    #[arg(value_name = "EVENTS", default_value = "-")]
    events: Utf8PathBuf,

    #[command(flatten)]
    output: OutputOpts,
}

impl JsonVerdictApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code on success.
    pub fn exec(&self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = ReportConfig::resolve(self.json_path.as_deref(), self.config.as_deref())?;
        debug!("writing report to {}", config.path());

        let events = open_events(&self.events)?;
        let mut reporter = JsonVerdictReporter::new(&config);
        let report = replay(&mut reporter, HostEventReader::new(events))?;
        debug!(sum = report.sum(), "replayed run");

        write_generated_line(
            reporter.path(),
            &output.stderr_styles(),
            output_writer.stderr_writer(),
        )
        .map_err(|error| ExpectedError::WriteOutput { error })?;

        Ok(VerdictExitCode::OK)
    }
}

fn open_events(path: &Utf8Path) -> Result<Box<dyn BufRead>> {
    if path.as_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }

    let file = File::open(path).map_err(|error| ExpectedError::EventsOpen {
        path: path.to_owned(),
        error,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Drives `reporter` with `events`, returning the report written on `run-finished`.
///
/// The report is written as soon as `run-finished` arrives. Any event after that is an error, as
/// is a stream that ends without `run-finished`.
pub(crate) fn replay<I>(reporter: &mut JsonVerdictReporter, events: I) -> Result<RunReport>
where
    I: IntoIterator<Item = Result<(usize, HostEvent), HostEventError>>,
{
    let mut report = None;

    for event in events {
        let (line_number, event) = event?;
        if report.is_some() {
            return Err(ExpectedError::EventAfterFinish { line_number });
        }

        match event {
            HostEvent::RunStarted => reporter
                .on_run_started()
                .map_err(|error| ExpectedError::RunState { line_number, error })?,
            HostEvent::RunFinished => {
                let finished = reporter.on_run_finished().map_err(|error| match error {
                    ReporterError::RunState(error) => {
                        ExpectedError::RunState { line_number, error }
                    }
                    ReporterError::Write(error) => ExpectedError::WriteReport { error },
                })?;
                report = Some(finished);
            }
            event @ HostEvent::PhaseResult { .. } => {
                if let Some(phase_event) = event.into_phase_event() {
                    reporter
                        .on_test_phase_result(phase_event)
                        .map_err(|error| ExpectedError::RunState { line_number, error })?;
                }
            }
        }
    }

    report.ok_or(ExpectedError::IncompleteRun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use jsonverdict_reporter::errors::RunStateError;

    fn replay_str(dir: &Utf8TempDir, input: &str) -> (JsonVerdictReporter, Result<RunReport>) {
        let config = ReportConfig::new(dir.path().join("report.json"));
        let mut reporter = JsonVerdictReporter::new(&config);
        let result = replay(&mut reporter, HostEventReader::new(input.as_bytes()));
        (reporter, result)
    }

    #[test]
    fn replay_writes_report() {
        let dir = Utf8TempDir::new().unwrap();
        let (reporter, result) = replay_str(
            &dir,
            indoc! {r#"
                {"type": "run-started"}
                {"type": "phase-result", "test-id": "a", "phase": "setup", "signal": "passed"}
                {"type": "phase-result", "test-id": "a", "phase": "call", "signal": "failed"}
                {"type": "phase-result", "test-id": "a", "phase": "teardown", "signal": "passed"}
                {"type": "phase-result", "test-id": "b", "phase": "setup", "signal": "skipped", "expected-failure": true}
                {"type": "phase-result", "test-id": "b", "phase": "teardown", "signal": "passed"}
                {"type": "run-finished"}
            "#},
        );

        let report = result.unwrap();
        assert_eq!(report.counts().failed, 1);
        assert_eq!(report.counts().xfailed, 1);
        assert_eq!(report.sum(), 2);
        assert!(reporter.path().exists());
    }

    #[test]
    fn incomplete_run_writes_nothing() {
        let dir = Utf8TempDir::new().unwrap();
        let (reporter, result) = replay_str(
            &dir,
            indoc! {r#"
                {"type": "run-started"}
                {"type": "phase-result", "test-id": "a", "phase": "call", "signal": "passed"}
            "#},
        );

        let error = result.unwrap_err();
        assert!(
            matches!(error, ExpectedError::IncompleteRun),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), VerdictExitCode::INCOMPLETE_RUN);
        assert!(!reporter.path().exists());
    }

    #[test]
    fn event_after_finish() {
        let dir = Utf8TempDir::new().unwrap();
        let (_, result) = replay_str(
            &dir,
            indoc! {r#"
                {"type": "run-started"}
                {"type": "phase-result", "test-id": "a", "phase": "call", "signal": "passed"}
                {"type": "run-finished"}
                {"type": "run-started"}
            "#},
        );

        let error = result.unwrap_err();
        assert!(
            matches!(error, ExpectedError::EventAfterFinish { line_number: 4 }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), VerdictExitCode::INVALID_EVENTS);
    }

    #[test]
    fn phase_before_run_started() {
        let dir = Utf8TempDir::new().unwrap();
        let (_, result) = replay_str(
            &dir,
            r#"{"type": "phase-result", "test-id": "a", "phase": "setup", "signal": "passed"}"#,
        );

        let error = result.unwrap_err();
        assert!(
            matches!(
                error,
                ExpectedError::RunState {
                    line_number: 1,
                    error: RunStateError::NotStarted { .. },
                }
            ),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn empty_run_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let (reporter, result) = replay_str(
            &dir,
            indoc! {r#"
                {"type": "run-started"}
                {"type": "run-finished"}
            "#},
        );

        let error = result.unwrap_err();
        assert!(
            matches!(
                error,
                ExpectedError::RunState {
                    line_number: 2,
                    error: RunStateError::NoTestsRecorded,
                }
            ),
            "unexpected error: {error:?}"
        );
        assert!(!reporter.path().exists());
    }

    #[test]
    fn malformed_line() {
        let dir = Utf8TempDir::new().unwrap();
        let (_, result) = replay_str(&dir, "{\"type\": \"run-started\"}\nnot json\n");

        let error = result.unwrap_err();
        assert!(
            matches!(
                error,
                ExpectedError::HostEvent {
                    error: HostEventError::Parse { line_number: 2, .. }
                }
            ),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn exec_prints_summary_line() {
        let dir = Utf8TempDir::new().unwrap();
        let events = dir.path().join("events.jsonl");
        std::fs::write(
            &events,
            indoc! {r#"
                {"type": "run-started"}
                {"type": "phase-result", "test-id": "a", "phase": "call", "signal": "passed"}
                {"type": "phase-result", "test-id": "a", "phase": "teardown", "signal": "passed"}
                {"type": "run-finished"}
            "#},
        )
        .unwrap();
        let report_path = dir.path().join("nested/report.json");

        let app = JsonVerdictApp::try_parse_from([
            "jsonverdict",
            "--color",
            "never",
            "--json",
            report_path.as_str(),
            events.as_str(),
        ])
        .unwrap();
        let output = app.init_output();
        let mut writer = OutputWriter::Test { stderr: Vec::new() };
        let code = app.exec(output, &mut writer).unwrap();
        assert_eq!(code, VerdictExitCode::OK);

        let OutputWriter::Test { stderr } = writer else {
            panic!("writer is a test writer");
        };
        let stderr = String::from_utf8(stderr).unwrap();
        assert!(
            stderr.contains(&format!(" generated json file: {report_path} ")),
            "stderr: {stderr}"
        );
        assert!(report_path.exists());
    }

    #[test]
    fn exec_missing_events_file() {
        let dir = Utf8TempDir::new().unwrap();
        let report_path = dir.path().join("report.json");
        let app = JsonVerdictApp::try_parse_from([
            "jsonverdict",
            "--color",
            "never",
            "--json",
            report_path.as_str(),
            dir.path().join("missing.jsonl").as_str(),
        ])
        .unwrap();
        let output = app.init_output();

        let error = app.exec(output, &mut OutputWriter::default()).unwrap_err();
        assert!(
            matches!(error, ExpectedError::EventsOpen { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(error.process_exit_code(), VerdictExitCode::SETUP_ERROR);
    }
}
