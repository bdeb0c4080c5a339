// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JSON verdict document produced at the end of a run.

use crate::{
    errors::{ReportParseError, WriteReportError},
    outcome::OutcomeKind,
};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::Utf8Path;
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{
    io::{self, Write},
    time::Duration,
};

/// The format of the `start` field: `DD.MM.YYYY HH:MM:SS`, in local time.
pub const START_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Caller-supplied annotations: section name, then node name, then value.
pub type ExtraMap = IndexMap<String, IndexMap<String, String>>;

/// Per-kind outcome counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutcomeCounts {
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed.
    pub failed: usize,
    /// Tests that were expected to fail, but passed.
    pub xpassed: usize,
    /// Tests that were expected to fail, and did.
    pub xfailed: usize,
    /// Tests that errored outside the normal pass/fail report.
    pub errors: usize,
}

impl OutcomeCounts {
    /// Returns the counter for `kind`.
    pub fn get(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Passed => self.passed,
            OutcomeKind::Failed => self.failed,
            OutcomeKind::XPassed => self.xpassed,
            OutcomeKind::XFailed => self.xfailed,
            OutcomeKind::Errors => self.errors,
        }
    }

    /// Increments the counter for `kind` by one.
    pub fn add(&mut self, kind: OutcomeKind) {
        let counter = match kind {
            OutcomeKind::Passed => &mut self.passed,
            OutcomeKind::Failed => &mut self.failed,
            OutcomeKind::XPassed => &mut self.xpassed,
            OutcomeKind::XFailed => &mut self.xfailed,
            OutcomeKind::Errors => &mut self.errors,
        };
        *counter += 1;
    }

    /// Returns the sum of all five counters.
    pub fn sum(&self) -> usize {
        OutcomeKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}

/// The final artifact of a run.
///
/// A `RunReport` is produced by
/// [`RunAggregator::finalize_run`](crate::aggregator::RunAggregator::finalize_run) and is
/// immutable afterwards. `sum` is always derived from the counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RunReportRaw")]
pub struct RunReport {
    #[serde(with = "start_format")]
    start: NaiveDateTime,
    #[serde(with = "duration_secs")]
    duration: Duration,
    #[serde(flatten)]
    counts: OutcomeCounts,
    // Reserved: never populated.
    rerun: Option<usize>,
    sum: usize,
    extra: ExtraMap,
}

impl RunReport {
    pub(crate) fn new(
        start: NaiveDateTime,
        duration: Duration,
        counts: OutcomeCounts,
        extra: ExtraMap,
    ) -> Self {
        Self {
            start,
            duration,
            counts,
            rerun: None,
            sum: counts.sum(),
            extra,
        }
    }

    /// The local wall-clock time at which the run began.
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// The time elapsed between the start and the end of the run.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The outcome counters.
    pub fn counts(&self) -> &OutcomeCounts {
        &self.counts
    }

    /// The total number of recorded outcomes.
    pub fn sum(&self) -> usize {
        self.sum
    }

    /// The rerun count. Always `None`: the field is reserved.
    pub fn rerun(&self) -> Option<usize> {
        self.rerun
    }

    /// Caller-supplied annotations.
    pub fn extra(&self) -> &ExtraMap {
        &self.extra
    }

    /// Serializes this report as JSON to the given writer.
    pub fn write_json(&self, writer: impl io::Write) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    /// Serializes this report to a JSON string.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Writes this report to `path`, creating the parent directory if necessary.
    ///
    /// The file is replaced atomically.
    pub fn write_to_path(&self, path: &Utf8Path) -> Result<(), WriteReportError> {
        let bytes = serde_json::to_vec(self).map_err(|error| WriteReportError::Serialize {
            file: path.to_owned(),
            error,
        })?;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|error| WriteReportError::Fs {
                file: dir.to_owned(),
                error,
            })?;
        }

        AtomicFile::new(path, AllowOverwrite)
            .write(|file| file.write_all(&bytes))
            .map_err(|error| WriteReportError::AtomicWrite {
                file: path.to_owned(),
                error,
            })
    }
}

#[derive(Deserialize)]
struct RunReportRaw {
    #[serde(with = "start_format")]
    start: NaiveDateTime,
    #[serde(with = "duration_secs")]
    duration: Duration,
    #[serde(flatten)]
    counts: OutcomeCounts,
    #[serde(default)]
    rerun: Option<usize>,
    sum: usize,
    #[serde(default)]
    extra: ExtraMap,
}

impl TryFrom<RunReportRaw> for RunReport {
    type Error = ReportParseError;

    fn try_from(raw: RunReportRaw) -> Result<Self, Self::Error> {
        let expected = raw.counts.sum();
        if raw.sum != expected {
            return Err(ReportParseError {
                sum: raw.sum,
                expected,
            });
        }
        Ok(Self {
            start: raw.start,
            duration: raw.duration,
            counts: raw.counts,
            rerun: raw.rerun,
            sum: raw.sum,
            extra: raw.extra,
        })
    }
}

mod start_format {
    use super::START_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(
        start: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&start.format(START_FORMAT))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, START_FORMAT).map_err(D::Error::custom)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
