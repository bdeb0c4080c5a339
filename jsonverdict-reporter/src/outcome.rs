// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of raw phase signals into outcome kinds.
//!
//! A single test goes through up to three phases (setup, call and teardown), and the host reports
//! a raw signal for each of them. [`classify`] turns one such signal into an [`OutcomeKind`], and
//! [`OutcomeKind::merge_phase`] folds the per-phase kinds of a test into the single kind that gets
//! counted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three sub-steps of a test's execution lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TestPhase {
    /// Fixtures and other preconditions are being set up.
    Setup,

    /// The test body itself.
    Call,

    /// Fixtures are being torn down. This is the last phase of a test.
    Teardown,
}

impl TestPhase {
    /// Returns the name of this phase as reported by hosts.
    pub fn as_str(self) -> &'static str {
        match self {
            TestPhase::Setup => "setup",
            TestPhase::Call => "call",
            TestPhase::Teardown => "teardown",
        }
    }
}

impl fmt::Display for TestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw signal a host reports for a single phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum PhaseSignal {
    /// The phase completed normally.
    Passed,

    /// The phase reported a failure through the normal pass/fail channel.
    Failed,

    /// The phase was skipped.
    Skipped,

    /// An error was raised outside the normal pass/fail report.
    Error,
}

impl PhaseSignal {
    /// Returns the string used for this signal in the `extra` mapping.
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseSignal::Passed => "passed",
            PhaseSignal::Failed => "failed",
            PhaseSignal::Skipped => "skipped",
            PhaseSignal::Error => "error",
        }
    }

    /// Normalizes a signal reported during `phase`.
    ///
    /// Only the call phase can fail through the normal pass/fail report: a failure reported while
    /// setting up or tearing down a test is an error.
    pub fn normalize_for(self, phase: TestPhase) -> Self {
        match (self, phase) {
            (PhaseSignal::Failed, TestPhase::Setup | TestPhase::Teardown) => PhaseSignal::Error,
            (signal, _) => signal,
        }
    }
}

impl fmt::Display for PhaseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five-way classification of a single test's final result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum OutcomeKind {
    /// The test passed and was not expected to fail.
    Passed,

    /// The test failed and was not expected to fail.
    Failed,

    /// The test was expected to fail, but passed.
    #[serde(rename = "xpassed")]
    XPassed,

    /// The test was expected to fail, and did fail (or was skipped as such).
    #[serde(rename = "xfailed")]
    XFailed,

    /// An error was raised outside the normal pass/fail report.
    Errors,
}

impl OutcomeKind {
    /// All outcome kinds, in the order they appear in a report.
    pub const ALL: [OutcomeKind; 5] = [
        OutcomeKind::Passed,
        OutcomeKind::Failed,
        OutcomeKind::XPassed,
        OutcomeKind::XFailed,
        OutcomeKind::Errors,
    ];

    /// Returns the name of this outcome kind, as used for report keys.
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Passed => "passed",
            OutcomeKind::Failed => "failed",
            OutcomeKind::XPassed => "xpassed",
            OutcomeKind::XFailed => "xfailed",
            OutcomeKind::Errors => "errors",
        }
    }

    /// Folds the classification of a later phase into the one already held for a test.
    ///
    /// The first classification that is not a plain pass wins: a later phase can only replace a
    /// held [`OutcomeKind::Passed`].
    pub fn merge_phase(self, later: OutcomeKind) -> OutcomeKind {
        match self {
            OutcomeKind::Passed => later,
            held => held,
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies the signal of a single phase.
///
/// Rules, in precedence order:
///
/// 1. an error is [`OutcomeKind::Errors`];
/// 2. a skip that was expected to fail is [`OutcomeKind::XFailed`];
/// 3. a failure not expected to fail is [`OutcomeKind::Failed`];
/// 4. a failure expected to fail is [`OutcomeKind::XFailed`];
/// 5. a pass expected to fail is [`OutcomeKind::XPassed`];
/// 6. anything else is [`OutcomeKind::Passed`].
///
/// This is pure: the same inputs always produce the same kind.
pub fn classify(signal: PhaseSignal, expected_failure: bool) -> OutcomeKind {
    match (signal, expected_failure) {
        (PhaseSignal::Error, _) => OutcomeKind::Errors,
        (PhaseSignal::Skipped, true) => OutcomeKind::XFailed,
        (PhaseSignal::Failed, false) => OutcomeKind::Failed,
        (PhaseSignal::Failed, true) => OutcomeKind::XFailed,
        (PhaseSignal::Passed, true) => OutcomeKind::XPassed,
        (PhaseSignal::Passed | PhaseSignal::Skipped, false) => OutcomeKind::Passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case(PhaseSignal::Error, false, OutcomeKind::Errors ; "error")]
    #[test_case(PhaseSignal::Error, true, OutcomeKind::Errors ; "error beats xfail")]
    #[test_case(PhaseSignal::Skipped, true, OutcomeKind::XFailed ; "xfail skip")]
    #[test_case(PhaseSignal::Skipped, false, OutcomeKind::Passed ; "plain skip")]
    #[test_case(PhaseSignal::Failed, false, OutcomeKind::Failed ; "failure")]
    #[test_case(PhaseSignal::Failed, true, OutcomeKind::XFailed ; "expected failure")]
    #[test_case(PhaseSignal::Passed, true, OutcomeKind::XPassed ; "unexpected pass")]
    #[test_case(PhaseSignal::Passed, false, OutcomeKind::Passed ; "pass")]
    fn classify_rule_table(signal: PhaseSignal, expected_failure: bool, expected: OutcomeKind) {
        assert_eq!(classify(signal, expected_failure), expected);
    }

    #[test_case(PhaseSignal::Failed, TestPhase::Setup, PhaseSignal::Error ; "setup failure")]
    #[test_case(PhaseSignal::Failed, TestPhase::Call, PhaseSignal::Failed ; "call failure")]
    #[test_case(PhaseSignal::Failed, TestPhase::Teardown, PhaseSignal::Error ; "teardown failure")]
    #[test_case(PhaseSignal::Skipped, TestPhase::Setup, PhaseSignal::Skipped ; "setup skip")]
    #[test_case(PhaseSignal::Passed, TestPhase::Teardown, PhaseSignal::Passed ; "teardown pass")]
    fn normalize_signal(signal: PhaseSignal, phase: TestPhase, expected: PhaseSignal) {
        assert_eq!(signal.normalize_for(phase), expected);
    }

    #[test]
    fn failing_setup_survives_passing_teardown() {
        let setup = classify(PhaseSignal::Error, false);
        let teardown = classify(PhaseSignal::Passed, false);
        assert_eq!(setup.merge_phase(teardown), OutcomeKind::Errors);
    }

    #[test]
    fn xfail_call_pass_is_xpassed() {
        let kind = [
            classify(PhaseSignal::Passed, true),
            classify(PhaseSignal::Passed, true),
            classify(PhaseSignal::Passed, true),
        ]
        .into_iter()
        .reduce(OutcomeKind::merge_phase);
        assert_eq!(kind, Some(OutcomeKind::XPassed));
    }

    #[test]
    fn outcome_kind_serializes_as_report_key() {
        for kind in OutcomeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[proptest(cases = 64)]
    fn classification_is_one_of_all(signal: PhaseSignal, expected_failure: bool) {
        let kind = classify(signal, expected_failure);
        assert_eq!(
            OutcomeKind::ALL.iter().filter(|k| **k == kind).count(),
            1,
            "{signal} (xfail: {expected_failure}) maps to exactly one kind"
        );
    }

    #[proptest(cases = 64)]
    fn first_non_pass_wins(phases: Vec<(PhaseSignal, bool)>) {
        let kinds: Vec<_> = phases
            .iter()
            .map(|(signal, xfail)| classify(*signal, *xfail))
            .collect();
        let merged = kinds.iter().copied().reduce(OutcomeKind::merge_phase);
        let expected = kinds
            .iter()
            .copied()
            .find(|kind| *kind != OutcomeKind::Passed)
            .or_else(|| kinds.first().copied());
        assert_eq!(merged, expected);
    }
}
