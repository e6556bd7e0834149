//! Per-test outcomes and the run tally folded from them.

use std::{fmt, time::Duration};

use crate::compare::Comparison;

/// How a single test ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The capture matched the expectation line for line.
    Passed,
    /// The capture differed from the expectation.
    Failed(Comparison),
    /// The compiler exceeded the configured limit and was killed.
    TimedOut { limit: Duration },
    /// A per-test file or process error kept the comparison from running.
    Errored { reason: String },
}

impl TestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "ok",
            TestOutcome::Failed(_) => "FAILED",
            TestOutcome::TimedOut { .. } => "TIMEOUT",
            TestOutcome::Errored { .. } => "ERROR",
        }
    }
}

/// Succeeded and failed counts for one harness run.
///
/// Timed-out and errored tests count as failures; they are also broken out
/// so the report can say why.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub errored: usize,
}

impl RunTally {
    /// Returns a new tally with `outcome` counted.
    #[must_use]
    pub fn record(self, outcome: &TestOutcome) -> Self {
        match outcome {
            TestOutcome::Passed => Self {
                succeeded: self.succeeded + 1,
                ..self
            },
            TestOutcome::Failed(_) => Self {
                failed: self.failed + 1,
                ..self
            },
            TestOutcome::TimedOut { .. } => Self {
                failed: self.failed + 1,
                timed_out: self.timed_out + 1,
                ..self
            },
            TestOutcome::Errored { .. } => Self {
                failed: self.failed + 1,
                errored: self.errored + 1,
                ..self
            },
        }
    }

    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a TestOutcome>,
    {
        outcomes.into_iter().fold(Self::default(), Self::record)
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Integer percentage of succeeded tests, rounded down. `None` when nothing ran.
    pub fn percentage(&self) -> Option<usize> {
        match self.total() {
            0 => None,
            total => Some(100 * self.succeeded / total),
        }
    }

    pub fn summary(&self) -> Summary {
        match self.percentage() {
            None => Summary::NoTests,
            Some(percentage) => Summary::Ran {
                succeeded: self.succeeded,
                total: self.total(),
                percentage,
            },
        }
    }
}

/// The closing line of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    NoTests,
    Ran {
        succeeded: usize,
        total: usize,
        percentage: usize,
    },
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::NoTests => write!(f, "no tests found"),
            Summary::Ran {
                succeeded,
                total,
                percentage,
            } => write!(
                f,
                "{succeeded} out of {total} tests succeeded: {percentage}%"
            ),
        }
    }
}
