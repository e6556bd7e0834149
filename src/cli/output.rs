//! Handles all user-facing output for the CLI.
//!
//! Standard output carries exactly the report: one `running test ...` line per
//! test followed by the summary line. Per-test statuses, failure details and
//! diffs go to standard error so they never interleave with the report.

use std::io::Write;

use difference::Difference;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::config::HarnessConfig;
use crate::invocation::CompilerInvocation;
use crate::tally::{Summary, TestOutcome};
use crate::test_harness::{Reporter, RunReport, TestResult};

// ============================================================================
// CONSOLE REPORTER
// ============================================================================

/// Writes the run report to the terminal, colored when enabled.
pub struct ConsoleReporter {
    stdout: StandardStream,
    stderr: StandardStream,
    show_diff: bool,
}

impl ConsoleReporter {
    pub fn new(config: &HarnessConfig) -> Self {
        Self::with_choices(
            config.color.color_choice(atty::Stream::Stdout),
            config.color.color_choice(atty::Stream::Stderr),
            config.show_diff,
        )
    }

    pub fn with_choices(stdout: ColorChoice, stderr: ColorChoice, show_diff: bool) -> Self {
        Self {
            stdout: StandardStream::stdout(stdout),
            stderr: StandardStream::stderr(stderr),
            show_diff,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_discovery_complete(&mut self, count: usize) {
        tracing::info!(count, "running tests");
    }

    fn on_test_start(&mut self, invocation: &CompilerInvocation) {
        let _ = writeln!(self.stdout, "running test {invocation}");
        let _ = self.stdout.flush();
    }

    fn on_test_complete(&mut self, result: &TestResult) {
        if result.outcome.is_success() {
            return;
        }
        print_failure(&mut self.stderr, result, self.show_diff);
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        if report.tally.failed > 0 {
            let _ = writeln!(self.stderr, "\nFailed tests:");
            for result in report.failures() {
                let _ = writeln!(
                    self.stderr,
                    "  - {} ({})",
                    result.case.path.display(),
                    result.outcome.label()
                );
            }
        }

        match report.tally.summary() {
            Summary::NoTests => {
                let _ = self
                    .stdout
                    .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
                let _ = writeln!(self.stdout, "no tests found under {}", report.root.display());
            }
            summary @ Summary::Ran { .. } => {
                let color = if report.all_succeeded() {
                    Color::Green
                } else {
                    Color::Red
                };
                let _ = self
                    .stdout
                    .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
                let _ = writeln!(self.stdout, "{summary}");
            }
        }
        let _ = self.stdout.reset();
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_failure(stderr: &mut StandardStream, result: &TestResult, show_diff: bool) {
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "{}", result.outcome.label());
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {}", result.case.path.display());

    match &result.outcome {
        TestOutcome::Failed(comparison) => {
            if !show_diff {
                return;
            }
            if let Some(diffs) = comparison.diff() {
                let _ = writeln!(
                    stderr,
                    "  --- {}\n  +++ {}",
                    result.case.expectation.display(),
                    result.case.capture.display()
                );
                print_diff(stderr, &diffs);
            }
        }
        TestOutcome::TimedOut { limit } => {
            let _ = writeln!(stderr, "  compiler killed after {}s", limit.as_secs());
        }
        TestOutcome::Errored { reason } => {
            let _ = writeln!(stderr, "  {reason}");
        }
        TestOutcome::Passed => {}
    }
}

fn print_diff(stderr: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stderr.reset();
                for line in x.lines() {
                    let _ = writeln!(stderr, "   {line}");
                }
            }
            Difference::Add(ref x) => {
                let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                for line in x.lines() {
                    let _ = writeln!(stderr, "  +{line}");
                }
            }
            Difference::Rem(ref x) => {
                let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                for line in x.lines() {
                    let _ = writeln!(stderr, "  -{line}");
                }
            }
        }
    }
    let _ = stderr.reset();
}
