//! qlow Test Harness Library Module
//!
//! Drives the compiler over every discovered test program and compares what
//! it prints against the test's expectation file.
//!
//! # Architecture
//!
//! One linear pass per test, in sorted path order:
//! 1. **Discovery**: find every file ending with the test suffix under the root
//! 2. **Invocation**: run `<compiler> <test> -o <test>.o`, capturing stdout
//! 3. **Capture**: write stdout verbatim to `<test>.c.did`
//! 4. **Comparison**: read back `<test>.c.did` and `<test>.c.should` and compare them line by line
//! 5. **Tally**: fold the outcomes into a [`RunTally`]
//!
//! A failing test never stops the run. Only a fatal [`HarnessError`] does,
//! most notably a compiler that cannot be launched at all.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use qlow_test::config::HarnessConfig;
//! use qlow_test::test_harness::{run_suite, SilentReporter};
//!
//! let config = HarnessConfig::default();
//! let report = run_suite(Path::new("./qlow"), &config, &mut SilentReporter).unwrap();
//! println!("{}", report.tally.summary());
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::compare::compare_files;
use crate::config::HarnessConfig;
use crate::diagnostics::{HarnessError, Result};
use crate::discovery::{TestCase, TestDiscoverer};
use crate::invocation::CompilerInvocation;
use crate::tally::{RunTally, TestOutcome};

// =============================================================================
// CORE TYPES
// =============================================================================

/// The outcome of one test together with the case it belongs to.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub case: TestCase,
    pub outcome: TestOutcome,
    pub elapsed: Duration,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub root: PathBuf,
    pub results: Vec<TestResult>,
    pub tally: RunTally,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.tally.total() > 0 && self.tally.failed == 0
    }
}

/// Receives progress events from [`run_suite`].
///
/// Reporting is kept apart from execution so the console output can be
/// swapped out in tests or embedded callers.
pub trait Reporter {
    /// Called once discovery has found `count` tests.
    fn on_discovery_complete(&mut self, _count: usize) {}

    /// Called right before the compiler is launched for a test.
    fn on_test_start(&mut self, invocation: &CompilerInvocation);

    /// Called when a test's outcome is known.
    fn on_test_complete(&mut self, result: &TestResult);

    /// Called once after the last test.
    fn on_run_complete(&mut self, report: &RunReport);
}

/// A [`Reporter`] that discards every event.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn on_test_start(&mut self, _invocation: &CompilerInvocation) {}
    fn on_test_complete(&mut self, _result: &TestResult) {}
    fn on_run_complete(&mut self, _report: &RunReport) {}
}

// =============================================================================
// TEST EXECUTION
// =============================================================================

/// Runs the full pipeline for a single test.
///
/// Per-test failures become a [`TestOutcome`]; only fatal errors are returned as `Err`.
pub fn run_test_case(
    compiler: &Path,
    case: &TestCase,
    config: &HarnessConfig,
    reporter: &mut dyn Reporter,
) -> Result<TestResult> {
    let invocation = CompilerInvocation::new(compiler, case);
    reporter.on_test_start(&invocation);

    let timeout = config.timeout();
    let (outcome, elapsed) = match invocation.run(timeout) {
        Ok(capture) => {
            let outcome = match (capture.timed_out, timeout) {
                (true, Some(limit)) => {
                    write_capture(case, &capture.stdout)
                        .err()
                        .map_or(TestOutcome::TimedOut { limit }, errored)
                }
                _ => write_capture(case, &capture.stdout)
                    .and_then(|()| compare_files(&case.capture, &case.expectation))
                    .map_or_else(errored, |comparison| {
                        if comparison.is_match() {
                            TestOutcome::Passed
                        } else {
                            TestOutcome::Failed(comparison)
                        }
                    }),
            };
            (outcome, capture.elapsed)
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => (errored(e), Duration::ZERO),
    };

    tracing::debug!(
        test = %case.path.display(),
        outcome = outcome.label(),
        elapsed_ms = elapsed.as_millis(),
        "test finished"
    );

    let result = TestResult {
        case: case.clone(),
        outcome,
        elapsed,
    };
    reporter.on_test_complete(&result);
    Ok(result)
}

/// Discovers and runs every test under `config.root`.
#[tracing::instrument(skip_all, fields(compiler = %compiler.display(), root = %config.root.display()))]
pub fn run_suite(
    compiler: &Path,
    config: &HarnessConfig,
    reporter: &mut dyn Reporter,
) -> Result<RunReport> {
    config.validate()?;
    let cases = TestDiscoverer::discover(config)?;
    reporter.on_discovery_complete(cases.len());

    let mut results = Vec::with_capacity(cases.len());
    for case in &cases {
        results.push(run_test_case(compiler, case, config, reporter)?);
    }

    let tally = RunTally::from_outcomes(results.iter().map(|r| &r.outcome));
    let report = RunReport {
        root: config.root.clone(),
        results,
        tally,
    };
    reporter.on_run_complete(&report);
    Ok(report)
}

// =============================================================================
// HELPERS
// =============================================================================

fn write_capture(case: &TestCase, stdout: &str) -> Result<()> {
    fs::write(&case.capture, stdout).map_err(|source| HarnessError::Write {
        path: case.capture.clone(),
        source,
    })
}

fn errored(err: HarnessError) -> TestOutcome {
    tracing::debug!(error = %err.describe(), "test errored");
    TestOutcome::Errored {
        reason: err.describe(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::compare::Comparison;
    use tempfile::{tempdir, TempDir};

    // `/bin/sh` stands in for the compiler: each test program is a script whose
    // stdout plays the role of the compiler's output.
    const SH: &str = "/bin/sh";

    #[derive(Default)]
    struct RecordingReporter {
        discovered: Option<usize>,
        started: Vec<String>,
        completed: Vec<&'static str>,
        finished: bool,
    }

    impl Reporter for RecordingReporter {
        fn on_discovery_complete(&mut self, count: usize) {
            self.discovered = Some(count);
        }
        fn on_test_start(&mut self, invocation: &CompilerInvocation) {
            self.started.push(invocation.to_string());
        }
        fn on_test_complete(&mut self, result: &TestResult) {
            self.completed.push(result.outcome.label());
        }
        fn on_run_complete(&mut self, _report: &RunReport) {
            self.finished = true;
        }
    }

    fn add_test(dir: &TempDir, name: &str, script: &str, expected: Option<&str>) {
        let path = dir.path().join(name);
        fs::write(&path, script).unwrap();
        if let Some(expected) = expected {
            fs::write(format!("{}.c.should", path.display()), expected).unwrap();
        }
    }

    fn config_for(dir: &TempDir) -> HarnessConfig {
        HarnessConfig {
            root: dir.path().to_path_buf(),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn matching_output_passes_and_writes_the_capture() {
        let dir = tempdir().unwrap();
        add_test(&dir, "a.qlw", "echo hello\n", Some("hello\n"));

        let report = run_suite(Path::new(SH), &config_for(&dir), &mut SilentReporter).unwrap();
        assert_eq!(report.tally.summary().to_string(), "1 out of 1 tests succeeded: 100%");
        let capture = fs::read_to_string(dir.path().join("a.qlw.c.did")).unwrap();
        assert_eq!(capture, "hello\n");
        assert!(report.all_succeeded());
    }

    #[test]
    fn extra_expected_line_fails() {
        let dir = tempdir().unwrap();
        add_test(&dir, "b.qlw", "echo hello\n", Some("hello\nworld\n"));

        let report = run_suite(Path::new(SH), &config_for(&dir), &mut SilentReporter).unwrap();
        assert_eq!(report.tally.summary().to_string(), "0 out of 1 tests succeeded: 0%");
        assert!(matches!(
            report.results[0].outcome,
            TestOutcome::Failed(Comparison::Mismatch { .. })
        ));
    }

    #[test]
    fn one_of_two_is_fifty_percent_in_sorted_order() {
        let dir = tempdir().unwrap();
        add_test(&dir, "z.qlw", "echo wrong\n", Some("right\n"));
        add_test(&dir, "a.qlw", "echo same\n", Some("same\n"));

        let mut reporter = RecordingReporter::default();
        let report = run_suite(Path::new(SH), &config_for(&dir), &mut reporter).unwrap();
        assert_eq!(report.tally.summary().to_string(), "1 out of 2 tests succeeded: 50%");
        assert_eq!(reporter.discovered, Some(2));
        assert_eq!(reporter.completed, vec!["ok", "FAILED"]);
        assert!(reporter.started[0].contains("a.qlw -o"));
        assert!(reporter.finished);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn missing_expectation_is_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        add_test(&dir, "orphan.qlw", "echo alone\n", None);
        add_test(&dir, "paired.qlw", "echo ok\n", Some("ok\n"));

        let report = run_suite(Path::new(SH), &config_for(&dir), &mut SilentReporter).unwrap();
        assert_eq!(report.tally.succeeded, 1);
        assert_eq!(report.tally.errored, 1);
        match &report.results[0].outcome {
            TestOutcome::Errored { reason } => assert!(reason.contains("orphan.qlw.c.should")),
            other => panic!("expected an errored outcome, got {other:?}"),
        }
    }

    #[test]
    fn unlaunchable_compiler_aborts_the_suite() {
        let dir = tempdir().unwrap();
        add_test(&dir, "a.qlw", "echo hello\n", Some("hello\n"));
        let compiler = dir.path().join("missing-qlow");

        let mut reporter = RecordingReporter::default();
        let err = run_suite(&compiler, &config_for(&dir), &mut reporter).unwrap_err();
        assert!(matches!(err, HarnessError::Launch { .. }));
        assert!(!reporter.finished);
    }

    #[test]
    fn empty_tree_reports_no_tests() {
        let dir = tempdir().unwrap();
        let report = run_suite(Path::new(SH), &config_for(&dir), &mut SilentReporter).unwrap();
        assert_eq!(report.tally.total(), 0);
        assert_eq!(report.tally.percentage(), None);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn timeout_is_a_distinct_failing_outcome() {
        let dir = tempdir().unwrap();
        add_test(&dir, "hang.qlw", "exec sleep 5\n", Some(""));
        let config = HarnessConfig {
            timeout_secs: Some(1),
            ..config_for(&dir)
        };

        let report = run_suite(Path::new(SH), &config, &mut SilentReporter).unwrap();
        assert_eq!(report.tally.timed_out, 1);
        assert_eq!(report.tally.failed, 1);
        assert_eq!(
            report.results[0].outcome,
            TestOutcome::TimedOut {
                limit: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn rerunning_is_idempotent() {
        let dir = tempdir().unwrap();
        add_test(&dir, "a.qlw", "echo one\necho two\n", Some("one\ntwo\n"));
        add_test(&dir, "b.qlw", "echo three\n", Some("four\n"));
        let config = config_for(&dir);

        let first = run_suite(Path::new(SH), &config, &mut SilentReporter).unwrap();
        let capture_a = fs::read(dir.path().join("a.qlw.c.did")).unwrap();
        let capture_b = fs::read(dir.path().join("b.qlw.c.did")).unwrap();

        let second = run_suite(Path::new(SH), &config, &mut SilentReporter).unwrap();
        assert_eq!(first.tally, second.tally);
        assert_eq!(fs::read(dir.path().join("a.qlw.c.did")).unwrap(), capture_a);
        assert_eq!(fs::read(dir.path().join("b.qlw.c.did")).unwrap(), capture_b);
    }

    #[test]
    fn invalid_utf8_output_is_captured_and_compared() {
        let dir = tempdir().unwrap();
        add_test(&dir, "bytes.qlw", "printf 'ok\\377\\n'\n", None);
        fs::write(dir.path().join("bytes.qlw.c.should"), b"ok\xff\n").unwrap();
        add_test(&dir, "other.qlw", "printf 'no\\376\\n'\n", None);
        fs::write(dir.path().join("other.qlw.c.should"), b"ok\xff\n").unwrap();

        let report = run_suite(Path::new(SH), &config_for(&dir), &mut SilentReporter).unwrap();
        assert_eq!(report.tally.errored, 0);
        assert_eq!(report.results[0].outcome, TestOutcome::Passed);
        assert!(matches!(report.results[1].outcome, TestOutcome::Failed(_)));
        assert_eq!(
            fs::read_to_string(dir.path().join("bytes.qlw.c.did")).unwrap(),
            "ok\u{FFFD}\n"
        );
    }

    #[test]
    fn stale_capture_is_overwritten() {
        let dir = tempdir().unwrap();
        add_test(&dir, "a.qlw", "echo fresh\n", Some("fresh\n"));
        fs::write(dir.path().join("a.qlw.c.did"), "stale\nstale\n").unwrap();

        let report = run_suite(Path::new(SH), &config_for(&dir), &mut SilentReporter).unwrap();
        assert_eq!(report.tally.succeeded, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("a.qlw.c.did")).unwrap(),
            "fresh\n"
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_discovery() {
        let dir = tempdir().unwrap();
        let config = HarnessConfig {
            expect_suffix: ".c.did".to_string(),
            ..config_for(&dir)
        };
        let err = run_suite(Path::new(SH), &config, &mut SilentReporter).unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
    }
}
