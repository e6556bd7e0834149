//! The qlow-test Command-Line Interface.
//!
//! This module is the main entry point for the harness binary and maps a run
//! onto the process exit status:
//!
//! | status | meaning                                              |
//! |--------|------------------------------------------------------|
//! | 0      | every discovered test succeeded                      |
//! | 1      | at least one test failed, or no tests were found     |
//! | 2      | usage error, bad configuration, or unlaunchable compiler |

use std::process::ExitCode;

use clap::Parser;

use crate::cli::args::HarnessArgs;
use crate::cli::output::ConsoleReporter;
use crate::diagnostics::Result;
use crate::test_harness::{run_suite, RunReport};

pub mod args;
pub mod output;

pub const EXIT_TESTS_FAILED: u8 = 1;
pub const EXIT_HARNESS_ERROR: u8 = 2;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    // clap exits with status 2 and a usage message when the compiler is missing.
    let args = HarnessArgs::parse();

    match execute(&args) {
        Ok(report) => exit_code_for(&report),
        Err(e) => {
            let report = miette::Report::new(e);
            eprintln!("{report:?}");
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

fn execute(args: &HarnessArgs) -> Result<RunReport> {
    let config = args.resolve_config()?;
    let mut reporter = ConsoleReporter::new(&config);
    run_suite(&args.compiler, &config, &mut reporter)
}

/// Maps a finished run onto the process exit status.
pub fn exit_code_for(report: &RunReport) -> ExitCode {
    if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_TESTS_FAILED)
    }
}
