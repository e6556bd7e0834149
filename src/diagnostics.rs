//! Unified, `miette`-based error type for the harness.
//!
//! Two kinds of failure flow through [`HarnessError`]:
//!
//! - **Fatal** errors stop the whole run: the compiler cannot be launched, the
//!   test tree cannot be walked, or the configuration is unusable.
//! - **Per-test** errors (a capture that cannot be written, an expectation file
//!   that cannot be read, a failed wait on the child) are folded into the
//!   affected test's outcome and the run continues.
//!
//! [`HarnessError::is_fatal`] is the single place that draws this line.

use std::{io, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Shorthand result type used throughout the crate.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Type-safe classification of [`HarnessError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The compiler executable could not be started.
    Launch,
    /// Waiting on or reading from a running compiler failed.
    Wait,
    /// The test tree could not be walked.
    Discovery,
    /// A capture or expectation file could not be read or written.
    Io,
    /// The configuration file or flags are unusable.
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Launch => "launch",
            ErrorKind::Wait => "wait",
            ErrorKind::Discovery => "discovery",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to launch compiler `{}`", .compiler.display())]
    Launch {
        compiler: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed while waiting for the compiler on `{}`", .test.display())]
    Wait {
        test: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk test directory `{}`", .root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write `{}`", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file `{}`", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl HarnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Launch { .. } => ErrorKind::Launch,
            HarnessError::Wait { .. } => ErrorKind::Wait,
            HarnessError::Discovery { .. } => ErrorKind::Discovery,
            HarnessError::Read { .. } | HarnessError::Write { .. } => ErrorKind::Io,
            HarnessError::ConfigParse { .. } | HarnessError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Returns true if this error must abort the whole run rather than a single test.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Launch | ErrorKind::Discovery | ErrorKind::Config
        )
    }

    /// Renders the error together with its source chain on one line.
    pub fn describe(&self) -> String {
        let mut text = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("qlow_test::{}", self.kind())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let help = match self {
            HarnessError::Launch { .. } => {
                "check that the compiler path exists and is executable"
            }
            HarnessError::Discovery { .. } => "check that the test root exists and is readable",
            HarnessError::ConfigParse { .. } => {
                "known keys are root, test_suffix, capture_suffix, expect_suffix, object_suffix, timeout_secs, show_diff and color"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}
