//! Harness configuration.
//!
//! Values come from three layers, later ones winning: [`HarnessConfig::default`],
//! an optional YAML file, and command-line flags. A YAML file may set any
//! subset of keys:
//!
//! ```yaml
//! root: tests
//! test_suffix: .qlw
//! capture_suffix: .c.did
//! expect_suffix: .c.should
//! object_suffix: .o
//! timeout_secs: 10
//! show_diff: true
//! color: never
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use termcolor::ColorChoice;

use crate::diagnostics::{HarnessError, Result};

pub const DEFAULT_TEST_SUFFIX: &str = ".qlw";
pub const DEFAULT_CAPTURE_SUFFIX: &str = ".c.did";
pub const DEFAULT_EXPECT_SUFFIX: &str = ".c.should";
pub const DEFAULT_OBJECT_SUFFIX: &str = ".o";

/// When to emit colored output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color each stream only when it is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves the mode for one output stream.
    pub fn color_choice(self, stream: atty::Stream) -> ColorChoice {
        self.choice_for(atty::is(stream))
    }

    fn choice_for(self, is_terminal: bool) -> ColorChoice {
        match self {
            ColorMode::Auto if is_terminal => ColorChoice::Auto,
            ColorMode::Auto | ColorMode::Never => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
        }
    }
}

/// Configuration for test discovery, execution and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory walked for test programs.
    pub root: PathBuf,
    /// File-name suffix that marks a test program.
    pub test_suffix: String,
    /// Appended to a test path to name the captured compiler output.
    pub capture_suffix: String,
    /// Appended to a test path to name the expected output.
    pub expect_suffix: String,
    /// Appended to a test path to name the compiler's `-o` target.
    pub object_suffix: String,
    /// Per-test limit on the compiler's run time. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    /// Print a line diff for every mismatch.
    pub show_diff: bool,
    pub color: ColorMode,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            test_suffix: DEFAULT_TEST_SUFFIX.to_string(),
            capture_suffix: DEFAULT_CAPTURE_SUFFIX.to_string(),
            expect_suffix: DEFAULT_EXPECT_SUFFIX.to_string(),
            object_suffix: DEFAULT_OBJECT_SUFFIX.to_string(),
            timeout_secs: None,
            show_diff: false,
            color: ColorMode::Auto,
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content).map_err(|source| HarnessError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Rejects configurations that would make discovery or naming ambiguous.
    pub fn validate(&self) -> Result<()> {
        let suffixes = [
            ("test_suffix", &self.test_suffix),
            ("capture_suffix", &self.capture_suffix),
            ("expect_suffix", &self.expect_suffix),
            ("object_suffix", &self.object_suffix),
        ];
        for (name, value) in suffixes {
            if value.is_empty() {
                return Err(HarnessError::Config {
                    message: format!("{name} must not be empty"),
                });
            }
        }
        // A test suffix that the harness's own sibling files also end with
        // would make the next run pick those files up as tests.
        let siblings = [
            ("capture_suffix", &self.capture_suffix),
            ("expect_suffix", &self.expect_suffix),
            ("object_suffix", &self.object_suffix),
        ];
        for (name, value) in siblings {
            if format!("{}{value}", self.test_suffix).ends_with(&self.test_suffix) {
                return Err(HarnessError::Config {
                    message: format!(
                        "test_suffix `{}` also matches files named with {name} `{value}`",
                        self.test_suffix
                    ),
                });
            }
        }
        if self.capture_suffix == self.expect_suffix {
            return Err(HarnessError::Config {
                message: format!(
                    "capture_suffix and expect_suffix are both `{}`; the capture would overwrite the expectation",
                    self.capture_suffix
                ),
            });
        }
        if self.timeout_secs == Some(0) {
            return Err(HarnessError::Config {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
