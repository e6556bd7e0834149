//! Defines the command-line arguments for the harness.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ColorMode, HarnessConfig};
use crate::diagnostics::Result;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "qlow-test",
    version,
    about = "Runs the qlow compiler over every test program in a directory and compares its output with the stored expectations."
)]
pub struct HarnessArgs {
    /// Path to the qlow compiler executable under test.
    #[arg(required = true)]
    pub compiler: PathBuf,

    /// Directory to search for test programs [default: .]
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// File-name suffix that marks a test program [default: .qlw]
    #[arg(short, long, value_name = "EXT")]
    pub suffix: Option<String>,

    /// Kill a compiler run that takes longer than this many seconds.
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// YAML file with harness settings; flags override its values.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print a line diff for every mismatching test.
    #[arg(short, long)]
    pub diff: bool,

    /// When to color the output.
    #[arg(long, value_enum, value_name = "WHEN")]
    pub color: Option<ColorMode>,
}

impl HarnessArgs {
    /// Builds the effective configuration: defaults, then the config file, then flags.
    pub fn resolve_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_yaml_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(suffix) = &self.suffix {
            config.test_suffix = suffix.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
        if self.diff {
            config.show_diff = true;
        }
        if let Some(color) = self.color {
            config.color = color;
        }

        config.validate()?;
        Ok(config)
    }
}
