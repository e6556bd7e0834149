use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::diagnostics::{HarnessError, Result};

/// A discovered test program and the sibling files named after it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestCase {
    pub path: PathBuf,
    /// Where the compiler's standard output is written.
    pub capture: PathBuf,
    /// The pre-authored output the capture must match.
    pub expectation: PathBuf,
    /// The `-o` target handed to the compiler. Never inspected.
    pub object: PathBuf,
}

impl TestCase {
    pub fn new(path: PathBuf, config: &HarnessConfig) -> Self {
        Self {
            capture: with_suffix(&path, &config.capture_suffix),
            expectation: with_suffix(&path, &config.expect_suffix),
            object: with_suffix(&path, &config.object_suffix),
            path,
        }
    }
}

/// Appends `suffix` to the full path, so `a.qlw` becomes `a.qlw.c.did`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Discovers test programs under a root directory.
#[derive(Debug)]
pub struct TestDiscoverer;

impl TestDiscoverer {
    /// Recursively scans `root` for files whose name ends with `suffix`.
    ///
    /// The returned list of files is sorted to ensure deterministic execution order.
    pub fn discover_test_files<P: AsRef<Path>>(root: P, suffix: &str) -> Result<Vec<PathBuf>> {
        let root = root.as_ref();
        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|source| HarnessError::Discovery {
                root: root.to_path_buf(),
                source,
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            if !Self::is_test_file(entry.path(), suffix) {
                continue;
            }

            files.push(entry.into_path());
        }
        files.sort();
        tracing::debug!(root = %root.display(), count = files.len(), "discovered test files");
        Ok(files)
    }

    /// Discovers every test under the configured root and pairs it with its sibling paths.
    pub fn discover(config: &HarnessConfig) -> Result<Vec<TestCase>> {
        let files = Self::discover_test_files(&config.root, &config.test_suffix)?;
        Ok(files
            .into_iter()
            .map(|path| TestCase::new(path, config))
            .collect())
    }

    /// Returns true if the file name ends with the test suffix.
    fn is_test_file(path: &Path, suffix: &str) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(suffix))
    }
}
