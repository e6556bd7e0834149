//! Line-by-line comparison of a capture against its expectation.
//!
//! Both texts are split into lines that keep their terminators, so `"a\n"`
//! and `"a"` differ: a missing trailing newline is a real difference in the
//! compiler's output. `\r\n` and lone `\r` are read as `\n`.

use std::{fs, path::Path};

use difference::{Changeset, Difference};

use crate::diagnostics::{HarnessError, Result};

/// Result of comparing one capture with its expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch { expected: String, actual: String },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }

    /// Line diff from expectation to capture, or `None` for a match.
    pub fn diff(&self) -> Option<Vec<Difference>> {
        match self {
            Comparison::Match => None,
            Comparison::Mismatch { expected, actual } => {
                Some(Changeset::new(expected, actual, "\n").diffs)
            }
        }
    }
}

/// Normalizes line endings and splits into lines, keeping each `\n`.
pub fn lines_of(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized.split_inclusive('\n').map(str::to_owned).collect()
}

pub fn compare_text(actual: &str, expected: &str) -> Comparison {
    if lines_of(actual) == lines_of(expected) {
        Comparison::Match
    } else {
        Comparison::Mismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Reads both files back from disk and compares them.
pub fn compare_files(capture: &Path, expectation: &Path) -> Result<Comparison> {
    let actual = read(capture)?;
    let expected = read(expectation)?;
    Ok(compare_text(&actual, &expected))
}

fn read(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| HarnessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lines_keep_their_terminators() {
        assert_eq!(lines_of("a\nb"), vec!["a\n", "b"]);
        assert_eq!(lines_of("a\nb\n"), vec!["a\n", "b\n"]);
        assert!(lines_of("").is_empty());
    }

    #[test]
    fn carriage_returns_read_as_newlines() {
        assert_eq!(lines_of("a\r\nb\rc"), vec!["a\n", "b\n", "c"]);
        assert!(compare_text("x\r\ny\r\n", "x\ny\n").is_match());
    }

    #[test]
    fn identical_text_matches() {
        assert_eq!(compare_text("int main\n", "int main\n"), Comparison::Match);
    }

    #[test]
    fn an_extra_expected_line_is_a_mismatch() {
        let comparison = compare_text("one\n", "one\ntwo\n");
        assert!(!comparison.is_match());
    }

    #[test]
    fn a_missing_trailing_newline_is_a_mismatch() {
        assert!(!compare_text("one", "one\n").is_match());
    }

    #[test]
    fn diff_marks_added_and_removed_lines() {
        let comparison = compare_text("one\nthree", "one\ntwo");
        let diffs = comparison.diff().unwrap();
        assert!(diffs.contains(&Difference::Same("one".to_string())));
        assert!(diffs.contains(&Difference::Rem("two".to_string())));
        assert!(diffs.contains(&Difference::Add("three".to_string())));
        assert!(Comparison::Match.diff().is_none());
    }

    #[test]
    fn compare_files_reports_the_missing_expectation() {
        let dir = tempdir().unwrap();
        let capture = dir.path().join("a.qlw.c.did");
        fs::write(&capture, "out\n").unwrap();
        let expectation = dir.path().join("a.qlw.c.should");

        let err = compare_files(&capture, &expectation).unwrap_err();
        assert!(matches!(err, HarnessError::Read { ref path, .. } if *path == expectation));
        assert!(!err.is_fatal());
    }

    #[test]
    fn compare_files_reads_invalid_utf8_lossily() {
        let dir = tempdir().unwrap();
        let capture = dir.path().join("a.qlw.c.did");
        let expectation = dir.path().join("a.qlw.c.should");
        fs::write(&capture, "x\u{FFFD}\n").unwrap();
        fs::write(&expectation, b"x\xff\n").unwrap();
        assert!(compare_files(&capture, &expectation).unwrap().is_match());

        fs::write(&expectation, b"y\xfe\n").unwrap();
        assert!(!compare_files(&capture, &expectation).unwrap().is_match());
    }

    #[test]
    fn compare_files_matches_equal_files() {
        let dir = tempdir().unwrap();
        let capture = dir.path().join("a.qlw.c.did");
        let expectation = dir.path().join("a.qlw.c.should");
        fs::write(&capture, "1\n2\n").unwrap();
        fs::write(&expectation, "1\n2\n").unwrap();
        assert!(compare_files(&capture, &expectation).unwrap().is_match());
    }
}
