//! Outcome classification of captured test output
//!
//! A classifier turns the stdout of a successful run into a notification title
//! and a short summary. The only built-in implementation reads the trailer that
//! `go test` prints; other runners need their own [`OutcomeClassifier`].

use thiserror::Error;

/// Title and summary derived from command output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub title: String,
    pub summary: String,
}

/// Errors from classifying output
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// Not enough lines to pick a summary from
    #[error("output too short to summarize ({lines} lines, need at least {min})")]
    OutputTooShort { lines: usize, min: usize },
}

/// Derives a pass/fail title and a summary from captured output
pub trait OutcomeClassifier: Send + Sync {
    fn classify(&self, output: &str) -> Result<Outcome, ClassifyError>;
}

/// Line-based heuristic for `go test` style output
///
/// Fragile by nature: it relies on the runner printing a bare `PASS` or `FAIL`
/// line and on the summary sitting at fixed positions from the end.
///
/// - Title: the last line that is exactly `PASS` or `FAIL`; empty if none is.
/// - Summary: the third-from-last and second-from-last lines, each followed by
///   a newline. Output ending in `\n` has an empty final line, so for a typical
///   trailer this picks the result line and the package line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailerClassifier;

impl TrailerClassifier {
    /// Fewest lines the summary indexing needs
    pub const MIN_LINES: usize = 3;
}

impl OutcomeClassifier for TrailerClassifier {
    fn classify(&self, output: &str) -> Result<Outcome, ClassifyError> {
        let lines: Vec<&str> = output.split('\n').collect();

        if lines.len() < Self::MIN_LINES {
            return Err(ClassifyError::OutputTooShort {
                lines: lines.len(),
                min: Self::MIN_LINES,
            });
        }

        // Full scan: a later marker overrides an earlier one
        let mut title = "";
        for &line in &lines {
            if line == "PASS" || line == "FAIL" {
                title = line;
            }
        }

        let n = lines.len();
        let summary = format!("{}\n{}\n", lines[n - 3], lines[n - 2]);

        Ok(Outcome {
            title: title.to_string(),
            summary,
        })
    }
}
