//! Error types for mps-core

use crate::path::KeyPath;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mps-core
#[derive(Debug, Error)]
pub enum Error {
    /// The source provider could not deliver the file contents
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The text does not mention the expected SavedVariables identifier
    #[error("not a recognized SavedVariables file: '{identifier}' not found")]
    NotRecognizedFormat { identifier: String },

    /// The literal table syntax is malformed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The parsed table does not have the expected shape
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by a source provider before parsing starts
#[derive(Debug, Error)]
pub enum SourceError {
    /// No file was chosen
    #[error("no file selected")]
    NotSelected,

    /// The file exists in the caller's view but could not be read
    #[error("failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A grammar violation in the literal table syntax.
///
/// `offset` is a byte offset into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at byte {offset}: expected {expected}, found {found}")]
pub struct ParseError {
    pub offset: usize,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    pub fn new(offset: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Translate the byte offset into a 1-based (line, column) pair within `src`.
    ///
    /// Columns count characters, not bytes.
    pub fn line_col(&self, src: &str) -> (usize, usize) {
        let end = self.offset.min(src.len());
        let mut line = 1;
        let mut line_start = 0;
        for (i, b) in src.as_bytes()[..end].iter().enumerate() {
            if *b == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let column = src
            .get(line_start..end)
            .map(|s| s.chars().count())
            .unwrap_or(end - line_start)
            + 1;
        (line, column)
    }
}

/// A structural mismatch between the parsed table and the run schema
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unexpected shape at {path}: expected {expected}, found {found}")]
pub struct ShapeError {
    pub path: KeyPath,
    pub expected: String,
    pub found: String,
}

impl ShapeError {
    pub fn new(path: KeyPath, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            path,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// A key that appears more than once under strict duplicate handling
    pub fn duplicate(path: KeyPath) -> Self {
        Self::new(path, "a unique key", "a duplicate key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let err = ParseError::new(4, "value", "'}'");
        assert_eq!(err.line_col("abc = }"), (1, 5));
    }

    #[test]
    fn test_line_col_after_newlines() {
        let src = "local X = {\n  [1] = ,\n}";
        let err = ParseError::new(src.find(',').unwrap(), "value", "','");
        assert_eq!(err.line_col(src), (2, 9));
    }

    #[test]
    fn test_line_col_counts_characters() {
        let src = "\"é\" x";
        let err = ParseError::new(src.find('x').unwrap(), "'='", "identifier `x`");
        assert_eq!(err.line_col(src), (1, 5));
    }

    #[test]
    fn test_source_errors_are_distinct_from_format_errors() {
        let not_selected: Error = SourceError::NotSelected.into();
        assert!(matches!(not_selected, Error::Source(SourceError::NotSelected)));
        assert_eq!(not_selected.to_string(), "no file selected");

        let unrecognized = Error::NotRecognizedFormat {
            identifier: "MythicPlusStatsDB".to_string(),
        };
        assert!(unrecognized.to_string().contains("MythicPlusStatsDB"));
    }
}
