//! Error types for the caseflow harness.
//!
//! Stage-body failures are not represented here: bodies return opaque
//! `anyhow` errors that the runner captures into [`crate::core::StageRecord`]
//! values. `CaseflowError` covers the harness's own configuration and IO
//! failures, which are surfaced before or around execution rather than
//! inside it.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for caseflow operations.
#[derive(Debug, Error)]
pub enum CaseflowError {
    /// A requested path matched no registered test file.
    #[error("no registered test file matches '{}'", .0.display())]
    MissingTestFile(PathBuf),

    /// Two test files were registered under the same path.
    #[error("duplicate test file registration for '{}'", .0.display())]
    DuplicateTestFile(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_message() {
        let err = CaseflowError::MissingTestFile(PathBuf::from("tests/absent.rs"));
        assert_eq!(
            err.to_string(),
            "no registered test file matches 'tests/absent.rs'"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CaseflowError = io.into();
        assert!(matches!(err, CaseflowError::Io(_)));
    }
}
