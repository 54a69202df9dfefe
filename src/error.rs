//! Error types for suite execution and reporting
//!
//! `RunnerError` aborts a whole run. `ExecutionError` belongs to a single
//! scenario and is recorded as an `Errored` outcome instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

use crate::http::HttpError;

/// Fatal errors raised by the suite runner and the report generator
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Invalid tag filter: {0}")]
    InvalidFilter(String),

    #[error("Parallelism must be at least 1, got {0}")]
    InvalidParallelism(usize),

    #[error("Invalid run id '{0}': must be a single directory name")]
    InvalidRunId(String),

    #[error("No result artifacts found under {}", .0.display())]
    EmptyInput(PathBuf),

    #[error("Failed to write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare artifact directory {}: {source}", path.display())]
    ArtifactDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifacts under {}: {source}", path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Whether the error came from resolving the discovery path or the tag filter
    pub fn is_discovery(&self) -> bool {
        matches!(self, RunnerError::Discovery(_) | RunnerError::InvalidFilter(_))
    }
}

/// Per-scenario execution failure
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Scenario compares responses but no secondary target is configured")]
    MissingSecondaryTarget,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RunnerError::InvalidParallelism(0);
        assert_eq!(err.to_string(), "Parallelism must be at least 1, got 0");

        let err = RunnerError::InvalidRunId("..".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid run id '..': must be a single directory name"
        );

        let err = RunnerError::EmptyInput(PathBuf::from("target/results/run-1"));
        assert_eq!(
            err.to_string(),
            "No result artifacts found under target/results/run-1"
        );
    }

    #[test]
    fn test_is_discovery() {
        assert!(RunnerError::Discovery("missing".into()).is_discovery());
        assert!(RunnerError::InvalidFilter("~".into()).is_discovery());
        assert!(!RunnerError::InvalidParallelism(0).is_discovery());
    }
}
