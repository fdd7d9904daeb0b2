//! Git error types.

use thiserror::Error;

/// Errors that can occur while driving git.
///
/// Messages never contain the access token.
#[derive(Debug, Error)]
pub enum GitError {
    /// Failed to create the temporary working copy directory.
    #[error("Failed to create temp directory: {0}")]
    TempDir(#[source] std::io::Error),

    /// Failed to start git.
    #[error("Failed to execute git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Git exited with a failure status.
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    /// Git did not finish within its timeout.
    #[error("git {command} timed out after {timeout_secs} seconds")]
    TimedOut { command: String, timeout_secs: u64 },

    /// The remote refused a non-forcing push.
    #[error("push rejected: {message}")]
    Rejected { message: String },

    /// The remote URL could not be built.
    #[error("Invalid remote URL: {message}")]
    InvalidUrl { message: String },
}

impl GitError {
    /// Returns true if repeating the command may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut { .. })
    }
}
