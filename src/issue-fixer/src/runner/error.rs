//! Runner error types.

use crate::fix::FixError;
use crate::issues::IssueError;

/// Errors that abort a whole run.
///
/// Per-issue failures never surface here; they are recorded in the report.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration or credential errors.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// GitHub API client initialization errors.
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),

    /// Git backend initialization errors.
    #[error(transparent)]
    Git(#[from] crate::workspace::GitError),

    /// Model backend initialization errors.
    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),

    /// Issues could not be listed.
    #[error(transparent)]
    SourceUnavailable(#[from] IssueError),

    /// The model pre-flight check failed.
    #[error("Model probe failed: {0}")]
    ModelProbe(#[source] FixError),

    /// The base branch could not be resolved.
    #[error("Failed to resolve base branch after {attempts} attempt(s): {message}")]
    BaseBranch { attempts: u32, message: String },
}
