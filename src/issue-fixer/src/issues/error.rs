//! Issue listing error types.

use thiserror::Error;

/// Errors that can occur while listing issues.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The issue source could not be read after retrying.
    #[error("Issue source unavailable after {attempts} attempt(s): {message}")]
    SourceUnavailable { attempts: u32, message: String },
}
