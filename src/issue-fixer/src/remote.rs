//! Errors shared by the hosting-repository seams.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the hosting repository.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure, rate limit or server error; worth retrying.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// The request was refused (authentication, missing resource, validation).
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// No answer within the configured timeout.
    #[error("remote request timed out after {0:?}")]
    TimedOut(Duration),
}

impl RemoteError {
    /// Returns true if retrying the request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::TimedOut(_))
    }
}

/// Runs a remote call with an explicit timeout.
///
/// # Errors
///
/// Returns the call's own error, or [`RemoteError::TimedOut`].
pub async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| RemoteError::TimedOut(timeout))?
}
