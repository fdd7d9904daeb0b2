//! Fix generation error types.

use thiserror::Error;

/// Errors that can occur while generating a fix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FixError {
    /// The model backend could not be reached, rate limited or timed out.
    #[error("Model unavailable after {attempts} attempt(s): {message}")]
    ModelUnavailable { attempts: u32, message: String },

    /// The model answered with something that is not a usable patch.
    #[error("Malformed model response: {message}")]
    MalformedResponse { message: String },
}

impl FixError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}
