//! Publishing error types.

use crate::templates::TemplateError;
use thiserror::Error;

/// Errors that can occur while publishing a proposal.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Push or review request creation failed after retries.
    #[error("Publishing failed after {attempts} attempt(s): {message}")]
    Failure { attempts: u32, message: String },

    /// Review request title or body could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
}
