//! Context capture error types.

use thiserror::Error;

/// Errors that can occur while capturing repository context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Failed to walk the working copy.
    #[error("Failed to walk working copy: {message}")]
    Walk { message: String },

    /// Failed to read a selected file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
