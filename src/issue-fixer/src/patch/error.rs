//! Patch application error types.

use crate::templates::TemplateError;
use crate::workspace::GitError;
use thiserror::Error;

/// Errors that can occur while applying a patch candidate.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The working copy no longer matches what the patch was generated against.
    #[error("Conflict on '{path}': expected {}, found {}", describe(expected), describe(actual))]
    Conflict {
        path: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// An edit targets a path outside the working copy or inside `.git`.
    #[error("Refusing to edit '{path}'")]
    InvalidPath { path: String },

    /// Reading or writing a file failed.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Branch or commit creation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Commit message rendering failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn describe(hash: &Option<String>) -> String {
    match hash {
        Some(hash) => format!("content {}", hash.chars().take(12).collect::<String>()),
        None => "no file".to_string(),
    }
}
