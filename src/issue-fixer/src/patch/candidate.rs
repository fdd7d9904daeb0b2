//! Patch candidate types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Replacement of one file's full content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEdit {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,

    /// Content hash the file must have before the edit; `None` if the file
    /// must not exist yet.
    pub old_hash: Option<String>,

    /// Full new content.
    #[serde(skip)]
    pub new_content: String,
}

/// Provenance of a generated patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationMetadata {
    /// `provider:model` identifier.
    pub model: String,

    /// Version of the prompt that produced the patch.
    pub prompt_version: u32,

    /// When the response was received.
    pub generated_at: DateTime<Utc>,
}

/// A proposed change set for one issue. Consumed by the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchCandidate {
    /// Originating issue number.
    pub issue_number: u64,

    /// Edits in application order.
    pub edits: Vec<FileEdit>,

    /// Model-provided explanation of the change.
    pub summary: Option<String>,

    /// Model and prompt provenance.
    pub metadata: GenerationMetadata,
}

impl PatchCandidate {
    /// Paths touched by the candidate, in edit order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.edits.iter().map(|e| e.path.clone()).collect()
    }
}

/// Returns true if `path` is a relative, normal, `/`-separated path that stays
/// inside the repository and outside `.git`.
#[must_use]
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.contains(['\\', '\0']) {
        return false;
    }
    path.split('/').all(|part| {
        !part.is_empty()
            && part != "."
            && part != ".."
            && !part.eq_ignore_ascii_case(".git")
            && !part.contains(':')
    })
}
