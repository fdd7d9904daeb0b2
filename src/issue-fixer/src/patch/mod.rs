//! Patch application.
//!
//! [`PatchApplier`] applies a [`PatchCandidate`] to a working copy on a new
//! branch. Every edit is checked against the live files before anything is
//! written, and a failed write or commit restores the files already touched.

mod candidate;
mod error;

pub use candidate::{is_safe_relative_path, FileEdit, GenerationMetadata, PatchCandidate};
pub use error::ApplyError;

use crate::context::content_hash;
use crate::issues::Issue;
use crate::proposals::ProposalDraft;
use crate::templates::TemplateRenderer;
use crate::workspace::{GitBackend, Workspace};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// State of one file before it was overwritten.
struct Backup {
    target: PathBuf,
    original: Option<Vec<u8>>,
    created_dirs: Vec<PathBuf>,
}

/// Applies patch candidates as single commits.
#[derive(Clone)]
pub struct PatchApplier {
    git: Arc<dyn GitBackend>,
    renderer: Arc<TemplateRenderer>,
}

impl PatchApplier {
    /// Creates an applier committing through `git`.
    pub fn new(git: Arc<dyn GitBackend>, renderer: Arc<TemplateRenderer>) -> Self {
        Self { git, renderer }
    }

    /// Applies `candidate` to `workspace` on a new `branch` and commits it.
    ///
    /// Either every edit lands in one commit or the working copy files are
    /// left as they were.
    ///
    /// # Errors
    ///
    /// - [`ApplyError::Conflict`] if a file's current content does not match
    ///   the hash the candidate was generated against.
    /// - [`ApplyError::InvalidPath`], [`ApplyError::Io`], [`ApplyError::Git`]
    ///   or [`ApplyError::Template`] for the respective failures.
    pub async fn apply(
        &self,
        candidate: PatchCandidate,
        issue: &Issue,
        workspace: &Workspace,
        branch: &str,
    ) -> Result<ProposalDraft, ApplyError> {
        let span = info_span!("apply_patch", issue = issue.number, branch = %branch);
        async {
            for edit in &candidate.edits {
                verify_edit(workspace.path(), edit)?;
            }
            let message = self.renderer.commit_message(issue, &candidate)?;
            let paths = candidate.paths();

            self.git.create_branch(workspace, branch).await?;

            let backups = write_edits(workspace.path(), &candidate.edits)?;
            let commit_id = match self.git.commit(workspace, &message, &paths).await {
                Ok(commit_id) => commit_id,
                Err(e) => {
                    restore(backups);
                    return Err(e.into());
                }
            };

            info!(commit = %commit_id, files = paths.len(), "Committed patch");
            Ok(ProposalDraft {
                issue: issue.clone(),
                repository: workspace.repository().clone(),
                branch: branch.to_string(),
                base_branch: workspace.base_branch().to_string(),
                base_revision: workspace.base_revision().to_string(),
                commit_id,
                paths,
                summary: candidate.summary,
                metadata: candidate.metadata,
            })
        }
        .instrument(span)
        .await
    }
}

fn target_path(root: &Path, path: &str) -> Result<PathBuf, ApplyError> {
    if !is_safe_relative_path(path) {
        return Err(ApplyError::InvalidPath {
            path: path.to_string(),
        });
    }
    let target = root.join(path);
    // Refuse to follow symlinks out of the working copy.
    let mut current = root.to_path_buf();
    for part in path.split('/') {
        current.push(part);
        if std::fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink()) {
            return Err(ApplyError::InvalidPath {
                path: path.to_string(),
            });
        }
    }
    Ok(target)
}

fn current_hash(target: &Path, path: &str) -> Result<Option<String>, ApplyError> {
    match std::fs::read(target) {
        Ok(bytes) => Ok(Some(content_hash(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ApplyError::Io {
            path: path.to_string(),
            source,
        }),
    }
}

fn verify_edit(root: &Path, edit: &FileEdit) -> Result<(), ApplyError> {
    let target = target_path(root, &edit.path)?;
    let actual = current_hash(&target, &edit.path)?;
    if actual != edit.old_hash {
        return Err(ApplyError::Conflict {
            path: edit.path.clone(),
            expected: edit.old_hash.clone(),
            actual,
        });
    }
    Ok(())
}

/// Writes every edit, restoring earlier ones if any write fails.
fn write_edits(root: &Path, edits: &[FileEdit]) -> Result<Vec<Backup>, ApplyError> {
    let mut backups = Vec::with_capacity(edits.len());
    for edit in edits {
        match write_edit(root, edit) {
            Ok(backup) => backups.push(backup),
            Err(e) => {
                restore(backups);
                return Err(e);
            }
        }
    }
    Ok(backups)
}

fn write_edit(root: &Path, edit: &FileEdit) -> Result<Backup, ApplyError> {
    let io_error = |source| ApplyError::Io {
        path: edit.path.clone(),
        source,
    };
    let target = target_path(root, &edit.path)?;
    let original = match std::fs::read(&target) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(io_error(e)),
    };
    let parent = target.parent().unwrap_or(root).to_path_buf();

    let mut created_dirs: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|dir| *dir != root && !dir.exists())
        .map(Path::to_path_buf)
        .collect();
    created_dirs.reverse();
    std::fs::create_dir_all(&parent).map_err(io_error)?;

    let backup = Backup {
        target: target.clone(),
        original,
        created_dirs,
    };
    let result = (|| -> std::io::Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
        temp.write_all(edit.new_content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })();
    if let Err(e) = result {
        restore(vec![backup]);
        return Err(io_error(e));
    }
    debug!(path = %edit.path, bytes = edit.new_content.len(), "Wrote file");
    Ok(backup)
}

/// Puts files back the way they were, newest first.
fn restore(backups: Vec<Backup>) {
    for backup in backups.into_iter().rev() {
        let result = match &backup.original {
            Some(bytes) => std::fs::write(&backup.target, bytes),
            None => match std::fs::remove_file(&backup.target) {
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            warn!(path = %backup.target.display(), error = %e, "Failed to restore file");
        }
        for dir in backup.created_dirs.iter().rev() {
            let _ = std::fs::remove_dir(dir);
        }
    }
}
