//! Local working copies and the git seam.

mod cli;
mod error;

pub use cli::CliGit;
pub use error::GitError;

use crate::issues::RepositoryId;
use futures::future::BoxFuture;
use std::path::Path;
use tempfile::TempDir;

/// A throw-away working copy checked out at a base revision.
///
/// The directory is deleted when the workspace is dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    repository: RepositoryId,
    base_branch: String,
    base_revision: String,
}

impl Workspace {
    /// Wraps a checked-out directory.
    pub fn new(
        dir: TempDir,
        repository: RepositoryId,
        base_branch: impl Into<String>,
        base_revision: impl Into<String>,
    ) -> Self {
        Self {
            dir,
            repository,
            base_branch: base_branch.into(),
            base_revision: base_revision.into(),
        }
    }

    /// Root of the working copy.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Repository the working copy was cloned from.
    #[must_use]
    pub fn repository(&self) -> &RepositoryId {
        &self.repository
    }

    /// Branch the working copy was cloned at.
    #[must_use]
    pub fn base_branch(&self) -> &str {
        &self.base_branch
    }

    /// Commit id of the base branch at clone time.
    #[must_use]
    pub fn base_revision(&self) -> &str {
        &self.base_revision
    }
}

/// Local and remote git operations.
pub trait GitBackend: Send + Sync {
    /// Clones `base_branch` of `repository` into a fresh temporary directory.
    fn checkout<'a>(
        &'a self,
        repository: &'a RepositoryId,
        base_branch: &'a str,
    ) -> BoxFuture<'a, Result<Workspace, GitError>>;

    /// Creates and checks out `branch` at the workspace's base revision.
    fn create_branch<'a>(
        &'a self,
        workspace: &'a Workspace,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), GitError>>;

    /// Stages `paths` and commits them, returning the new commit id.
    fn commit<'a>(
        &'a self,
        workspace: &'a Workspace,
        message: &'a str,
        paths: &'a [String],
    ) -> BoxFuture<'a, Result<String, GitError>>;

    /// Pushes the checked-out branch to `branch` on the remote without force.
    ///
    /// Returns [`GitError::Rejected`] if the remote branch already exists.
    fn push<'a>(
        &'a self,
        workspace: &'a Workspace,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), GitError>>;
}
