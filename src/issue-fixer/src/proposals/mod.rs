//! Proposal publishing.
//!
//! This module pushes committed fixes and opens review requests, claiming
//! each issue's branch at most once.

mod error;
mod types;

pub use error::PublishError;
pub use types::{ExistingProposal, OpenedReviewRequest, Proposal, ProposalDraft, ReviewRequest};

use crate::issues::RepositoryId;
use crate::remote::{with_timeout, RemoteError};
use crate::retry::{RetryPolicy, Sleeper};
use crate::templates::TemplateRenderer;
use crate::workspace::{GitBackend, GitError, Workspace};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Hosting service operations used to publish proposals.
pub trait Forge: Send + Sync {
    /// Returns the repository's default branch.
    fn default_branch<'a>(
        &'a self,
        repository: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<String, RemoteError>>;

    /// Looks for a remote branch named `branch` or an open review request
    /// with that head.
    fn find_proposal<'a>(
        &'a self,
        repository: &'a RepositoryId,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<Option<ExistingProposal>, RemoteError>>;

    /// Opens a review request.
    fn open_review_request<'a>(
        &'a self,
        request: &'a ReviewRequest,
    ) -> BoxFuture<'a, Result<OpenedReviewRequest, RemoteError>>;

    /// Deletes the remote branch `branch`. A branch that is already gone is not an error.
    fn delete_branch<'a>(
        &'a self,
        repository: &'a RepositoryId,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;

    /// Adds a comment to an issue.
    fn comment_on_issue<'a>(
        &'a self,
        repository: &'a RepositoryId,
        issue_number: u64,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;

    /// Adds a label to an issue.
    fn add_label<'a>(
        &'a self,
        repository: &'a RepositoryId,
        issue_number: u64,
        label: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;
}

/// Result of publishing a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new review request was opened.
    Published(Proposal),
    /// The issue's branch was already claimed; nothing was created.
    AlreadyExists {
        /// Claimed branch.
        branch: String,
        /// Existing review request URL, if known.
        url: Option<String>,
    },
}

/// Publishes drafts through a [`Forge`] and a [`GitBackend`].
#[derive(Clone)]
pub struct Publisher {
    forge: Arc<dyn Forge>,
    git: Arc<dyn GitBackend>,
    renderer: Arc<TemplateRenderer>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    request_timeout: Duration,
    processed_label: Option<String>,
}

impl Publisher {
    /// Creates a publisher.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        forge: Arc<dyn Forge>,
        git: Arc<dyn GitBackend>,
        renderer: Arc<TemplateRenderer>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        request_timeout: Duration,
        processed_label: Option<String>,
    ) -> Self {
        Self {
            forge,
            git,
            renderer,
            policy,
            sleeper,
            request_timeout,
            processed_label,
        }
    }

    /// Checks whether `branch` is already claimed on the remote.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Failure`] if the forge cannot be queried.
    pub async fn existing_proposal(
        &self,
        repository: &RepositoryId,
        branch: &str,
    ) -> Result<Option<ExistingProposal>, PublishError> {
        self.remote_call("find_proposal", || self.forge.find_proposal(repository, branch))
            .await
    }

    /// Pushes the draft's branch and opens a review request for it.
    ///
    /// Never force-pushes: if the branch appears on the remote first, the
    /// other writer wins and the outcome is [`PublishOutcome::AlreadyExists`].
    /// If the review request cannot be opened, the pushed branch is deleted
    /// again so a later run can retry the issue.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Failure`] once retries are spent, or
    /// [`PublishError::Template`] if the review request cannot be rendered.
    pub async fn publish(
        &self,
        draft: ProposalDraft,
        workspace: &Workspace,
    ) -> Result<PublishOutcome, PublishError> {
        let span = info_span!(
            "publish",
            repo = %draft.repository,
            issue = draft.issue.number,
            branch = %draft.branch
        );
        async {
            let request = ReviewRequest {
                repository: draft.repository.clone(),
                head: draft.branch.clone(),
                base: draft.base_branch.clone(),
                title: self.renderer.pr_title(&draft)?,
                body: self.renderer.pr_body(&draft)?,
            };

            if let Some(existing) = self.existing_proposal(&draft.repository, &draft.branch).await? {
                info!("Branch already claimed, not publishing");
                return Ok(already_exists(existing));
            }

            let pushed = self
                .policy
                .run(self.sleeper.as_ref(), "push", GitError::is_retryable, |_| {
                    self.git.push(workspace, &draft.branch)
                })
                .await;
            match pushed {
                Ok(()) => info!(commit = %draft.commit_id, "Pushed branch"),
                Err(exhausted) => {
                    if let GitError::Rejected { .. } = exhausted.error {
                        info!("Push rejected, branch was claimed concurrently");
                        return Ok(PublishOutcome::AlreadyExists {
                            branch: draft.branch,
                            url: None,
                        });
                    }
                    return Err(PublishError::Failure {
                        attempts: exhausted.attempts,
                        message: exhausted.error.to_string(),
                    });
                }
            }

            let opened = match self
                .remote_call("open_review_request", || self.forge.open_review_request(&request))
                .await
            {
                Ok(opened) => opened,
                Err(e) => {
                    // A bare branch would block every later run from claiming the issue.
                    self.release_branch(&draft.repository, &draft.branch).await;
                    return Err(e);
                }
            };
            info!(pr_number = opened.number, url = %opened.url, "Review request opened");

            let proposal = Proposal {
                issue_number: draft.issue.number,
                branch: draft.branch,
                base_branch: draft.base_branch,
                commit_id: draft.commit_id,
                number: opened.number,
                url: opened.url,
                issue_url: draft.issue.url,
            };
            self.follow_up(&draft.repository, &proposal).await;
            Ok(PublishOutcome::Published(proposal))
        }
        .instrument(span)
        .await
    }

    /// Deletes a branch pushed by this run. Failures are only logged.
    async fn release_branch(&self, repository: &RepositoryId, branch: &str) {
        let deleted = self
            .remote_call("delete_branch", || self.forge.delete_branch(repository, branch))
            .await;
        match deleted {
            Ok(()) => info!("Deleted pushed branch after failing to open review request"),
            Err(e) => warn!(error = %e, "Failed to delete pushed branch"),
        }
    }

    /// Comments on and labels the issue. Failures are only logged.
    async fn follow_up(&self, repository: &RepositoryId, proposal: &Proposal) {
        match self.renderer.issue_comment(proposal) {
            Ok(body) => {
                let commented = self
                    .remote_call("comment_on_issue", || {
                        self.forge
                            .comment_on_issue(repository, proposal.issue_number, &body)
                    })
                    .await;
                if let Err(e) = commented {
                    warn!(error = %e, "Failed to comment on issue");
                }
            }
            Err(e) => warn!(error = %e, "Failed to render issue comment"),
        }

        if let Some(label) = &self.processed_label {
            let labelled = self
                .remote_call("add_label", || {
                    self.forge.add_label(repository, proposal.issue_number, label)
                })
                .await;
            if let Err(e) = labelled {
                warn!(label = %label, error = %e, "Failed to label issue");
            }
        }
    }

    async fn remote_call<'a, T>(
        &'a self,
        operation: &str,
        call: impl Fn() -> BoxFuture<'a, Result<T, RemoteError>>,
    ) -> Result<T, PublishError> {
        self.policy
            .run(
                self.sleeper.as_ref(),
                operation,
                RemoteError::is_retryable,
                |_| with_timeout(self.request_timeout, call()),
            )
            .await
            .map_err(|exhausted| PublishError::Failure {
                attempts: exhausted.attempts,
                message: exhausted.error.to_string(),
            })
    }
}

fn already_exists(existing: ExistingProposal) -> PublishOutcome {
    PublishOutcome::AlreadyExists {
        branch: existing.branch,
        url: existing.url,
    }
}
