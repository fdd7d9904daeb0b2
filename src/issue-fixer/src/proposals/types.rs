//! Proposal types.

use crate::issues::{Issue, RepositoryId};
use crate::patch::GenerationMetadata;
use serde::Serialize;

/// A committed but unpublished fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalDraft {
    /// Originating issue.
    pub issue: Issue,

    /// Target repository.
    pub repository: RepositoryId,

    /// Branch carrying the commit.
    pub branch: String,

    /// Branch the review request targets.
    pub base_branch: String,

    /// Commit the branch was created from.
    pub base_revision: String,

    /// Fix commit.
    pub commit_id: String,

    /// Files changed by the commit.
    pub paths: Vec<String>,

    /// Model-provided explanation.
    pub summary: Option<String>,

    /// Model and prompt provenance.
    pub metadata: GenerationMetadata,
}

/// An open review request for an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    /// Originating issue number.
    pub issue_number: u64,

    /// Head branch.
    pub branch: String,

    /// Base branch.
    pub base_branch: String,

    /// Fix commit.
    pub commit_id: String,

    /// Review request number.
    pub number: u64,

    /// Review request URL.
    pub url: String,

    /// Link back to the issue.
    pub issue_url: String,
}

/// A branch or review request already claiming an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingProposal {
    /// Claimed branch.
    pub branch: String,

    /// Open review request URL, if there is one.
    pub url: Option<String>,
}

/// Review request to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Target repository.
    pub repository: RepositoryId,

    /// Head branch.
    pub head: String,

    /// Base branch.
    pub base: String,

    /// Title.
    pub title: String,

    /// Rendered body.
    pub body: String,
}

/// Review request as created by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedReviewRequest {
    /// Review request number.
    pub number: u64,

    /// Review request URL.
    pub url: String,
}
