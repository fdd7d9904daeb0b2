//! Per-issue outcome types.

use crate::proposals::Proposal;
use serde::Serialize;
use std::fmt;

/// Stage an issue pipeline had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Issue listed, nothing started yet.
    Fetched,
    /// Preparing context and asking the model.
    Generating,
    /// Writing and committing the patch.
    Applying,
    /// Pushing and opening the review request.
    Publishing,
}

impl PipelineStage {
    /// Returns the stage name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Generating => "generating",
            Self::Applying => "applying",
            Self::Publishing => "publishing",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an issue was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The model found nothing to change.
    NoFixFound { reason: String },
    /// Another run already claimed the issue's branch.
    AlreadyExists { branch: String, url: Option<String> },
    /// Dry run: the fix was committed locally and not published.
    DryRun { branch: String, files: Vec<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFixFound { reason } => write!(f, "no fix found: {reason}"),
            Self::AlreadyExists { branch, url: Some(url) } => {
                write!(f, "already proposed on {branch}: {url}")
            }
            Self::AlreadyExists { branch, url: None } => {
                write!(f, "branch {branch} already exists")
            }
            Self::DryRun { branch, files } => {
                write!(f, "dry run, would publish {branch} ({} file(s))", files.len())
            }
        }
    }
}

/// Final state of one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IssueOutcome {
    /// A review request was opened.
    Done { proposal: Proposal },
    /// Nothing was published, by decision rather than error.
    Skipped { reason: SkipReason },
    /// The pipeline failed at `stage`.
    Failed { stage: PipelineStage, reason: String },
}

/// One line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    /// Issue number.
    pub number: u64,
    /// Issue title at fetch time.
    pub title: String,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: IssueOutcome,
}
