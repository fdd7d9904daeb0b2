//! Issue records.

use serde::Serialize;
use std::collections::BTreeSet;

/// State of an issue at fetch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    /// Open issue.
    Open,
    /// Closed issue.
    Closed,
}

/// An issue as read from the hosting repository.
///
/// This is a snapshot taken at fetch time and is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Issue number, unique within the repository.
    pub number: u64,

    /// Issue title.
    pub title: String,

    /// Issue body text (empty when the issue has none).
    pub body: String,

    /// Label names.
    pub labels: BTreeSet<String>,

    /// State at fetch time.
    pub state: IssueState,

    /// Web URL of the issue.
    pub url: String,
}

impl Issue {
    /// Returns true if the issue is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }
}

/// One page of issues.
#[derive(Debug, Clone, Default)]
pub struct IssuePage {
    /// Issues on this page, in API order.
    pub issues: Vec<Issue>,

    /// Number of the next page, if there is one.
    pub next_page: Option<u32>,
}
