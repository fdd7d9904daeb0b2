//! Run report.

use super::{IssueOutcome, IssueReport};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Repository the run processed.
    pub repository: String,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of issues with an open review request.
    pub done: usize,

    /// Number of issues skipped.
    pub skipped: usize,

    /// Number of issues that failed.
    pub failed: usize,

    /// Per-issue entries, in fetch order.
    pub issues: Vec<IssueReport>,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new(repository: impl Into<String>, dry_run: bool, started_at: DateTime<Utc>) -> Self {
        Self {
            repository: repository.into(),
            dry_run,
            started_at,
            finished_at: None,
            done: 0,
            skipped: 0,
            failed: 0,
            issues: Vec::new(),
        }
    }

    /// Appends an issue entry and updates the counts.
    pub fn record(&mut self, entry: IssueReport) {
        match entry.outcome {
            IssueOutcome::Done { .. } => self.done += 1,
            IssueOutcome::Skipped { .. } => self.skipped += 1,
            IssueOutcome::Failed { .. } => self.failed += 1,
        }
        self.issues.push(entry);
    }

    /// Marks the run as finished.
    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    /// Looks up the entry for an issue.
    #[must_use]
    pub fn entry(&self, number: u64) -> Option<&IssueReport> {
        self.issues.iter().find(|e| e.number == number)
    }

    /// Returns true if any issue failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
