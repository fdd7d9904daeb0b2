//! Run report types.

mod outcome;
mod run_report;

pub use outcome::{IssueOutcome, IssueReport, PipelineStage, SkipReason};
pub use run_report::RunReport;
