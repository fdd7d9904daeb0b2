//! Run settings deserialization.

use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::time::Duration;

/// Settings from the `[run]` section of `issue-fixer.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RunSettings {
    /// Only issues carrying all of these labels are processed.
    pub labels: Vec<String>,

    /// Maximum number of issues handled per run.
    pub max_issues: Option<usize>,

    /// Maximum number of issue pipelines in flight.
    pub concurrency: usize,

    /// Branch proposals are based on (defaults to the repository default branch).
    pub base_branch: Option<String>,

    /// Label added to an issue once a proposal has been opened for it.
    pub processed_label: Option<String>,

    /// Base URL used for git transport.
    pub git_host: String,

    /// Soft time budget for a single issue pipeline.
    pub issue_timeout_secs: u64,

    /// Hard deadline for the whole run.
    pub run_deadline_secs: Option<u64>,

    /// Timeout for each hosting API request.
    pub request_timeout_secs: u64,

    /// Timeout for each language-model request.
    pub model_timeout_secs: u64,

    /// Timeout for clone and push operations.
    pub push_timeout_secs: u64,

    /// Retry policy for transient backend failures.
    pub retry: RetrySettings,

    /// Bounds on the repository context shown to the model.
    pub context: ContextSettings,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            max_issues: None,
            concurrency: 2,
            base_branch: None,
            processed_label: None,
            git_host: "https://github.com".to_string(),
            issue_timeout_secs: 900,
            run_deadline_secs: None,
            request_timeout_secs: 30,
            model_timeout_secs: 300,
            push_timeout_secs: 120,
            retry: RetrySettings::default(),
            context: ContextSettings::default(),
        }
    }
}

impl RunSettings {
    /// Soft budget for one issue pipeline.
    #[must_use]
    pub fn issue_timeout(&self) -> Duration {
        Duration::from_secs(self.issue_timeout_secs)
    }

    /// Hard deadline for the whole run, if any.
    #[must_use]
    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }

    /// Timeout for a single hosting API request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for a single model request.
    #[must_use]
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Timeout for clone and push.
    #[must_use]
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }
}

/// Settings from the `[run.retry]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Maximum random delay added on top.
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_ms: 250,
        }
    }
}

impl RetrySettings {
    /// Converts the settings into a policy object.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

/// Settings from the `[run.context]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ContextSettings {
    /// Maximum number of files included verbatim.
    pub max_files: usize,
    /// Files larger than this are never included.
    pub max_file_bytes: u64,
    /// Total byte budget across included files.
    pub max_total_bytes: u64,
    /// Maximum number of paths listed in the tree overview.
    pub max_tree_entries: usize,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_files: 8,
            max_file_bytes: 64 * 1024,
            max_total_bytes: 192 * 1024,
            max_tree_entries: 400,
        }
    }
}

/// Settings from the `[templates]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TemplateSettings {
    /// Handlebars format for branch names; only `{{number}}` is available.
    pub branch_name_format: String,

    /// Handlebars format for commit titles.
    pub commit_title_format: String,

    /// Handlebars format for review request titles.
    pub pr_title_format: String,

    /// Handlebars template for review request bodies.
    pub pr_body: String,

    /// Handlebars template for the comment left on the issue.
    pub issue_comment: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            branch_name_format: default_branch_name_format(),
            commit_title_format: default_commit_title_format(),
            pr_title_format: default_pr_title_format(),
            pr_body: default_pr_body(),
            issue_comment: default_issue_comment(),
        }
    }
}

/// Default branch name format.
#[must_use]
pub fn default_branch_name_format() -> String {
    "issuefix/{{number}}".to_string()
}

/// Default commit title format.
#[must_use]
pub fn default_commit_title_format() -> String {
    "Fix: {{title}} (Issue #{{number}})".to_string()
}

/// Default review request title format.
#[must_use]
pub fn default_pr_title_format() -> String {
    "Fix: {{title}}".to_string()
}

/// Default review request body.
#[must_use]
pub fn default_pr_body() -> String {
    "Automated fix for issue #{{number}}.\n\n\
{{#if summary}}{{summary}}\n\n{{/if}}\
Changed files:\n\
{{#each files}}- `{{this}}`\n{{/each}}\n\
Generated by `{{model}}` (prompt {{prompt_version}}).\n\n\
Closes #{{number}}\n"
        .to_string()
}

/// Default issue comment.
#[must_use]
pub fn default_issue_comment() -> String {
    "A fix for this issue has been proposed in {{pr_url}}.".to_string()
}
