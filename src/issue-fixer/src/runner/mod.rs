//! Orchestrates issue fixing runs.
//!
//! Each open issue goes through `Fetched → Generating → Applying → Publishing`
//! in its own pipeline. Pipelines run with bounded concurrency; a failure in
//! one is recorded in the report and never stops the others.

mod config;
mod error;

pub use config::RunnerConfig;
pub use error::RunnerError;

use crate::config::{ConfigError, Credentials};
use crate::context::RepositorySnapshot;
use crate::fix::{FixGenerator, FixOutcome};
use crate::github::GitHubClient;
use crate::issues::{Issue, IssueLister, IssueSource};
use crate::llm::{ModelBackend, SerdesModelBackend};
use crate::patch::PatchApplier;
use crate::proposals::{Forge, PublishOutcome, Publisher};
use crate::remote::{with_timeout, RemoteError};
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::summary::{IssueOutcome, IssueReport, PipelineStage, RunReport, SkipReason};
use crate::templates::TemplateRenderer;
use crate::workspace::{CliGit, GitBackend, GitError};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt::Display;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// External systems a run talks to.
pub struct Components {
    /// Issue listing.
    pub issues: Arc<dyn IssueSource>,
    /// Branches, review requests, comments and labels.
    pub forge: Arc<dyn Forge>,
    /// Clone, branch, commit and push.
    pub git: Arc<dyn GitBackend>,
    /// Language model.
    pub model: Arc<dyn ModelBackend>,
    /// Backoff delays.
    pub sleeper: Arc<dyn Sleeper>,
}

/// Orchestrates a full run against one repository.
pub struct Runner {
    config: RunnerConfig,
    issues: Arc<dyn IssueSource>,
    forge: Arc<dyn Forge>,
    git: Arc<dyn GitBackend>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    renderer: Arc<TemplateRenderer>,
    generator: FixGenerator,
    applier: PatchApplier,
    publisher: Publisher,
}

impl Runner {
    /// Builds a runner with the GitHub, git CLI and serdes-ai backends.
    ///
    /// Credentials are validated before any client is built.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] for missing credentials, a missing model
    /// or invalid templates, or an error if a client cannot be built.
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        let credentials = Credentials::from_inputs(config.credentials())?;
        let llm = config.llm().ok_or(ConfigError::MissingModel)?;
        let settings = config.settings();

        let github = Arc::new(GitHubClient::new(credentials.source_token())?);
        let git = CliGit::new(
            &settings.git_host,
            credentials.source_token().clone(),
            settings.request_timeout(),
            settings.push_timeout(),
        )?;
        let model = SerdesModelBackend::new(llm, credentials.model_key(), settings.model_timeout())?;

        Self::assemble(
            config,
            Components {
                issues: github.clone(),
                forge: github,
                git: Arc::new(git),
                model: Arc::new(model),
                sleeper: Arc::new(TokioSleeper),
            },
        )
    }

    /// Builds a runner over caller-provided components.
    ///
    /// The credential gate still runs first.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] for missing credentials or invalid templates.
    pub fn with_components(config: RunnerConfig, components: Components) -> Result<Self, RunnerError> {
        Credentials::from_inputs(config.credentials())?;
        Self::assemble(config, components)
    }

    fn assemble(config: RunnerConfig, components: Components) -> Result<Self, RunnerError> {
        let renderer = Arc::new(TemplateRenderer::new(config.templates().clone()));
        renderer
            .branch_name(1)
            .map_err(|e| ConfigError::ValidationError {
                path: "templates.branch-name-format".to_string(),
                message: e.to_string(),
            })?;

        let settings = config.settings();
        let policy = settings.retry.policy();
        let generator = FixGenerator::new(
            components.model,
            policy.clone(),
            Arc::clone(&components.sleeper),
        );
        let applier = PatchApplier::new(Arc::clone(&components.git), Arc::clone(&renderer));
        let publisher = Publisher::new(
            Arc::clone(&components.forge),
            Arc::clone(&components.git),
            Arc::clone(&renderer),
            policy.clone(),
            Arc::clone(&components.sleeper),
            settings.request_timeout(),
            settings.processed_label.clone(),
        );

        Ok(Self {
            config,
            issues: components.issues,
            forge: components.forge,
            git: components.git,
            sleeper: components.sleeper,
            policy,
            renderer,
            generator,
            applier,
            publisher,
        })
    }

    /// Executes the full run.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] only for run-level failures: a failed model
    /// probe, an unreachable issue source or an unresolvable base branch.
    pub async fn run(&self) -> Result<RunReport, RunnerError> {
        let repository = self.config.repository();
        let span = info_span!("run", repo = %repository, dry_run = self.config.dry_run());
        async {
            let mut report = RunReport::new(repository.full_name(), self.config.dry_run(), Utc::now());
            let deadline = self.config.settings().run_deadline().map(|d| Instant::now() + d);

            if self.config.probe_model() {
                info!("Probing model");
                self.generator.probe().await.map_err(RunnerError::ModelProbe)?;
            }

            let issues = self.collect_issues().await?;
            if issues.is_empty() {
                info!("No open issues to process");
                report.finish(Utc::now());
                return Ok(report);
            }
            info!(count = issues.len(), "Found open issues");

            let base_branch = self.resolve_base_branch().await?;
            let concurrency = self.config.settings().concurrency.max(1);
            let entries: Vec<IssueReport> = stream::iter(issues)
                .map(|issue| self.process_issue(issue, &base_branch, deadline))
                .buffered(concurrency)
                .collect()
                .await;

            for entry in entries {
                report.record(entry);
            }
            report.finish(Utc::now());
            info!(
                done = report.done,
                skipped = report.skipped,
                failed = report.failed,
                "Run complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Lists the open issues to process, bounded by `max-issues`.
    async fn collect_issues(&self) -> Result<Vec<Issue>, RunnerError> {
        let settings = self.config.settings();
        let lister = IssueLister::new(
            self.issues.as_ref(),
            self.config.repository(),
            &settings.labels,
            &self.policy,
            self.sleeper.as_ref(),
            settings.request_timeout(),
        );
        let limit = settings.max_issues.unwrap_or(usize::MAX);
        Ok(lister.stream().take(limit).try_collect().await?)
    }

    async fn resolve_base_branch(&self) -> Result<String, RunnerError> {
        if let Some(branch) = &self.config.settings().base_branch {
            return Ok(branch.clone());
        }
        let repository = self.config.repository();
        let timeout = self.config.settings().request_timeout();
        let branch = self
            .policy
            .run(
                self.sleeper.as_ref(),
                "default_branch",
                RemoteError::is_retryable,
                |_| with_timeout(timeout, self.forge.default_branch(repository)),
            )
            .await
            .map_err(|exhausted| RunnerError::BaseBranch {
                attempts: exhausted.attempts,
                message: exhausted.error.to_string(),
            })?;
        info!(base = %branch, "Resolved base branch");
        Ok(branch)
    }

    /// Runs one issue's pipeline within its budget and records the outcome.
    async fn process_issue(
        &self,
        issue: Issue,
        base_branch: &str,
        deadline: Option<Instant>,
    ) -> IssueReport {
        let span = info_span!("issue", number = issue.number);
        async {
            let budget = self.config.settings().issue_timeout();
            let limit = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!("Run deadline reached, not starting");
                        return report(
                            &issue,
                            failed(PipelineStage::Fetched, "run deadline reached before start"),
                        );
                    }
                    budget.min(remaining)
                }
                None => budget,
            };

            info!(title = %issue.title, "Processing issue");
            let stage = StageTracker::new();
            let outcome = match tokio::time::timeout(limit, self.pipeline(&issue, base_branch, &stage))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => failed(
                    stage.get(),
                    format!("timed out after {} seconds", limit.as_secs()),
                ),
            };

            match &outcome {
                IssueOutcome::Done { proposal } => {
                    info!(url = %proposal.url, "Proposal published");
                }
                IssueOutcome::Skipped { reason } => info!(reason = %reason, "Issue skipped"),
                IssueOutcome::Failed { stage, reason } => {
                    error!(stage = %stage, reason = %reason, "Issue failed");
                }
            }
            report(&issue, outcome)
        }
        .instrument(span)
        .await
    }

    async fn pipeline(&self, issue: &Issue, base_branch: &str, stage: &StageTracker) -> IssueOutcome {
        let repository = self.config.repository();
        let branch = match self.renderer.branch_name(issue.number) {
            Ok(branch) => branch,
            Err(e) => return failed(PipelineStage::Fetched, e),
        };

        match self.publisher.existing_proposal(repository, &branch).await {
            Ok(Some(existing)) => {
                return IssueOutcome::Skipped {
                    reason: SkipReason::AlreadyExists {
                        branch: existing.branch,
                        url: existing.url,
                    },
                }
            }
            Ok(None) => {}
            Err(e) => return failed(PipelineStage::Fetched, e),
        }

        stage.set(PipelineStage::Generating);
        let workspace = match self
            .policy
            .run(self.sleeper.as_ref(), "checkout", GitError::is_retryable, |_| {
                self.git.checkout(repository, base_branch)
            })
            .await
        {
            Ok(workspace) => workspace,
            Err(exhausted) => return failed(PipelineStage::Generating, exhausted.error),
        };
        let snapshot = match capture(workspace.path(), issue, &self.config) {
            Ok(snapshot) => snapshot,
            Err(e) => return failed(PipelineStage::Generating, e),
        };
        let candidate = match self.generator.generate(issue, &snapshot).await {
            Ok(FixOutcome::Patch(candidate)) => candidate,
            Ok(FixOutcome::NoFixFound { reason }) => {
                return IssueOutcome::Skipped {
                    reason: SkipReason::NoFixFound { reason },
                }
            }
            Err(e) => return failed(PipelineStage::Generating, e),
        };

        stage.set(PipelineStage::Applying);
        let draft = match self.applier.apply(candidate, issue, &workspace, &branch).await {
            Ok(draft) => draft,
            Err(e) => return failed(PipelineStage::Applying, e),
        };

        if self.config.dry_run() {
            return IssueOutcome::Skipped {
                reason: SkipReason::DryRun {
                    branch,
                    files: draft.paths,
                },
            };
        }

        stage.set(PipelineStage::Publishing);
        match self.publisher.publish(draft, &workspace).await {
            Ok(PublishOutcome::Published(proposal)) => IssueOutcome::Done { proposal },
            Ok(PublishOutcome::AlreadyExists { branch, url }) => IssueOutcome::Skipped {
                reason: SkipReason::AlreadyExists { branch, url },
            },
            Err(e) => failed(PipelineStage::Publishing, e),
        }
    }
}

fn capture(
    root: &Path,
    issue: &Issue,
    config: &RunnerConfig,
) -> Result<RepositorySnapshot, crate::context::ContextError> {
    RepositorySnapshot::capture(root, issue, &config.settings().context)
}

fn failed(stage: PipelineStage, reason: impl Display) -> IssueOutcome {
    IssueOutcome::Failed {
        stage,
        reason: reason.to_string(),
    }
}

fn report(issue: &Issue, outcome: IssueOutcome) -> IssueReport {
    IssueReport {
        number: issue.number,
        title: issue.title.clone(),
        outcome,
    }
}

/// Stage reached by a pipeline, readable after the pipeline is cancelled.
struct StageTracker(AtomicU8);

impl StageTracker {
    fn new() -> Self {
        Self(AtomicU8::new(PipelineStage::Fetched as u8))
    }

    fn set(&self, stage: PipelineStage) {
        self.0.store(stage as u8, Ordering::SeqCst);
    }

    fn get(&self) -> PipelineStage {
        match self.0.load(Ordering::SeqCst) {
            x if x == PipelineStage::Generating as u8 => PipelineStage::Generating,
            x if x == PipelineStage::Applying as u8 => PipelineStage::Applying,
            x if x == PipelineStage::Publishing as u8 => PipelineStage::Publishing,
            _ => PipelineStage::Fetched,
        }
    }
}
