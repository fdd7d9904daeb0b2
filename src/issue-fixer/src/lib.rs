#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod context;
pub mod fix;
pub mod github;
pub mod issues;
pub mod llm;
pub mod patch;
pub mod proposals;
pub mod rate_limit;
pub mod remote;
pub mod retry;
pub mod runner;
pub mod summary;
pub mod templates;
pub mod workspace;

pub use config::{
    load_config, ConfigError, CredentialInputs, Credentials, FixerConfig, RunSettings, Secret,
    TemplateSettings,
};
pub use context::{ContextError, RepositorySnapshot, SnapshotFile};
pub use fix::{FixError, FixGenerator, FixOutcome, PROMPT_VERSION};
pub use github::GitHubClient;
pub use issues::{Issue, IssueError, IssueLister, IssuePage, IssueSource, IssueState, RepositoryId};
pub use llm::{LlmConfig, LlmError, ModelBackend, ModelRequest, SerdesModelBackend};
pub use patch::{ApplyError, FileEdit, GenerationMetadata, PatchApplier, PatchCandidate};
pub use proposals::{
    ExistingProposal, Forge, OpenedReviewRequest, Proposal, ProposalDraft, PublishError,
    PublishOutcome, Publisher, ReviewRequest,
};
pub use rate_limit::{
    check_core_rate_limit, ensure_core_rate_limit, wait_if_needed, RateLimitError, RateLimitInfo,
};
pub use remote::RemoteError;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use runner::{Components, Runner, RunnerConfig, RunnerError};
pub use summary::{IssueOutcome, IssueReport, PipelineStage, RunReport, SkipReason};
pub use templates::{TemplateError, TemplateRenderer};
pub use workspace::{CliGit, GitBackend, GitError, Workspace};
