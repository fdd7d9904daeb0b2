//! Runner configuration.

use crate::config::{CredentialInputs, FixerConfig, RunSettings, TemplateSettings};
use crate::issues::RepositoryId;
use crate::llm::LlmConfig;

/// Configuration for one run against one repository.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Repository to scan.
    repository: RepositoryId,
    /// Raw credentials, validated when the runner is built.
    credentials: CredentialInputs,
    /// Run behaviour from `[run]`.
    settings: RunSettings,
    /// Formats from `[templates]`.
    templates: TemplateSettings,
    /// Model provider from `[llm]` or `--model`.
    llm: Option<LlmConfig>,
    /// Whether to stop before publishing anything.
    dry_run: bool,
    /// Whether to check the model before fetching issues.
    probe_model: bool,
}

impl RunnerConfig {
    /// Creates a new configuration for a run.
    pub fn new(repository: RepositoryId, credentials: CredentialInputs, config: FixerConfig) -> Self {
        Self {
            repository,
            credentials,
            settings: config.run,
            templates: config.templates,
            llm: config.llm,
            dry_run: false,
            probe_model: false,
        }
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enables or disables the model pre-flight check.
    #[must_use]
    pub fn with_probe_model(mut self, probe_model: bool) -> Self {
        self.probe_model = probe_model;
        self
    }

    /// Returns the target repository.
    pub fn repository(&self) -> &RepositoryId {
        &self.repository
    }

    /// Returns the raw credential inputs.
    pub fn credentials(&self) -> &CredentialInputs {
        &self.credentials
    }

    /// Returns the run settings.
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Returns the template settings.
    pub fn templates(&self) -> &TemplateSettings {
        &self.templates
    }

    /// Returns the model configuration, if any.
    pub fn llm(&self) -> Option<&LlmConfig> {
        self.llm.as_ref()
    }

    /// Returns whether dry-run mode is enabled.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns whether the model is probed before the run.
    pub fn probe_model(&self) -> bool {
        self.probe_model
    }
}
