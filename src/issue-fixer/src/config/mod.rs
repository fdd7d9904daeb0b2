//! Configuration and credential loading.
//!
//! This module handles parsing `issue-fixer.toml` and validating the
//! credentials a run needs before any client is built.

pub mod credentials;
mod error;
mod settings;

pub use credentials::{
    validate_credentials, CredentialInputs, Credentials, Secret, MODEL_KEY_NAME,
    SOURCE_TOKEN_NAME,
};
pub use error::ConfigError;
pub use settings::{
    default_branch_name_format, default_commit_title_format, default_issue_comment,
    default_pr_body, default_pr_title_format, ContextSettings, RetrySettings, RunSettings,
    TemplateSettings,
};

use crate::llm::LlmConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Parsed contents of `issue-fixer.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    /// Run behaviour.
    pub run: RunSettings,
    /// Language-model provider.
    pub llm: Option<LlmConfig>,
    /// Branch, commit and review request formats.
    pub templates: TemplateSettings,
}

impl FixerConfig {
    /// Checks values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for out-of-range values.
    pub fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::ValidationError {
            path: path.display().to_string(),
            message: message.to_string(),
        };

        if self.run.concurrency == 0 {
            return Err(invalid("run.concurrency must be at least 1"));
        }
        if self.run.retry.max_attempts == 0 {
            return Err(invalid("run.retry.max-attempts must be at least 1"));
        }
        if self.run.max_issues == Some(0) {
            return Err(invalid("run.max-issues must be at least 1"));
        }
        let timeouts = [
            ("run.issue-timeout-secs", self.run.issue_timeout_secs),
            ("run.request-timeout-secs", self.run.request_timeout_secs),
            ("run.model-timeout-secs", self.run.model_timeout_secs),
            ("run.push-timeout-secs", self.run.push_timeout_secs),
        ];
        if let Some((key, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(invalid(&format!("{key} must be at least 1")));
        }
        if self.run.run_deadline_secs == Some(0) {
            return Err(invalid("run.run-deadline-secs must be at least 1"));
        }
        if self.run.context.max_files == 0 {
            return Err(invalid("run.context.max-files must be at least 1"));
        }
        if !self.templates.branch_name_format.contains("{{number}}") {
            return Err(invalid(
                "templates.branch-name-format must contain {{number}}",
            ));
        }
        match url::Url::parse(&self.run.git_host) {
            Ok(host) if matches!(host.scheme(), "https" | "http") && host.has_host() => {}
            _ => return Err(invalid("run.git-host must be an http(s) URL")),
        }
        if let Some(temperature) = self.llm.as_ref().and_then(LlmConfig::temperature) {
            if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
                return Err(invalid("llm.temperature must be finite and in range 0.0-2.0"));
            }
        }
        Ok(())
    }
}

/// Loads the config file, falling back to defaults when it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path) -> Result<FixerConfig, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(FixerConfig::default());
    }

    debug!(path = %path.display(), "Loading config");
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    let config: FixerConfig = toml::from_str(&contents).map_err(|source| ConfigError::TomlError {
        path: path.display().to_string(),
        source,
    })?;
    config.validate(path)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = temp.path().join("issue-fixer.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_config_uses_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("missing.toml")).unwrap();

        assert!(config.llm.is_none());
        assert_eq!(config.run.concurrency, 2);
        assert_eq!(config.run.retry.max_attempts, 4);
        assert_eq!(config.templates.branch_name_format, "issuefix/{{number}}");
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[run]
labels = ["good-first-issue"]
max-issues = 3
concurrency = 1
processed-label = "auto-fix-proposed"
run-deadline-secs = 1800

[run.retry]
max-attempts = 2
jitter-ms = 0

[run.context]
max-files = 4

[llm]
provider = "openai"
model = "grok-3-latest"
base-url = "https://api.x.ai/v1"
temperature = 0.0

[templates]
branch-name-format = "bot/fix-{{number}}"
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.run.labels, vec!["good-first-issue"]);
        assert_eq!(config.run.max_issues, Some(3));
        assert_eq!(config.run.concurrency, 1);
        assert_eq!(config.run.processed_label.as_deref(), Some("auto-fix-proposed"));
        assert_eq!(config.run.run_deadline_secs, Some(1800));
        assert_eq!(config.run.retry.max_attempts, 2);
        assert_eq!(config.run.retry.jitter_ms, 0);
        assert_eq!(config.run.retry.base_delay_ms, 500);
        assert_eq!(config.run.context.max_files, 4);
        assert_eq!(config.templates.branch_name_format, "bot/fix-{{number}}");
        assert_eq!(config.templates.pr_title_format, "Fix: {{title}}");

        match config.llm {
            Some(LlmConfig::OpenAi {
                model, base_url, ..
            }) => {
                assert_eq!(model, "grok-3-latest");
                assert_eq!(base_url.as_deref(), Some("https://api.x.ai/v1"));
            }
            other => panic!("expected openai, got {other:?}"),
        }
    }

    #[test]
    fn load_config_reports_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "not = [valid");
        let error = load_config(&path).unwrap_err();
        assert!(matches!(error, ConfigError::TomlError { .. }));
    }

    #[test]
    fn load_config_rejects_zero_concurrency() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "[run]\nconcurrency = 0\n");
        let error = load_config(&path).unwrap_err();
        assert!(matches!(error, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn load_config_rejects_zero_timeouts() {
        let temp = TempDir::new().unwrap();
        for key in [
            "issue-timeout-secs",
            "request-timeout-secs",
            "model-timeout-secs",
            "push-timeout-secs",
            "run-deadline-secs",
        ] {
            let path = write_config(&temp, &format!("[run]\n{key} = 0\n"));
            match load_config(&path) {
                Err(ConfigError::ValidationError { message, .. }) => {
                    assert!(message.contains(key), "{message}");
                }
                other => panic!("{key} = 0 should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_config_rejects_branch_format_without_number() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, "[templates]\nbranch-name-format = \"fix/{{title}}\"\n");
        let error = load_config(&path).unwrap_err();
        assert!(matches!(error, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn load_config_rejects_out_of_range_temperature() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[llm]
provider = "anthropic"
model = "claude-3-5-sonnet-20241022"
temperature = 3.5
"#,
        );
        let error = load_config(&path).unwrap_err();
        assert!(matches!(error, ConfigError::ValidationError { .. }));
    }
}
