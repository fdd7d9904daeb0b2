//! LLM provider configuration.

use crate::config::{ConfigError, Secret};
use crate::llm::error::LlmError;
use serdes_ai_models::{build_model_with_config, openrouter::OpenRouterModel, Model};
use std::sync::Arc;

/// Provider-specific configuration parsed from the `[llm]` section.
///
/// API keys are never read from here; the validated model key is passed in
/// when the model is built.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum LlmConfig {
    /// OpenAI provider configuration, also used for OpenAI-compatible endpoints.
    #[serde(rename = "openai")]
    OpenAi {
        /// Model name (e.g., "gpt-4o").
        model: String,
        /// Base URL (optional, e.g. "https://api.x.ai/v1").
        #[serde(rename = "base-url")]
        base_url: Option<String>,
        /// Timeout in seconds (optional).
        #[serde(rename = "timeout-secs")]
        timeout_secs: Option<u64>,
        /// Sampling temperature (optional).
        temperature: Option<f64>,
    },

    /// OpenRouter provider configuration.
    #[serde(rename = "openrouter")]
    OpenRouter {
        /// Model name (e.g., "anthropic/claude-3-opus").
        model: String,
        /// HTTP Referer header (optional).
        #[serde(rename = "http-referer")]
        http_referer: Option<String>,
        /// App title header (optional).
        #[serde(rename = "app-title")]
        app_title: Option<String>,
        /// Sampling temperature (optional).
        temperature: Option<f64>,
    },

    /// Anthropic provider configuration.
    Anthropic {
        /// Model name (e.g., "claude-3-5-sonnet-20241022").
        model: String,
        /// Base URL (optional).
        #[serde(rename = "base-url")]
        base_url: Option<String>,
        /// Timeout in seconds (optional).
        #[serde(rename = "timeout-secs")]
        timeout_secs: Option<u64>,
        /// Sampling temperature (optional).
        temperature: Option<f64>,
    },

    /// Gemini provider configuration.
    Gemini {
        /// Model name (e.g., "gemini-2.0-flash").
        model: String,
        /// Base URL (optional).
        #[serde(rename = "base-url")]
        base_url: Option<String>,
        /// Timeout in seconds (optional).
        #[serde(rename = "timeout-secs")]
        timeout_secs: Option<u64>,
        /// Sampling temperature (optional).
        temperature: Option<f64>,
    },
}

impl LlmConfig {
    /// Parses a `provider:model` spec such as `openai:gpt-4o`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidModelSpec`] for unknown providers or an
    /// empty model name.
    pub fn from_spec(spec: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidModelSpec {
            value: spec.to_string(),
        };
        let (provider, model) = spec.split_once(':').ok_or_else(invalid)?;
        let model = model.trim();
        if model.is_empty() {
            return Err(invalid());
        }
        let model = model.to_string();
        match provider.trim() {
            "openai" => Ok(Self::OpenAi {
                model,
                base_url: None,
                timeout_secs: None,
                temperature: None,
            }),
            "openrouter" => Ok(Self::OpenRouter {
                model,
                http_referer: None,
                app_title: None,
                temperature: None,
            }),
            "anthropic" => Ok(Self::Anthropic {
                model,
                base_url: None,
                timeout_secs: None,
                temperature: None,
            }),
            "gemini" => Ok(Self::Gemini {
                model,
                base_url: None,
                timeout_secs: None,
                temperature: None,
            }),
            _ => Err(invalid()),
        }
    }

    /// Provider name as used in model specs.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::OpenRouter { .. } => "openrouter",
            Self::Anthropic { .. } => "anthropic",
            Self::Gemini { .. } => "gemini",
        }
    }

    /// Model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::OpenAi { model, .. }
            | Self::OpenRouter { model, .. }
            | Self::Anthropic { model, .. }
            | Self::Gemini { model, .. } => model,
        }
    }

    /// `provider:model` identifier recorded in generation metadata.
    #[must_use]
    pub fn model_id(&self) -> String {
        format!("{}:{}", self.provider(), self.model_name())
    }

    /// Returns the configured temperature, if any.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        match self {
            Self::OpenAi { temperature, .. }
            | Self::OpenRouter { temperature, .. }
            | Self::Anthropic { temperature, .. }
            | Self::Gemini { temperature, .. } => *temperature,
        }
    }

    /// Builds a model from the configuration and the model key.
    pub(crate) fn build_model(&self, api_key: &Secret) -> Result<Arc<dyn Model>, LlmError> {
        match self {
            Self::OpenRouter {
                model,
                http_referer,
                app_title,
                ..
            } => {
                let mut model = OpenRouterModel::new(model, api_key.expose());
                if let Some(referer) = http_referer {
                    model = model.with_http_referer(referer);
                }
                if let Some(title) = app_title {
                    model = model.with_app_title(title);
                }
                Ok(Arc::new(model))
            }
            Self::OpenAi {
                model,
                base_url,
                timeout_secs,
                ..
            } => build_configured_model("openai", model, api_key, base_url, timeout_secs),
            Self::Anthropic {
                model,
                base_url,
                timeout_secs,
                ..
            } => build_configured_model("anthropic", model, api_key, base_url, timeout_secs),
            Self::Gemini {
                model,
                base_url,
                timeout_secs,
                ..
            } => build_configured_model("gemini", model, api_key, base_url, timeout_secs),
        }
    }
}

/// Builds a configured model for generic providers.
fn build_configured_model(
    provider: &str,
    model: &str,
    api_key: &Secret,
    base_url: &Option<String>,
    timeout_secs: &Option<u64>,
) -> Result<Arc<dyn Model>, LlmError> {
    let timeout = timeout_secs.map(core::time::Duration::from_secs);
    build_model_with_config(
        provider,
        model,
        Some(api_key.expose()),
        base_url.as_deref(),
        timeout,
    )
    .map_err(LlmError::Model)
}
