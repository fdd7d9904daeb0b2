//! Configuration error types.

use thiserror::Error;

/// Errors that can occur before a run starts.
///
/// Every variant is fatal: the run must not proceed to any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML content.
    #[error("Failed to parse config '{path}': {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Validation error in the configuration.
    #[error("Validation error in '{path}': {message}")]
    ValidationError { path: String, message: String },

    /// One or more required credentials are missing or empty.
    #[error("Missing or empty credentials: {}", names.join(", "))]
    MissingCredentials { names: Vec<String> },

    /// Repository identifier is not of the form `owner/name`.
    #[error("Invalid repository '{value}': expected 'owner/name'")]
    InvalidRepository { value: String },

    /// No model was configured.
    #[error("LLM model not configured; pass --model or add an [llm] section to the config")]
    MissingModel,

    /// Model spec is not of the form `provider:model`.
    #[error("Invalid model spec '{value}': expected 'provider:model' with provider one of openai, openrouter, anthropic, gemini")]
    InvalidModelSpec { value: String },
}
