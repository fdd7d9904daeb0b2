//! Credential gate.
//!
//! Secrets arrive out-of-band (CLI flags or environment resolved by the CLI)
//! and are validated here before any client is built.

use crate::config::ConfigError;
use std::fmt;
use tracing::info;

/// Name of the source-control access token.
pub const SOURCE_TOKEN_NAME: &str = "GH_TOKEN";

/// Name of the language-model backend access key.
pub const MODEL_KEY_NAME: &str = "LLM_API_KEY";

/// A secret value that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a raw secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value for handing to an authenticated client.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(len={})", self.0.len())
    }
}

/// Raw, unvalidated credential values as resolved by the caller.
#[derive(Clone, Default)]
pub struct CredentialInputs {
    /// Source-control access token.
    pub source_token: Option<String>,
    /// Language-model backend key.
    pub model_key: Option<String>,
}

impl fmt::Debug for CredentialInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInputs")
            .field("source_token_len", &self.source_token.as_ref().map(String::len))
            .field("model_key_len", &self.model_key.as_ref().map(String::len))
            .finish()
    }
}

/// Validated credentials threaded explicitly to every component.
#[derive(Debug, Clone)]
pub struct Credentials {
    source_token: Secret,
    model_key: Secret,
}

impl Credentials {
    /// Runs the credential gate over the raw inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] naming every credential
    /// that is absent, empty or whitespace-only.
    pub fn from_inputs(inputs: &CredentialInputs) -> Result<Self, ConfigError> {
        let values = validate_credentials(&[
            (SOURCE_TOKEN_NAME, inputs.source_token.as_deref()),
            (MODEL_KEY_NAME, inputs.model_key.as_deref()),
        ])?;
        let mut values = values.into_iter();
        match (values.next(), values.next()) {
            (Some(source_token), Some(model_key)) => Ok(Self {
                source_token,
                model_key,
            }),
            _ => Err(ConfigError::MissingCredentials {
                names: vec![SOURCE_TOKEN_NAME.to_string(), MODEL_KEY_NAME.to_string()],
            }),
        }
    }

    /// Returns the source-control token.
    #[must_use]
    pub fn source_token(&self) -> &Secret {
        &self.source_token
    }

    /// Returns the model backend key.
    #[must_use]
    pub fn model_key(&self) -> &Secret {
        &self.model_key
    }
}

/// Checks that every named secret has a non-empty value.
///
/// Values are trimmed; only names and lengths are logged.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredentials`] listing all failing names.
pub fn validate_credentials(required: &[(&str, Option<&str>)]) -> Result<Vec<Secret>, ConfigError> {
    let mut missing = Vec::new();
    let mut secrets = Vec::with_capacity(required.len());

    for (name, value) in required {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => {
                info!(name = %name, length = value.len(), "Credential present");
                secrets.push(Secret::new(value));
            }
            None => missing.push((*name).to_string()),
        }
    }

    if missing.is_empty() {
        Ok(secrets)
    } else {
        Err(ConfigError::MissingCredentials { names: missing })
    }
}
