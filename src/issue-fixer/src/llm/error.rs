//! LLM error types.

use thiserror::Error;

/// Error type for model construction and requests.
#[derive(Debug, Error)]
pub enum LlmError {
    /// LLM request timed out.
    #[error("LLM timed out after {0} seconds")]
    Timeout(u64),

    /// Model construction error.
    #[error("Model error: {0}")]
    Model(#[from] serdes_ai_models::ModelError),

    /// Agent run error (transport, provider or rate-limit failure).
    #[error("Agent run error: {0}")]
    AgentRun(#[from] serdes_ai::agent::AgentRunError),

    /// Backend failure reported by a non-serdes backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl LlmError {
    /// Returns true if the request may succeed when repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::AgentRun(_) | Self::Backend(_))
    }
}
