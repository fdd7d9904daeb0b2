//! LLM configuration and the model seam used by the fix generator.

mod config;
mod error;

pub use config::LlmConfig;
pub use error::LlmError;

use crate::config::Secret;
use futures::future::BoxFuture;
use futures::FutureExt;
use serdes_ai::agent::{Agent, AgentBuilder};
use std::sync::Arc;
use std::time::Duration;

/// One completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    /// Instructions given to the model.
    pub system_prompt: String,
    /// User prompt.
    pub prompt: String,
}

/// A language model that turns a prompt into text.
pub trait ModelBackend: Send + Sync {
    /// `provider:model` identifier, recorded with every generated patch.
    fn model_id(&self) -> &str;

    /// Sends `request` and returns the raw text response.
    fn complete<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<String, LlmError>>;
}

/// [`ModelBackend`] backed by a serdes-ai agent.
///
/// The agent has no tools; it can only read the prompt and answer.
pub struct SerdesModelBackend {
    model: Arc<dyn serdes_ai_models::Model>,
    model_id: String,
    temperature: Option<f64>,
    timeout: Duration,
}

impl SerdesModelBackend {
    /// Builds the backend from the `[llm]` configuration and the model key.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Model`] if the provider rejects the configuration.
    pub fn new(config: &LlmConfig, api_key: &Secret, timeout: Duration) -> Result<Self, LlmError> {
        let model = config.build_model(api_key)?;
        tracing::debug!(
            model = %config.model_id(),
            temperature = ?config.temperature(),
            "Built model backend"
        );
        Ok(Self {
            model,
            model_id: config.model_id(),
            temperature: config.temperature(),
            timeout,
        })
    }

    fn build_agent(&self, system_prompt: &str) -> Agent<(), String> {
        let mut builder =
            AgentBuilder::from_arc(Arc::clone(&self.model)).system_prompt(system_prompt.to_string());
        if let Some(temp) = self.temperature {
            builder = builder.temperature(temp);
        }
        builder.build()
    }
}

impl ModelBackend for SerdesModelBackend {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn complete<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<String, LlmError>> {
        async move {
            let agent = self.build_agent(&request.system_prompt);
            let result = tokio::time::timeout(self.timeout, agent.run(request.prompt.clone(), ()))
                .await
                .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))??;
            Ok(result.output)
        }
        .boxed()
    }
}
