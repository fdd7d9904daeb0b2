//! Fix generation.
//!
//! [`FixGenerator`] turns an issue and a repository snapshot into a
//! [`PatchCandidate`] by asking the configured [`ModelBackend`]. It never
//! touches the working copy.

mod error;
mod prompt;
mod response;

pub use error::FixError;
pub use prompt::PROMPT_VERSION;

use crate::context::RepositorySnapshot;
use crate::issues::Issue;
use crate::llm::{LlmError, ModelBackend, ModelRequest};
use crate::patch::{GenerationMetadata, PatchCandidate};
use crate::retry::{RetryPolicy, Sleeper};
use chrono::Utc;
use response::ParsedAnswer;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

/// Result of asking the model for a fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// A patch to apply.
    Patch(PatchCandidate),
    /// The model declined, or proposed nothing that changes a file.
    NoFixFound {
        /// Explanation recorded in the run report.
        reason: String,
    },
}

/// Generates patch candidates with a language model.
#[derive(Clone)]
pub struct FixGenerator {
    model: Arc<dyn ModelBackend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl FixGenerator {
    /// Creates a generator that retries model calls with `policy`.
    pub fn new(model: Arc<dyn ModelBackend>, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            model,
            policy,
            sleeper,
        }
    }

    /// Identifier of the model in use.
    #[must_use]
    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Asks the model for a fix to `issue`.
    ///
    /// # Errors
    ///
    /// - [`FixError::ModelUnavailable`] once retries are spent.
    /// - [`FixError::MalformedResponse`] if the answer is not a usable patch.
    pub async fn generate(
        &self,
        issue: &Issue,
        snapshot: &RepositorySnapshot,
    ) -> Result<FixOutcome, FixError> {
        let span = tracing::info_span!("generate_fix", issue = issue.number, model = %self.model_id());
        async {
            let request = ModelRequest {
                system_prompt: prompt::SYSTEM_PROMPT.to_string(),
                prompt: prompt::build_prompt(issue, snapshot),
            };
            debug!(prompt_len = request.prompt.len(), files = snapshot.files().len(), "Sending prompt");

            let text = self.complete(&request, "generate_fix").await?;
            let generated_at = Utc::now();
            debug!(response_len = text.len(), "Received model response");

            match response::parse_answer(&text, snapshot)? {
                ParsedAnswer::NoFix { reason } => {
                    info!(reason = %reason, "Model found no fix");
                    Ok(FixOutcome::NoFixFound { reason })
                }
                ParsedAnswer::Edits { summary, edits } => {
                    info!(edits = edits.len(), "Model proposed a fix");
                    Ok(FixOutcome::Patch(PatchCandidate {
                        issue_number: issue.number,
                        edits,
                        summary,
                        metadata: GenerationMetadata {
                            model: self.model_id().to_string(),
                            prompt_version: PROMPT_VERSION,
                            generated_at,
                        },
                    }))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Sends a trivial prompt to check the model is reachable and answering.
    ///
    /// # Errors
    ///
    /// Returns [`FixError::ModelUnavailable`] if the backend fails after retries,
    /// or [`FixError::MalformedResponse`] if the answer lacks the expected words.
    pub async fn probe(&self) -> Result<(), FixError> {
        let request = ModelRequest {
            system_prompt: prompt::PROBE_SYSTEM_PROMPT.to_string(),
            prompt: prompt::PROBE_PROMPT.to_string(),
        };
        let text = self.complete(&request, "probe_model").await?;
        if !text.to_lowercase().contains(prompt::PROBE_MARKER) {
            return Err(FixError::malformed(
                "model did not answer the connectivity check as asked",
            ));
        }
        info!(model = %self.model_id(), response_len = text.len(), "Model probe succeeded");
        Ok(())
    }

    async fn complete(&self, request: &ModelRequest, operation: &str) -> Result<String, FixError> {
        let text = self
            .policy
            .run(
                self.sleeper.as_ref(),
                operation,
                LlmError::is_retryable,
                |_| self.model.complete(request),
            )
            .await
            .map_err(|exhausted| FixError::ModelUnavailable {
                attempts: exhausted.attempts,
                message: exhausted.error.to_string(),
            })?;
        if text.trim().is_empty() {
            return Err(FixError::malformed("empty response"));
        }
        Ok(text)
    }
}
