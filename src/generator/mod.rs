//! Turns a vulnerability report into a validated action plan via the generative backend.

pub mod prompt;
pub mod script;
pub mod validate;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{ReproError, RetryPolicy};
use crate::knowledge::KnowledgeBase;
use crate::llm::LLMProvider;
use crate::models::{Category, VulnerabilityReport};
use crate::sandbox::plan::strip_code_fence;
use prompt::{system_prompt, user_prompt, PromptVariables};

pub use script::{GeneratedScript, ValidationStatus};

pub struct ScriptGenerator {
    llm: Arc<dyn LLMProvider>,
    knowledge: Arc<KnowledgeBase>,
    target_url: String,
    max_attempts: u32,
}

impl ScriptGenerator {
    pub fn new(llm: Arc<dyn LLMProvider>, knowledge: Arc<KnowledgeBase>, target_url: &str) -> Self {
        Self {
            llm,
            knowledge,
            target_url: target_url.to_string(),
            max_attempts: 3,
        }
    }

    /// Attempt budget of the surrounding loop, mentioned in retry prompts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// One backend call. The returned script has not been validated yet.
    pub async fn generate(
        &self,
        vulnerability: &VulnerabilityReport,
        category: Category,
        attempt_index: u32,
    ) -> Result<GeneratedScript, ReproError> {
        let vars = PromptVariables::new(
            &self.target_url,
            &vulnerability.name,
            &vulnerability.details,
            category,
            attempt_index,
            self.max_attempts,
        )
        .with_knowledge(self.knowledge.get(category));

        let system = system_prompt(&vars);
        let user = user_prompt(&vars);
        debug!(
            vulnerability = %vulnerability.name,
            provider = %self.llm.provider_name(),
            model = %self.llm.model_name(),
            prompt_chars = system.len() + user.len(),
            "Requesting exploit plan"
        );

        let response = self.llm.complete(&user, Some(&system)).await?;
        if response.is_blank() {
            return Err(ReproError::GenerationEmpty(format!(
                "{} returned no content",
                self.llm.provider_name()
            )));
        }

        Ok(GeneratedScript::new(strip_code_fence(&response.content), category, attempt_index))
    }

    /// Generate until a script passes structural validation or `policy` runs out.
    ///
    /// Every failure is regenerated until the budget is spent, then the last
    /// error is returned. Classification only picks the backoff delay.
    /// Cancellation returns at once.
    pub async fn generate_with_retry(
        &self,
        vulnerability: &VulnerabilityReport,
        category: Category,
        attempt_index: u32,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<GeneratedScript, ReproError> {
        let mut last_error = None;

        for call in 1..=policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(ReproError::Cancelled("generation interrupted".into()));
            }

            let outcome = self
                .generate(vulnerability, category, attempt_index)
                .await
                .and_then(GeneratedScript::validate);

            match outcome {
                Ok(script) => {
                    info!(vulnerability = %vulnerability.name, attempt = attempt_index, call, "Exploit plan accepted");
                    return Ok(script);
                }
                Err(e @ ReproError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    let classification = e.classify();
                    warn!(
                        vulnerability = %vulnerability.name,
                        attempt = attempt_index,
                        call,
                        retryable = classification.retryable,
                        error = %e,
                        "Exploit plan rejected"
                    );

                    if call < policy.max_attempts && policy.backoff {
                        let delay = classification.retry_delay(call - 1);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                return Err(ReproError::Cancelled("generation interrupted".into()));
                            }
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ReproError::Internal("empty retry budget".into())))
    }
}
