use async_trait::async_trait;
use crate::errors::ReproError;
use super::types::LLMResponse;

/// A generative backend: system + user prompt in, completion text out.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Free-form text completion. Absent content is reported as `GenerationEmpty`.
    async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LLMResponse, ReproError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;
}
