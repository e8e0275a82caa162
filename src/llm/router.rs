use crate::errors::ReproError;
use super::anthropic::AnthropicProvider;
use super::catalog::{self, Backend};
use super::openai::OpenAIProvider;
use super::provider::LLMProvider;

/// Build the backend client for a catalog provider id.
pub fn create_provider(
    provider_name: &str,
    api_key: &str,
    model: Option<&str>,
    base_url: Option<&str>,
) -> Result<Box<dyn LLMProvider>, ReproError> {
    let info = catalog::get_provider(provider_name)
        .ok_or_else(|| ReproError::Config(format!("Unknown LLM provider: {}", provider_name)))?;

    if info.backend != Backend::Local && api_key.is_empty() {
        let hint = catalog::api_key_env_var(provider_name).unwrap_or("--api-key");
        return Err(ReproError::Config(format!(
            "No API key for provider '{}' (set {})",
            provider_name, hint
        )));
    }

    let model = model.unwrap_or(info.default_model);
    let provider: Box<dyn LLMProvider> = match info.backend {
        Backend::Anthropic => Box::new(AnthropicProvider::new(api_key, Some(model))),
        Backend::OpenAI if base_url.is_none() => Box::new(OpenAIProvider::new(api_key, Some(model))),
        Backend::OpenAI | Backend::OpenAICompatible | Backend::Local => {
            let url = base_url.or(info.base_url).unwrap_or("https://api.openai.com/v1");
            Box::new(OpenAIProvider::with_base_url(info.id, api_key, model, url))
        }
    };
    Ok(provider)
}
