use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ReproError;
use super::http::{self, MAX_TOKENS, TEMPERATURE};
use super::provider::LLMProvider;
use super::types::LLMResponse;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// Chat-completions client: OpenAI itself, hosted compatibles, and local servers.
pub struct OpenAIProvider {
    client: Client,
    name: String,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str, model: Option<&str>) -> Self {
        Self::with_base_url("openai", api_key, model.unwrap_or("gpt-4o"), "https://api.openai.com/v1")
    }

    pub fn with_base_url(name: &str, api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: http::client(),
            name: name.to_string(),
            api_key: Some(api_key.to_string()).filter(|k| !k.is_empty()),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request<'a>(&'a self, prompt: &'a str, system: Option<&'a str>) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(content) = system {
            messages.push(ChatMessage { role: "system", content });
        }
        messages.push(ChatMessage { role: "user", content: prompt });
        ChatRequest { model: &self.model, messages, max_tokens: MAX_TOKENS, temperature: TEMPERATURE }
    }

    fn extract(&self, data: ChatResponse) -> Result<LLMResponse, ReproError> {
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ReproError::GenerationEmpty(format!("{} returned no choices", self.name)))?;
        let usage = data.usage.unwrap_or(Usage { prompt_tokens: None, completion_tokens: None });
        Ok(LLMResponse {
            content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str, system: Option<&str>) -> Result<LLMResponse, ReproError> {
        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&self.request(prompt, system));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| http::send_error(&self.name, e))?;
        let resp = http::check_status(&self.name, resp).await?;
        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ReproError::LLMApi(format!("Unreadable {} response: {}", self.name, e)))?;

        let response = self.extract(data)?;
        debug!(
            provider = %self.name,
            model = %self.model,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Chat completion"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
