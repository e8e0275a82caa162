use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub model: String,
}

impl LLMResponse {
    pub fn text(content: &str, model: &str) -> Self {
        Self {
            content: content.to_string(),
            input_tokens: None,
            output_tokens: None,
            model: model.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
