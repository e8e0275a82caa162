/// Which client implementation serves a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    OpenAI,
    Anthropic,
    OpenAICompatible,
    /// Self-hosted; no API key required.
    Local,
}

pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub env_var: &'static str,
    pub backend: Backend,
    pub base_url: Option<&'static str>,
    pub default_model: &'static str,
}

pub static PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        id: "openai",
        name: "OpenAI",
        env_var: "OPENAI_API_KEY",
        backend: Backend::OpenAI,
        base_url: None,
        default_model: "gpt-4o",
    },
    ProviderInfo {
        id: "anthropic",
        name: "Anthropic",
        env_var: "ANTHROPIC_API_KEY",
        backend: Backend::Anthropic,
        base_url: None,
        default_model: "claude-sonnet-4-5-20250929",
    },
    ProviderInfo {
        id: "openrouter",
        name: "OpenRouter",
        env_var: "OPENROUTER_API_KEY",
        backend: Backend::OpenAICompatible,
        base_url: Some("https://openrouter.ai/api/v1"),
        default_model: "openai/gpt-4o",
    },
    ProviderInfo {
        id: "local",
        name: "Local / Ollama",
        env_var: "",
        backend: Backend::Local,
        base_url: Some("http://localhost:11434/v1"),
        default_model: "qwen2.5-coder:7b",
    },
];

pub fn get_provider(id: &str) -> Option<&'static ProviderInfo> {
    PROVIDERS.iter().find(|p| p.id == id)
}

/// Environment variable holding the API key for `id`, if the provider needs one.
pub fn api_key_env_var(id: &str) -> Option<&'static str> {
    get_provider(id).map(|p| p.env_var).filter(|v| !v.is_empty())
}
