use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReproConfig {
    pub llm: Option<LLMConfig>,
    pub scan: Option<ScanSettings>,
    pub browser: Option<BrowserHostConfig>,
    pub knowledge: Option<KnowledgeConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LLMConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ScanSettings {
    /// Attempts per vulnerability.
    pub max_attempts: Option<u32>,
    /// Generation calls allowed within one attempt before it is recorded as failed.
    pub generation_retries: Option<u32>,
    pub attempt_timeout_secs: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
    pub prioritize_by_severity: Option<bool>,
    pub use_runners: Option<bool>,
}

/// Docker container that hosts the isolated browser sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserHostConfig {
    pub image: Option<String>,
    pub name: Option<String>,
    pub network_mode: Option<String>,
    pub shm_size_mb: Option<i64>,
    pub playwright_version: Option<String>,
}

impl Default for BrowserHostConfig {
    fn default() -> Self {
        Self {
            image: Some("mcr.microsoft.com/playwright:v1.47.0-jammy".to_string()),
            name: Some("vulnrepro-browser".to_string()),
            network_mode: Some("host".to_string()),
            shm_size_mb: Some(1024),
            playwright_version: Some("1.47.0".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct KnowledgeConfig {
    /// YAML file with per-category overrides.
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct OutputConfig {
    pub directory: Option<String>,
}
