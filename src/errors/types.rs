use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReproError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("LLM API error: {0}")]
    LLMApi(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The generative backend answered without any content.
    #[error("Generation returned no content: {0}")]
    GenerationEmpty(String),

    /// A generated script is missing one or more structural markers.
    #[error("Script validation failed: {0}")]
    Validation(String),

    #[error("Script parse error: {0}")]
    Parse(String),

    #[error("missing entry routine")]
    MissingEntryRoutine,

    #[error("entry routine must be asynchronous")]
    EntryNotAsync,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Container error: {0}")]
    Container(String),

    /// The target did not answer the initial reachability probe.
    #[error("Target unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to persist result: {0}")]
    Persist(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
