use super::types::ReproError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl ReproError {
    /// Classify this error to determine its type and whether it can be retried.
    pub fn classify(&self) -> ErrorClassification {
        let (error_type, retryable) = match self {
            // Transient backend and transport failures
            ReproError::RateLimit(_) => ("RateLimitError", true),
            ReproError::Network(_) => ("NetworkError", true),
            ReproError::Timeout(_) => ("TimeoutError", true),
            ReproError::LLMApi(_) => ("LLMApiError", true),
            ReproError::GenerationEmpty(_) => ("GenerationEmptyError", true),
            ReproError::Validation(_) => ("ValidationError", true),
            ReproError::Browser(_) => ("BrowserError", true),
            ReproError::Container(_) => ("ContainerError", true),
            ReproError::Docker(_) => ("DockerError", true),
            ReproError::Io(_) => ("IoError", true),
            ReproError::Internal(_) => ("InternalError", true),

            // Script-level failures: regenerating is the only remedy
            ReproError::Parse(_) => ("ParseError", false),
            ReproError::MissingEntryRoutine => ("MissingEntryRoutineError", false),
            ReproError::EntryNotAsync => ("EntryNotAsyncError", false),
            ReproError::Runtime(_) => ("RuntimeError", false),

            // Scan-level or operator errors
            ReproError::Config(_) => ("ConfigError", false),
            ReproError::Authentication(_) => ("AuthenticationError", false),
            ReproError::Unreachable(_) => ("UnreachableError", false),
            ReproError::Persist(_) => ("PersistError", false),
            ReproError::Feed(_) => ("FeedError", false),
            ReproError::Cancelled(_) => ("CancelledError", false),
            ReproError::Json(_) => ("JsonError", false),
            ReproError::Yaml(_) => ("YamlError", false),
        };
        ErrorClassification { error_type, retryable }
    }

    /// Process exit code used by the binary when this error ends a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReproError::Config(_) => 2,
            ReproError::Container(_) | ReproError::Docker(_) => 3,
            ReproError::Authentication(_) => 4,
            ReproError::Unreachable(_) => 5,
            _ => 1,
        }
    }
}
