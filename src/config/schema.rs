use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "llm": {
                "type": "object",
                "properties": {
                    "provider": { "type": "string", "enum": ["openai", "anthropic", "openrouter", "local"] },
                    "model": { "type": "string" },
                    "api_key": { "type": "string" },
                    "base_url": { "type": "string" }
                }
            },
            "scan": {
                "type": "object",
                "properties": {
                    "max_attempts": { "type": "integer", "minimum": 1, "maximum": 10 },
                    "generation_retries": { "type": "integer", "minimum": 1, "maximum": 10 },
                    "attempt_timeout_secs": { "type": "integer", "minimum": 1 },
                    "probe_timeout_ms": { "type": "integer", "minimum": 100 },
                    "prioritize_by_severity": { "type": "boolean" },
                    "use_runners": { "type": "boolean" }
                }
            },
            "browser": {
                "type": "object",
                "properties": {
                    "image": { "type": "string" },
                    "name": { "type": "string" },
                    "network_mode": { "type": "string" },
                    "shm_size_mb": { "type": "integer", "minimum": 64 },
                    "playwright_version": { "type": "string" }
                }
            },
            "knowledge": {
                "type": "object",
                "properties": {
                    "file": { "type": "string" }
                }
            },
            "output": {
                "type": "object",
                "properties": {
                    "directory": { "type": "string" }
                }
            }
        }
    })
});
