use std::path::Path;
use crate::errors::ReproError;
use super::types::ReproConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<ReproConfig, ReproError> {
    if !path.exists() {
        return Err(ReproError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(ReproError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<ReproConfig, ReproError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(ReproConfig::default());
    }

    // JSON Schema validation
    validate_schema(&yaml)?;

    // Parse into typed config
    let config: ReproConfig = serde_yaml::from_value(yaml)?;

    // Semantic conflict detection
    validate_conflicts(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ReproError> {
    // Convert YAML value to JSON for schema validation
    let json_value: serde_json::Value = serde_json::to_value(yaml)
        .map_err(|e| ReproError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ReproError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory: typed parsing below is the hard gate
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Detect semantic conflicts in the parsed configuration.
fn validate_conflicts(config: &ReproConfig) -> Result<(), ReproError> {
    if let Some(scan) = &config.scan {
        if scan.max_attempts == Some(0) {
            return Err(ReproError::Config("scan.max_attempts must be at least 1".into()));
        }
        if scan.generation_retries == Some(0) {
            return Err(ReproError::Config("scan.generation_retries must be at least 1".into()));
        }
        if scan.attempt_timeout_secs == Some(0) {
            return Err(ReproError::Config("scan.attempt_timeout_secs must be at least 1".into()));
        }
    }

    if let Some(llm) = &config.llm {
        if llm.api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            warn!("API key stored in config file; prefer the provider environment variable");
        }
    }

    Ok(())
}
