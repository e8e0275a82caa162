use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::BrowserHostConfig;
use crate::errors::ReproError;
use crate::models::{AggregatedVerdict, VerdictStatus};

pub const MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Lifecycle of the attempt loop for one vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorState {
    Pending,
    Running,
    Succeeded,
    /// Stopped early by cancellation.
    Failed,
    Exhausted,
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Exhausted)
    }

    pub fn verdict_status(&self) -> VerdictStatus {
        match self {
            Self::Succeeded => VerdictStatus::Succeeded,
            Self::Exhausted => VerdictStatus::Exhausted,
            Self::Pending | Self::Running | Self::Failed => VerdictStatus::Failed,
        }
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Fully resolved settings for one scan: CLI flags over config file over defaults.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub scan_id: String,
    pub target: String,
    pub feed_path: PathBuf,
    pub output_dir: PathBuf,
    pub provider: String,
    pub model: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub max_attempts: u32,
    pub generation_retries: u32,
    pub attempt_timeout: Duration,
    pub probe_timeout: Duration,
    pub prioritize_by_severity: bool,
    pub use_runners: bool,
    pub headless: bool,
    pub browser: BrowserHostConfig,
    pub knowledge_file: Option<PathBuf>,
}

impl ScanConfig {
    pub fn new(target: &str, feed_path: PathBuf) -> Self {
        Self {
            scan_id: uuid::Uuid::new_v4().to_string(),
            target: target.to_string(),
            feed_path,
            output_dir: PathBuf::from("results"),
            provider: "openai".to_string(),
            model: None,
            api_key: String::new(),
            base_url: None,
            max_attempts: MAX_ATTEMPTS,
            generation_retries: 3,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            prioritize_by_severity: false,
            use_runners: true,
            headless: true,
            browser: BrowserHostConfig::default(),
            knowledge_file: None,
        }
    }

    /// Parse the target; a bare host or `host:port` is taken as `http://`.
    pub fn target_url(&self) -> Result<Url, ReproError> {
        parse_target(&self.target)
    }
}

pub fn parse_target(target: &str) -> Result<Url, ReproError> {
    let trimmed = target.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| ReproError::Config(format!("Invalid target '{}': {}", target, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ReproError::Config(format!("Target must be an http(s) URL: {}", target)));
    }
    Ok(url)
}

/// Counts logged when a scan ends.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub exhausted: usize,
    pub manual: usize,
    pub interrupted: usize,
    pub artifacts: Vec<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
}

impl ScanSummary {
    pub fn record(&mut self, verdict: &AggregatedVerdict, artifact: PathBuf) {
        self.processed += 1;
        match verdict.status {
            VerdictStatus::Succeeded => self.succeeded += 1,
            VerdictStatus::Exhausted => self.exhausted += 1,
            VerdictStatus::ManualTestingRequired => self.manual += 1,
            VerdictStatus::Failed => self.interrupted += 1,
        }
        self.artifacts.push(artifact);
    }
}
