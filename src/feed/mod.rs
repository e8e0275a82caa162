//! Vulnerability feeds: where the ordered list of reports comes from.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::ReproError;
use crate::models::VulnerabilityReport;

const MAX_FEED_BYTES: u64 = 10 * 1_048_576;

#[async_trait]
pub trait VulnerabilityFeed: Send + Sync {
    async fn load(&self) -> Result<Vec<VulnerabilityReport>, ReproError>;
}

/// A YAML or JSON file holding either a list of reports or `{vulnerabilities: [...]}`.
pub struct FileFeed {
    path: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    List(Vec<VulnerabilityReport>),
    Wrapped { vulnerabilities: Vec<VulnerabilityReport> },
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VulnerabilityFeed for FileFeed {
    async fn load(&self) -> Result<Vec<VulnerabilityReport>, ReproError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| ReproError::Feed(format!("{}: {}", self.path.display(), e)))?;
        if metadata.len() > MAX_FEED_BYTES {
            return Err(ReproError::Feed(format!("{} exceeds 10MB", self.path.display())));
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ReproError::Feed(format!("{}: {}", self.path.display(), e)))?;
        let is_json = self.path.extension().and_then(|e| e.to_str()) == Some("json");
        let reports = parse_feed(&content, is_json)?;
        info!(path = %self.path.display(), count = reports.len(), "Vulnerability feed loaded");
        Ok(reports)
    }
}

/// Parse feed text, dropping entries without a name.
pub fn parse_feed(content: &str, is_json: bool) -> Result<Vec<VulnerabilityReport>, ReproError> {
    let doc: FeedDocument = if is_json {
        serde_json::from_str(content).map_err(|e| ReproError::Feed(format!("Invalid JSON feed: {}", e)))?
    } else {
        serde_yaml::from_str(content).map_err(|e| ReproError::Feed(format!("Invalid YAML feed: {}", e)))?
    };
    let reports = match doc {
        FeedDocument::List(list) => list,
        FeedDocument::Wrapped { vulnerabilities } => vulnerabilities,
    };

    let total = reports.len();
    let kept: Vec<VulnerabilityReport> = reports.into_iter().filter(|r| !r.name.trim().is_empty()).collect();
    if kept.len() < total {
        warn!(dropped = total - kept.len(), "Feed entries without a name were skipped");
    }
    Ok(kept)
}

/// Most severe first; order within a severity is kept.
pub fn prioritize(reports: &mut [VulnerabilityReport]) {
    reports.sort_by_key(|r| r.severity.rank());
}
