use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::errors::ReproError;

/// Handle on the results directory, shared by screenshots and verdict artifacts.
#[derive(Debug, Clone)]
pub struct ResultsDir {
    root: PathBuf,
}

impl ResultsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> Result<(), ReproError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            ReproError::Persist(format!("Cannot create results directory {}: {}", self.root.display(), e))
        })
    }

    /// `{timestamp}_{label}.png`, suffixed with `_2`, `_3`... when that file already exists.
    pub fn screenshot_path(&self, label: &str) -> PathBuf {
        let stem = format!("{}_{}", timestamp_prefix(&Utc::now()), file_component(label));
        (1..)
            .map(|n| self.root.join(numbered(&stem, n, "png")))
            .find(|path| !path.exists())
            .unwrap_or_else(|| self.root.join(format!("{}.png", stem)))
    }

    /// `{timestamp}_{vulnerability}.json`
    pub fn verdict_path(&self, at: &DateTime<Utc>, vulnerability: &str) -> PathBuf {
        self.numbered_verdict_path(at, vulnerability, 1)
    }

    /// Candidate `n` for a verdict artifact; `n > 1` adds a `_{n}` suffix.
    pub fn numbered_verdict_path(&self, at: &DateTime<Utc>, vulnerability: &str, n: u32) -> PathBuf {
        let stem = format!("{}_{}", timestamp_prefix(at), file_component(vulnerability));
        self.root.join(numbered(&stem, n, "json"))
    }
}

fn numbered(stem: &str, n: u32, ext: &str) -> String {
    if n <= 1 {
        format!("{}.{}", stem, ext)
    } else {
        format!("{}_{}.{}", stem, n, ext)
    }
}

/// Millisecond-resolution prefix so artifacts of consecutive attempts never collide.
pub fn timestamp_prefix(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Fold anything that is not alphanumeric, `-` or `_` into `_`.
pub fn file_component(raw: &str) -> String {
    let stem: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "unnamed".to_string() } else { stem }
}
