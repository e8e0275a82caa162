use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::ReproError;
use crate::models::{AggregatedVerdict, VerdictArtifact};
use super::results_dir::ResultsDir;
use super::ResultStore;

/// Upper bound on `_{n}` suffixes tried for one timestamp and name.
const MAX_NAME_SUFFIX: u32 = 1000;

/// Writes verdict artifacts as pretty JSON into a `ResultsDir`.
pub struct FsResultStore {
    dir: ResultsDir,
}

impl FsResultStore {
    pub fn new(dir: ResultsDir) -> Self {
        Self { dir }
    }

    /// Claim a fresh artifact name. Existing files are never reused, so reports
    /// sharing a name within one millisecond get `_2`, `_3`... suffixes.
    async fn reserve(&self, verdict: &AggregatedVerdict) -> Result<PathBuf, ReproError> {
        for n in 1..=MAX_NAME_SUFFIX {
            let path = self.dir.numbered_verdict_path(&verdict.timestamp, &verdict.vulnerability_name, n);
            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match created {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Artifact name taken");
                }
                Err(e) => return Err(ReproError::Persist(format!("{}: {}", path.display(), e))),
            }
        }
        Err(ReproError::Persist(format!(
            "No free artifact name for '{}' after {} tries",
            verdict.vulnerability_name, MAX_NAME_SUFFIX
        )))
    }
}

#[async_trait]
impl ResultStore for FsResultStore {
    async fn persist(&self, verdict: &AggregatedVerdict) -> Result<PathBuf, ReproError> {
        self.dir.ensure().await?;
        let path = self.reserve(verdict).await?;

        let artifact = VerdictArtifact::from_verdict(verdict);
        let content = serde_json::to_string_pretty(&artifact)?;
        if let Err(e) = atomic_write(&path, &content).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ReproError::Persist(format!("{}: {}", path.display(), e)));
        }

        info!(vulnerability = %verdict.vulnerability_name, path = %path.display(), "Verdict persisted");
        Ok(path)
    }
}

/// Write to a sibling temp file, then rename over the target.
pub async fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttemptResult, Category, ExecutionRecord, VerdictStatus};

    fn verdict() -> AggregatedVerdict {
        let mut record = ExecutionRecord::pending();
        record.success = true;
        record.evidence.push("error-based response".into());
        AggregatedVerdict::aggregate(
            "SQL Injection",
            "http://localhost:3000",
            Category::SqlInjection,
            VerdictStatus::Succeeded,
            vec![AttemptResult::new(1, record.completed())],
        )
    }

    #[tokio::test]
    async fn test_persist_writes_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsResultStore::new(ResultsDir::new(tmp.path().join("results")));
        let path = store.persist(&verdict()).await.unwrap();

        assert!(path.file_name().unwrap().to_string_lossy().ends_with("_SQL_Injection.json"));
        let content = std::fs::read_to_string(&path).unwrap();
        let artifact: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(artifact["vulnerability"], "SQL Injection");
        assert_eq!(artifact["target_url"], "http://localhost:3000");
        assert_eq!(artifact["results"]["success"], true);
        assert_eq!(artifact["results"]["attempts"][0]["attempt_number"], 1);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_same_name_and_timestamp_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsResultStore::new(ResultsDir::new(tmp.path()));
        let v = verdict();
        let first = store.persist(&v).await.unwrap();
        let original = std::fs::read_to_string(&first).unwrap();

        let second = store.persist(&v).await.unwrap();
        let third = store.persist(&v).await.unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(second.to_string_lossy().ends_with("_SQL_Injection_2.json"));
        assert!(third.to_string_lossy().ends_with("_SQL_Injection_3.json"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), original);
    }

    #[tokio::test]
    async fn test_persist_failure_surfaces() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = FsResultStore::new(ResultsDir::new(blocker.join("results")));
        let err = store.persist(&verdict()).await.unwrap_err();
        assert!(matches!(err, ReproError::Persist(_)));
    }
}
