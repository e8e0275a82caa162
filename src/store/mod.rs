//! Where verdicts and screenshots end up.

pub mod fs;
pub mod results_dir;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::ReproError;
use crate::models::AggregatedVerdict;

pub use fs::FsResultStore;
pub use results_dir::{file_component, timestamp_prefix, ResultsDir};

/// Persists one verdict per vulnerability. Writes are never retried and never
/// replace an existing artifact.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn persist(&self, verdict: &AggregatedVerdict) -> Result<PathBuf, ReproError>;
}
