use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attempt::AttemptResult;
use super::category::Category;

/// How the attempt loop for one vulnerability ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// An attempt demonstrated the vulnerability.
    Succeeded,
    /// Every allowed attempt ran without success.
    Exhausted,
    /// The loop was stopped before the budget ran out (cancellation).
    Failed,
    /// No automated path exists; a human has to test it.
    ManualTestingRequired,
}

/// Outcome across all attempts for a single vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedVerdict {
    pub vulnerability_name: String,
    pub target_url: String,
    pub category: Category,
    pub status: VerdictStatus,
    pub success: bool,
    pub attempts: Vec<AttemptResult>,
    pub evidence: Vec<String>,
    pub screenshots: Vec<String>,
    pub steps_to_reproduce: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl AggregatedVerdict {
    /// Fold attempt records into one verdict. `success` is the OR over all attempts,
    /// collections are concatenated in attempt order without deduplication.
    pub fn aggregate(
        vulnerability_name: &str,
        target_url: &str,
        category: Category,
        status: VerdictStatus,
        attempts: Vec<AttemptResult>,
    ) -> Self {
        let success = attempts.iter().any(|a| a.record.success);
        let evidence = attempts.iter().flat_map(|a| a.record.evidence.iter().cloned()).collect();
        let screenshots = attempts.iter().flat_map(|a| a.record.screenshots.iter().cloned()).collect();
        let steps_to_reproduce = attempts
            .iter()
            .flat_map(|a| a.record.steps_to_reproduce.iter().cloned())
            .collect();

        Self {
            vulnerability_name: vulnerability_name.to_string(),
            target_url: target_url.to_string(),
            category,
            status,
            success,
            attempts,
            evidence,
            screenshots,
            steps_to_reproduce,
            timestamp: Utc::now(),
        }
    }

    pub fn manual(vulnerability_name: &str, target_url: &str, category: Category) -> Self {
        Self::aggregate(
            vulnerability_name,
            target_url,
            category,
            VerdictStatus::ManualTestingRequired,
            Vec::new(),
        )
    }
}

/// The persisted document, one per vulnerability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictArtifact {
    pub timestamp: String,
    pub vulnerability: String,
    pub target_url: String,
    pub results: AggregatedVerdict,
}

impl VerdictArtifact {
    pub fn from_verdict(verdict: &AggregatedVerdict) -> Self {
        Self {
            timestamp: verdict.timestamp.to_rfc3339(),
            vulnerability: verdict.vulnerability_name.clone(),
            target_url: verdict.target_url.clone(),
            results: verdict.clone(),
        }
    }
}
