use serde::{Deserialize, Serialize};

/// Reported severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "Critical")]
    Critical,
    #[serde(alias = "High")]
    High,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "Low")]
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Returns a numeric rank where lower values indicate higher severity.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Unknown => 4,
        }
    }
}

/// A single vulnerability as delivered by the feed. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    #[serde(alias = "Vulnerability", alias = "vulnerability")]
    pub name: String,
    #[serde(alias = "Details", default)]
    pub details: String,
    #[serde(alias = "Severity", default)]
    pub severity: Severity,
}

impl VulnerabilityReport {
    pub fn new(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            details: details.to_string(),
            severity: Severity::Unknown,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Name with whitespace and path separators folded to underscores, used in artifact names.
    pub fn file_stem(&self) -> String {
        crate::store::file_component(&self.name)
    }
}
