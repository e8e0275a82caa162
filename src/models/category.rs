use serde::{Deserialize, Serialize};

/// Vulnerability class a report is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SqlInjection,
    Xss,
    BrokenAuth,
    PathTraversal,
    MissingSecurityHeaders,
    SecurityMisconfig,
    SensitiveDataExposure,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlInjection => "sql_injection",
            Self::Xss => "xss",
            Self::BrokenAuth => "broken_auth",
            Self::PathTraversal => "path_traversal",
            Self::MissingSecurityHeaders => "missing_security_headers",
            Self::SecurityMisconfig => "security_misconfig",
            Self::SensitiveDataExposure => "sensitive_data_exposure",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a browser test can plausibly demonstrate this class.
    pub fn is_automatable(&self) -> bool {
        !matches!(self, Self::Unknown | Self::SensitiveDataExposure)
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::SqlInjection,
            Self::Xss,
            Self::BrokenAuth,
            Self::PathTraversal,
            Self::MissingSecurityHeaders,
            Self::SecurityMisconfig,
            Self::SensitiveDataExposure,
            Self::Unknown,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Classifier output: the category plus whether the automated paths may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub automatable: bool,
}

impl Classification {
    pub fn unknown() -> Self {
        Self { category: Category::Unknown, automatable: false }
    }
}
