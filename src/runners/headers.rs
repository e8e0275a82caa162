use async_trait::async_trait;
use crate::models::{Category, VulnerabilityReport};
use crate::sandbox::plan::{Action, Condition, ScriptDocument};
use super::{evidence, navigate, screenshot, step, with_loop, ExploitRunner};

/// Checks the landing page response for hardening headers.
pub struct SecurityHeadersRunner {
    headers: Vec<String>,
}

impl Default for SecurityHeadersRunner {
    fn default() -> Self {
        Self {
            headers: [
                "content-security-policy",
                "x-frame-options",
                "x-content-type-options",
                "strict-transport-security",
                "referrer-policy",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        }
    }
}

#[async_trait]
impl ExploitRunner for SecurityHeadersRunner {
    fn category(&self) -> Category {
        Category::MissingSecurityHeaders
    }

    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn plan(&self, vulnerability: &VulnerabilityReport) -> ScriptDocument {
        let prefix = vec![
            navigate("/"),
            step(format!("Request the landing page and inspect response headers ({})", vulnerability.name)),
            screenshot("initial_state"),
        ];
        let body = vec![Action::Check {
            condition: Condition::HeaderMissing("{{header}}".into()),
            then: vec![Action::SetSuccess, evidence("Response is missing the {{header}} header")],
            otherwise: vec![step("{{header}} is present")],
        }];
        with_loop(prefix, &self.headers, "header", body, false)
    }
}
