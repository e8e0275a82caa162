use async_trait::async_trait;
use crate::models::{Category, VulnerabilityReport};
use crate::sandbox::plan::{Action, Condition, ScriptDocument};
use super::{evidence, navigate, screenshot, step, with_loop, ExploitRunner};

/// Search-box reflection: submit payloads and treat any JavaScript dialog as proof.
pub struct XssRunner {
    payloads: Vec<String>,
    search_selector: String,
}

impl XssRunner {
    pub fn new(payloads: &[String]) -> Self {
        Self {
            payloads: payloads.to_vec(),
            search_selector: "input[type=\"search\"], input[name=\"q\"], #searchQuery input".to_string(),
        }
    }
}

#[async_trait]
impl ExploitRunner for XssRunner {
    fn category(&self) -> Category {
        Category::Xss
    }

    fn name(&self) -> &'static str {
        "reflected_xss_search"
    }

    fn plan(&self, vulnerability: &VulnerabilityReport) -> ScriptDocument {
        let prefix = vec![
            navigate("/"),
            Action::WaitForLoad,
            step(format!("Open the application to test {}", vulnerability.name)),
            screenshot("initial_state"),
        ];
        let body = vec![
            step("Search for: {{payload}}"),
            Action::Fill { selector: self.search_selector.clone(), value: "{{payload}}".into() },
            screenshot("before_payload"),
            Action::Press { key: "Enter".into() },
            Action::WaitForLoad,
            Action::Wait { ms: 1000 },
            screenshot("after_payload"),
            Action::Check {
                condition: Condition::DialogSeen(String::new()),
                then: vec![Action::SetSuccess, evidence("XSS successful with: {{payload}}")],
                otherwise: vec![step("No script execution observed for {{payload}}")],
            },
        ];
        with_loop(prefix, &self.payloads, "payload", body, true)
    }
}
