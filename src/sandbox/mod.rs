//! Runs exploit plans against the target, one isolated browser session per attempt.

pub mod interpreter;
pub mod plan;

use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::browser::BrowserEngine;
use crate::generator::GeneratedScript;
use crate::models::ExecutionRecord;
use crate::store::ResultsDir;
use interpreter::{Capabilities, Interpreter};

pub use plan::{Action, Collection, Condition, Routine, ScriptDocument};

pub struct ExecutionSandbox {
    engine: Arc<dyn BrowserEngine>,
    results: ResultsDir,
    attempt_timeout: Duration,
}

impl ExecutionSandbox {
    pub fn new(engine: Arc<dyn BrowserEngine>, results: ResultsDir, attempt_timeout: Duration) -> Self {
        Self { engine, results, attempt_timeout }
    }

    pub fn results(&self) -> &ResultsDir {
        &self.results
    }

    /// Run a generated script. Never fails: every problem becomes an error record.
    pub async fn execute(
        &self,
        script: &GeneratedScript,
        target: &Url,
        cancel: &CancellationToken,
    ) -> ExecutionRecord {
        if !script.is_validated() {
            return ExecutionRecord::error("script has not passed structural validation");
        }
        let doc = match ScriptDocument::parse(script.text()) {
            Ok(doc) => doc,
            Err(e) => return ExecutionRecord::error(e.to_string()),
        };
        self.execute_document(&doc, target, cancel).await
    }

    /// Run an already-parsed plan in a fresh session, closing it on every path.
    pub async fn execute_document(
        &self,
        doc: &ScriptDocument,
        target: &Url,
        cancel: &CancellationToken,
    ) -> ExecutionRecord {
        // Entry checks happen before any browser is started
        if let Err(e) = doc.entry() {
            return ExecutionRecord::error(e.to_string());
        }
        if cancel.is_cancelled() {
            return ExecutionRecord::error("attempt cancelled before start");
        }

        let page = match self.engine.open_session().await {
            Ok(page) => page,
            Err(e) => return ExecutionRecord::error(e.to_string()),
        };

        let caps = Capabilities {
            page: page.as_ref(),
            target,
            results: &self.results,
        };
        let record = Interpreter::new(doc, caps, cancel).run(self.attempt_timeout).await;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Browser session did not close cleanly");
        }
        debug!(success = record.success, status = ?record.status, "Attempt finished");
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserPage, NavigationResponse};
    use crate::errors::ReproError;
    use crate::models::{AttemptStatus, Category};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
        navigations: Mutex<Vec<String>>,
    }

    struct FakePage {
        counters: Arc<Counters>,
        url: Mutex<String>,
        fail_on_click: bool,
        dialogs: Vec<String>,
        slow: bool,
    }

    #[async_trait]
    impl BrowserPage for FakePage {
        async fn navigate(&self, url: &str) -> Result<NavigationResponse, ReproError> {
            self.counters.navigations.lock().unwrap().push(url.to_string());
            *self.url.lock().unwrap() = url.to_string();
            let mut headers = HashMap::new();
            headers.insert("content-type".to_string(), "text/html".to_string());
            Ok(NavigationResponse { status: Some(200), headers, url: url.to_string() })
        }
        async fn fill(&self, _s: &str, _v: &str) -> Result<(), ReproError> { Ok(()) }
        async fn click(&self, selector: &str) -> Result<(), ReproError> {
            if self.fail_on_click {
                return Err(ReproError::Browser(format!("no element matches {}", selector)));
            }
            Ok(())
        }
        async fn press(&self, _k: &str) -> Result<(), ReproError> {
            if self.slow {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(())
        }
        async fn wait_for_load(&self) -> Result<(), ReproError> { Ok(()) }
        async fn content(&self) -> Result<String, ReproError> { Ok("<html>SQLITE_ERROR</html>".into()) }
        async fn current_url(&self) -> Result<String, ReproError> { Ok(self.url.lock().unwrap().clone()) }
        async fn element_exists(&self, _s: &str) -> Result<bool, ReproError> { Ok(false) }
        async fn screenshot(&self, path: &Path) -> Result<(), ReproError> {
            tokio::fs::write(path, b"png").await?;
            Ok(())
        }
        async fn console_messages(&self) -> Result<Vec<String>, ReproError> { Ok(vec!["log: ready".into()]) }
        async fn dialogs(&self) -> Result<Vec<String>, ReproError> { Ok(self.dialogs.clone()) }
        async fn close(&self) -> Result<(), ReproError> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeEngine {
        counters: Arc<Counters>,
        fail_on_click: bool,
        dialogs: Vec<String>,
        slow: bool,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self { counters: Arc::new(Counters::default()), fail_on_click: false, dialogs: Vec::new(), slow: false }
        }
    }

    #[async_trait]
    impl BrowserEngine for FakeEngine {
        async fn open_session(&self) -> Result<Box<dyn BrowserPage>, ReproError> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePage {
                counters: self.counters.clone(),
                url: Mutex::new(String::new()),
                fail_on_click: self.fail_on_click,
                dialogs: self.dialogs.clone(),
                slow: self.slow,
            }))
        }
    }

    fn sandbox(engine: FakeEngine, dir: &Path) -> (ExecutionSandbox, Arc<Counters>) {
        let counters = engine.counters.clone();
        let sb = ExecutionSandbox::new(Arc::new(engine), ResultsDir::new(dir), Duration::from_secs(2));
        (sb, counters)
    }

    fn target() -> Url {
        Url::parse("http://localhost:3000/").unwrap()
    }

    fn validated(text: &str) -> GeneratedScript {
        GeneratedScript::new(text, Category::SqlInjection, 1).validate().unwrap()
    }

    const SQLI_PLAN: &str = r##"{"routines": [{"name": "main", "async": true, "actions": [
        {"op": "navigate", "path": "/#/login"},
        {"op": "screenshot", "label": "initial_state", "into": "screenshots"},
        {"op": "for_each", "values": ["' OR 1=1--", "admin' --"], "as": "p", "stop_on_success": true, "do": [
            {"op": "append", "into": "steps_to_reproduce", "text": "Submit {{p}}"},
            {"op": "fill", "selector": "#email", "value": "{{p}}"},
            {"op": "check", "condition": {"content_contains": "SQLITE_ERROR"}, "then": [
                {"op": "set_success"},
                {"op": "append", "into": "evidence", "text": "database error echoed for {{p}}"}
            ]}
        ]}
    ]}]}"##;

    #[tokio::test]
    async fn test_execute_success() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, counters) = sandbox(FakeEngine::new(), tmp.path());
        let record = sb.execute(&validated(SQLI_PLAN), &target(), &CancellationToken::new()).await;

        assert!(record.success);
        assert_eq!(record.status, AttemptStatus::Success);
        // stop_on_success ends the loop after the first payload
        assert_eq!(record.evidence, vec!["database error echoed for ' OR 1=1--"]);
        assert_eq!(record.steps_to_reproduce.len(), 1);
        assert_eq!(record.screenshots.len(), 1);
        assert!(Path::new(&record.screenshots[0]).exists());
        assert_eq!(record.console_logs, vec!["log: ready"]);
        assert_eq!(counters.navigations.lock().unwrap()[0], "http://localhost:3000/#/login");
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unvalidated_script_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, counters) = sandbox(FakeEngine::new(), tmp.path());
        let script = GeneratedScript::new(SQLI_PLAN, Category::SqlInjection, 1);
        let record = sb.execute(&script, &target(), &CancellationToken::new()).await;
        assert_eq!(record.status, AttemptStatus::Error);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_parse_failure_is_error_record() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, counters) = sandbox(FakeEngine::new(), tmp.path());
        let broken = r#"{"op": "screenshot", "into": "screenshots", "x": {"into": "evidence"}, "into": "steps_to_reproduce""#;
        let record = sb.execute(&validated(broken), &target(), &CancellationToken::new()).await;
        assert_eq!(record.status, AttemptStatus::Error);
        assert!(record.error.unwrap().contains("parse"));
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_routine() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, _) = sandbox(FakeEngine::new(), tmp.path());
        let doc = ScriptDocument::parse(r#"{"routines": [{"name": "exploit", "async": true}]}"#).unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert_eq!(record.error.as_deref(), Some("missing entry routine"));
    }

    #[tokio::test]
    async fn test_non_async_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, _) = sandbox(FakeEngine::new(), tmp.path());
        let doc = ScriptDocument::parse(r#"{"routines": [{"name": "main", "async": false}]}"#).unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert_eq!(record.error.as_deref(), Some("entry routine must be asynchronous"));
    }

    #[tokio::test]
    async fn test_runtime_error_closes_session_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new();
        engine.fail_on_click = true;
        let (sb, counters) = sandbox(engine, tmp.path());
        let plan = r#"{"routines": [{"name": "main", "async": true, "actions": [
            {"op": "append", "into": "steps_to_reproduce", "text": "click submit"},
            {"op": "click", "selector": "button[type=submit]"},
            {"op": "set_success"}]}]}"#;
        let doc = ScriptDocument::parse(plan).unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;

        assert!(!record.success);
        assert_eq!(record.status, AttemptStatus::Error);
        assert!(record.error.unwrap().contains("no element matches"));
        assert_eq!(record.steps_to_reproduce, vec!["click submit"]);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_closes_session() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new();
        engine.slow = true;
        let counters = engine.counters.clone();
        let sb = ExecutionSandbox::new(Arc::new(engine), ResultsDir::new(tmp.path()), Duration::from_millis(50));
        let doc = ScriptDocument::parse(
            r#"{"routines": [{"name": "main", "async": true, "actions": [{"op": "press", "key": "Enter"}]}]}"#,
        )
        .unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert!(record.error.unwrap().contains("timed out"));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_record() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new();
        engine.slow = true;
        let counters = engine.counters.clone();
        let sb = ExecutionSandbox::new(Arc::new(engine), ResultsDir::new(tmp.path()), Duration::from_millis(50));
        let doc = ScriptDocument::parse(
            r#"{"routines": [{"name": "main", "async": true, "actions": [
                {"op": "append", "into": "steps_to_reproduce", "text": "open search"},
                {"op": "screenshot", "label": "before", "into": "screenshots"},
                {"op": "append", "into": "evidence", "text": "form rendered"},
                {"op": "press", "key": "Enter"},
                {"op": "append", "into": "steps_to_reproduce", "text": "never reached"}]}]}"#,
        )
        .unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert_eq!(record.status, AttemptStatus::Error);
        assert!(!record.success);
        assert!(record.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(record.steps_to_reproduce, vec!["open search"]);
        assert_eq!(record.evidence, vec!["form rendered"]);
        assert_eq!(record.screenshots.len(), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_off_origin_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, counters) = sandbox(FakeEngine::new(), tmp.path());
        let doc = ScriptDocument::parse(
            r#"{"routines": [{"name": "main", "async": true, "actions": [{"op": "navigate", "url": "http://evil.example/"}]}]}"#,
        )
        .unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert!(record.error.unwrap().contains("outside target origin"));
        assert!(counters.navigations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dialog_and_header_conditions() {
        let tmp = tempfile::tempdir().unwrap();
        let mut engine = FakeEngine::new();
        engine.dialogs = vec!["alert: 1".into()];
        let (sb, _) = sandbox(engine, tmp.path());
        let plan = r#"{"routines": [{"name": "main", "async": true, "actions": [
            {"op": "navigate", "path": "/"},
            {"op": "check", "condition": {"header_missing": "Content-Security-Policy"}, "then": [
                {"op": "append", "into": "evidence", "text": "no csp"}]},
            {"op": "check", "condition": {"header_missing": "Content-Type"}, "then": [
                {"op": "append", "into": "evidence", "text": "no content type"}]},
            {"op": "check", "condition": {"dialog_seen": ""}, "then": [{"op": "set_success"}]},
            {"op": "return"},
            {"op": "append", "into": "evidence", "text": "unreachable"}]}]}"#;
        let doc = ScriptDocument::parse(plan).unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert!(record.success);
        assert_eq!(record.evidence, vec!["no csp"]);
    }

    #[tokio::test]
    async fn test_call_runs_helper_routine() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, _) = sandbox(FakeEngine::new(), tmp.path());
        let plan = r#"{"routines": [
            {"name": "main", "async": true, "actions": [
                {"op": "call", "routine": "probe"},
                {"op": "append", "into": "steps_to_reproduce", "text": "after helper"}]},
            {"name": "probe", "actions": [
                {"op": "append", "into": "steps_to_reproduce", "text": "in helper"},
                {"op": "return"},
                {"op": "append", "into": "steps_to_reproduce", "text": "skipped"}]}]}"#;
        let doc = ScriptDocument::parse(plan).unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert_eq!(record.steps_to_reproduce, vec!["in helper", "after helper"]);
        assert_eq!(record.status, AttemptStatus::Failed);
    }

    #[tokio::test]
    async fn test_recursive_call_hits_depth_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, counters) = sandbox(FakeEngine::new(), tmp.path());
        let doc = ScriptDocument::parse(
            r#"{"routines": [{"name": "main", "async": true, "actions": [{"op": "call", "routine": "main"}]}]}"#,
        )
        .unwrap();
        let record = sb.execute_document(&doc, &target(), &CancellationToken::new()).await;
        assert!(record.error.unwrap().contains("nesting"));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_browser() {
        let tmp = tempfile::tempdir().unwrap();
        let (sb, counters) = sandbox(FakeEngine::new(), tmp.path());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let record = sb.execute(&validated(SQLI_PLAN), &target(), &cancel).await;
        assert_eq!(record.status, AttemptStatus::Error);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }
}
