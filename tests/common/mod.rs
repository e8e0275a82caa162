#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Url;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use vulnrepro::browser::{BrowserEngine, BrowserPage, NavigationResponse};
use vulnrepro::errors::{ReproError, RetryPolicy};
use vulnrepro::feed::VulnerabilityFeed;
use vulnrepro::generator::ScriptGenerator;
use vulnrepro::knowledge::KnowledgeBase;
use vulnrepro::llm::{LLMProvider, LLMResponse};
use vulnrepro::models::{AggregatedVerdict, VulnerabilityReport};
use vulnrepro::pipeline::AttemptOrchestrator;
use vulnrepro::probe::SiteProbe;
use vulnrepro::runners::RunnerRegistry;
use vulnrepro::sandbox::ExecutionSandbox;
use vulnrepro::store::{ResultStore, ResultsDir};

pub fn target() -> Url {
    Url::parse("http://localhost:3000/").unwrap()
}

/// A plan that carries every structural marker and reports success.
pub const SUCCESS_PLAN: &str = r#"{"routines": [{"name": "main", "async": true, "actions": [
    {"op": "navigate", "path": "/#/login"},
    {"op": "append", "into": "steps_to_reproduce", "text": "Open the login page"},
    {"op": "screenshot", "label": "login", "into": "screenshots"},
    {"op": "append", "into": "evidence", "text": "Reset token accepted"},
    {"op": "set_success"}
]}]}"#;

/// Valid plan that runs to completion without demonstrating anything.
pub const NO_LUCK_PLAN: &str = r#"{"routines": [{"name": "main", "async": true, "actions": [
    {"op": "navigate", "path": "/#/login"},
    {"op": "append", "into": "steps_to_reproduce", "text": "Try the reset form"},
    {"op": "screenshot", "label": "reset", "into": "screenshots"},
    {"op": "check", "condition": {"content_contains": "token"}, "then": [
        {"op": "append", "into": "evidence", "text": "token leaked"},
        {"op": "set_success"}
    ]}
]}]}"#;

/// Valid plan whose click hits a selector the page does not have.
pub const BROKEN_SELECTOR_PLAN: &str = r##"{"routines": [{"name": "main", "async": true, "actions": [
    {"op": "append", "into": "steps_to_reproduce", "text": "Click the reset button"},
    {"op": "click", "selector": "#missing"},
    {"op": "screenshot", "label": "after_click", "into": "screenshots"},
    {"op": "append", "into": "evidence", "text": "never reached"}
]}]}"##;

/// Plan without any evidence append.
pub const NO_EVIDENCE_PLAN: &str = r#"{"routines": [{"name": "main", "async": true, "actions": [
    {"op": "append", "into": "steps_to_reproduce", "text": "Look around"},
    {"op": "screenshot", "label": "look", "into": "screenshots"}
]}]}"#;

/// Backend double that replays canned answers; the last one repeats.
pub struct ScriptedLLM {
    responses: Mutex<VecDeque<Result<String, ReproError>>>,
    last: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedLLM {
    pub fn new(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLM {
    async fn complete(&self, _prompt: &str, _system: Option<&str>) -> Result<LLMResponse, ReproError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        let text = match next {
            Some(Ok(text)) => {
                *self.last.lock().unwrap() = Some(text.clone());
                text
            }
            Some(Err(e)) => return Err(e),
            None => self.last.lock().unwrap().clone().unwrap_or_default(),
        };
        Ok(LLMResponse::text(&text, "scripted"))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-1"
    }
}

#[derive(Default)]
pub struct BrowserCounters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub clicks: AtomicUsize,
}

impl BrowserCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// How pages opened by [`FakeEngine`] behave.
#[derive(Clone, Default)]
pub struct PageBehavior {
    /// URL the page lands on after a click. Unset keeps the current URL.
    pub landing_after_click: Option<String>,
    /// Page body returned by `content`.
    pub body: String,
    /// Cancel this token on the first click, simulating an interrupt mid-attempt.
    pub cancel_on_click: Option<CancellationToken>,
}

pub struct FakePage {
    counters: Arc<BrowserCounters>,
    behavior: PageBehavior,
    url: Mutex<String>,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn navigate(&self, url: &str) -> Result<NavigationResponse, ReproError> {
        *self.url.lock().unwrap() = url.to_string();
        Ok(NavigationResponse { status: Some(200), headers: HashMap::new(), url: url.to_string() })
    }

    async fn fill(&self, _selector: &str, _value: &str) -> Result<(), ReproError> {
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), ReproError> {
        self.counters.clicks.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.behavior.cancel_on_click {
            token.cancel();
        }
        if selector == "#missing" {
            return Err(ReproError::Browser(format!("no element matches {}", selector)));
        }
        if let Some(landing) = &self.behavior.landing_after_click {
            *self.url.lock().unwrap() = landing.clone();
        }
        Ok(())
    }

    async fn press(&self, _key: &str) -> Result<(), ReproError> {
        Ok(())
    }

    async fn wait_for_load(&self) -> Result<(), ReproError> {
        Ok(())
    }

    async fn content(&self) -> Result<String, ReproError> {
        Ok(self.behavior.body.clone())
    }

    async fn current_url(&self) -> Result<String, ReproError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn element_exists(&self, _selector: &str) -> Result<bool, ReproError> {
        Ok(true)
    }

    async fn screenshot(&self, path: &Path) -> Result<(), ReproError> {
        tokio::fs::write(path, b"\x89PNG").await?;
        Ok(())
    }

    async fn console_messages(&self) -> Result<Vec<String>, ReproError> {
        Ok(Vec::new())
    }

    async fn dialogs(&self) -> Result<Vec<String>, ReproError> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), ReproError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeEngine {
    pub counters: Arc<BrowserCounters>,
    behavior: PageBehavior,
}

impl FakeEngine {
    pub fn new(behavior: PageBehavior) -> Self {
        Self { counters: Arc::new(BrowserCounters::default()), behavior }
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserPage>, ReproError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            counters: self.counters.clone(),
            behavior: self.behavior.clone(),
            url: Mutex::new("about:blank".to_string()),
        }))
    }
}

pub struct StaticProbe {
    pub reachable: bool,
    pub calls: AtomicUsize,
}

impl StaticProbe {
    pub fn new(reachable: bool) -> Arc<Self> {
        Arc::new(Self { reachable, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl SiteProbe for StaticProbe {
    async fn probe(&self, target: &Url) -> Result<u16, ReproError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reachable {
            Ok(200)
        } else {
            Err(ReproError::Unreachable(format!("{} refused the connection", target)))
        }
    }
}

pub struct MemoryFeed {
    reports: Vec<VulnerabilityReport>,
    pub loads: AtomicUsize,
}

impl MemoryFeed {
    pub fn new(reports: Vec<VulnerabilityReport>) -> Arc<Self> {
        Arc::new(Self { reports, loads: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl VulnerabilityFeed for MemoryFeed {
    async fn load(&self) -> Result<Vec<VulnerabilityReport>, ReproError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.reports.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub verdicts: Mutex<Vec<AggregatedVerdict>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self { verdicts: Mutex::new(Vec::new()), fail: true }
    }

    pub fn persisted(&self) -> Vec<AggregatedVerdict> {
        self.verdicts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn persist(&self, verdict: &AggregatedVerdict) -> Result<PathBuf, ReproError> {
        if self.fail {
            return Err(ReproError::Persist("disk full".into()));
        }
        let mut verdicts = self.verdicts.lock().unwrap();
        verdicts.push(verdict.clone());
        Ok(PathBuf::from(format!("memory/{}.json", verdicts.len())))
    }
}

/// An orchestrator over fakes, plus handles to inspect them.
pub struct Harness {
    pub orchestrator: AttemptOrchestrator,
    pub llm: Arc<ScriptedLLM>,
    pub browser: Arc<BrowserCounters>,
}

pub fn harness(dir: &Path, llm: Arc<ScriptedLLM>, behavior: PageBehavior, with_runners: bool) -> Harness {
    let knowledge = Arc::new(KnowledgeBase::builtin());
    let registry = if with_runners {
        RunnerRegistry::with_defaults(&knowledge)
    } else {
        RunnerRegistry::new()
    };
    let engine = FakeEngine::new(behavior);
    let browser = engine.counters.clone();
    let sandbox = Arc::new(ExecutionSandbox::new(
        Arc::new(engine),
        ResultsDir::new(dir),
        Duration::from_secs(30),
    ));
    let generator = Arc::new(ScriptGenerator::new(llm.clone(), knowledge, target().as_str()));
    let orchestrator = AttemptOrchestrator::new(Arc::new(registry), generator, sandbox, target())
        .with_generation_policy(RetryPolicy::new(3).without_backoff());

    Harness { orchestrator, llm, browser }
}
