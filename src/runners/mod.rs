//! Hand-authored exploit routines, preferred over generated ones when registered.

pub mod headers;
pub mod sqli;
pub mod xss;

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::knowledge::KnowledgeBase;
use crate::models::{Category, Classification, ExecutionRecord, VulnerabilityReport};
use crate::sandbox::plan::{
    worst_case_steps, Action, Collection, Routine, ScriptDocument, ENTRY_ROUTINE, MAX_ACTIONS, MAX_LOOP_VALUES,
};
use crate::sandbox::ExecutionSandbox;

pub use headers::SecurityHeadersRunner;
pub use sqli::SqlInjectionRunner;
pub use xss::XssRunner;

/// A deterministic exploit for one category. Never calls the generative backend.
#[async_trait]
pub trait ExploitRunner: Send + Sync {
    fn category(&self) -> Category;

    fn name(&self) -> &'static str;

    fn plan(&self, vulnerability: &VulnerabilityReport) -> ScriptDocument;

    async fn run(
        &self,
        vulnerability: &VulnerabilityReport,
        sandbox: &ExecutionSandbox,
        target: &Url,
        cancel: &CancellationToken,
    ) -> ExecutionRecord {
        sandbox.execute_document(&self.plan(vulnerability), target, cancel).await
    }
}

/// How a classified vulnerability will be attempted.
pub enum Route {
    Runner(Arc<dyn ExploitRunner>),
    Generated,
    Manual,
}

#[derive(Default)]
pub struct RunnerRegistry {
    runners: HashMap<Category, Arc<dyn ExploitRunner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL injection, XSS and security header runners, with payloads from `knowledge`.
    pub fn with_defaults(knowledge: &KnowledgeBase) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SqlInjectionRunner::new(knowledge.payloads(Category::SqlInjection))));
        registry.register(Arc::new(XssRunner::new(knowledge.payloads(Category::Xss))));
        registry.register(Arc::new(SecurityHeadersRunner::default()));
        registry
    }

    pub fn register(&mut self, runner: Arc<dyn ExploitRunner>) {
        self.runners.insert(runner.category(), runner);
    }

    pub fn get(&self, category: Category) -> Option<Arc<dyn ExploitRunner>> {
        self.runners.get(&category).cloned()
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Registered runner first, then generation for automatable categories, else manual.
    pub fn route(&self, classification: &Classification) -> Route {
        if let Some(runner) = self.get(classification.category) {
            Route::Runner(runner)
        } else if classification.automatable {
            Route::Generated
        } else {
            Route::Manual
        }
    }
}

fn entry(actions: Vec<Action>) -> ScriptDocument {
    ScriptDocument {
        routines: vec![Routine {
            name: ENTRY_ROUTINE.to_string(),
            is_async: true,
            actions,
        }],
    }
}

fn step(text: impl Into<String>) -> Action {
    Action::Append { into: Collection::StepsToReproduce, text: text.into() }
}

fn evidence(text: impl Into<String>) -> Action {
    Action::Append { into: Collection::Evidence, text: text.into() }
}

fn screenshot(label: &str) -> Action {
    Action::Screenshot { label: label.to_string(), into: Some(Collection::Screenshots) }
}

fn navigate(path: &str) -> Action {
    Action::Navigate { path: Some(path.to_string()), url: None }
}

/// Append a loop over `values` to `prefix`, keeping only as many values as the
/// interpreter's action budget can run through `body`.
fn with_loop(
    mut prefix: Vec<Action>,
    values: &[String],
    var: &str,
    body: Vec<Action>,
    stop_on_success: bool,
) -> ScriptDocument {
    let fixed = worst_case_steps(&prefix) + 1;
    let per_value = worst_case_steps(&body).max(1);
    let limit = (MAX_ACTIONS.saturating_sub(fixed) / per_value).min(MAX_LOOP_VALUES);
    if values.len() > limit {
        warn!(kept = limit, dropped = values.len() - limit, "Runner payload list truncated to fit the action budget");
    }

    prefix.push(Action::ForEach {
        values: values.iter().take(limit).cloned().collect(),
        var: var.to_string(),
        body,
        stop_on_success,
    });
    entry(prefix)
}
