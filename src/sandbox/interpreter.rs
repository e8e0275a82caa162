use futures::future::{BoxFuture, FutureExt};
use reqwest::Url;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::browser::{BrowserPage, NavigationResponse};
use crate::errors::ReproError;
use crate::models::ExecutionRecord;
use crate::store::ResultsDir;
use super::plan::{
    Action, Collection, Condition, ScriptDocument, MAX_ACTIONS, MAX_DEPTH, MAX_WAIT_MS,
};

type Vars = HashMap<String, String>;

/// Everything a routine is allowed to touch.
pub struct Capabilities<'a> {
    pub page: &'a dyn BrowserPage,
    pub target: &'a Url,
    pub results: &'a ResultsDir,
}

enum Flow {
    Continue,
    Return,
}

/// Runs one routine of a plan against a live page, building its result record.
pub struct Interpreter<'a> {
    doc: &'a ScriptDocument,
    caps: Capabilities<'a>,
    cancel: &'a CancellationToken,
    record: ExecutionRecord,
    executed: usize,
    last_response: Option<NavigationResponse>,
}

impl<'a> Interpreter<'a> {
    pub fn new(doc: &'a ScriptDocument, caps: Capabilities<'a>, cancel: &'a CancellationToken) -> Self {
        Self {
            doc,
            caps,
            cancel,
            record: ExecutionRecord::pending(),
            executed: 0,
            last_response: None,
        }
    }

    /// Run the entry routine within `limit`. Failures end up in the record, never
    /// as an `Err`; a timed-out run keeps whatever it gathered before the deadline.
    pub async fn run(mut self, limit: Duration) -> ExecutionRecord {
        let outcome = match self.doc.entry() {
            Ok(entry) => {
                let vars = Vars::new();
                match tokio::time::timeout(limit, self.run_block(&entry.actions, &vars, 1)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ReproError::Timeout(format!(
                        "attempt timed out after {}s",
                        limit.as_secs()
                    ))),
                }
            }
            Err(e) => Err(e),
        };

        // A page that missed the deadline may not answer console reads either
        if !matches!(outcome, Err(ReproError::Timeout(_))) {
            self.collect_console().await;
        }
        match outcome {
            Ok(_) => self.record.completed(),
            Err(e) => {
                debug!(error = %e, executed = self.executed, "Routine aborted");
                self.record.failed_with(e.to_string())
            }
        }
    }

    async fn collect_console(&mut self) {
        match self.caps.page.console_messages().await {
            Ok(messages) => self.record.console_logs.extend(messages),
            Err(e) => warn!(error = %e, "Could not read page console"),
        }
    }

    fn run_block<'s>(
        &'s mut self,
        actions: &'s [Action],
        vars: &'s Vars,
        depth: usize,
    ) -> BoxFuture<'s, Result<Flow, ReproError>> {
        async move {
            if depth > MAX_DEPTH {
                return Err(ReproError::Runtime(format!("nesting deeper than {}", MAX_DEPTH)));
            }
            for action in actions {
                if self.cancel.is_cancelled() {
                    return Err(ReproError::Cancelled("attempt interrupted".into()));
                }
                self.executed += 1;
                if self.executed > MAX_ACTIONS {
                    return Err(ReproError::Runtime(format!("more than {} actions executed", MAX_ACTIONS)));
                }
                if let Flow::Return = self.step(action, vars, depth).await? {
                    return Ok(Flow::Return);
                }
            }
            Ok(Flow::Continue)
        }
        .boxed()
    }

    async fn step(&mut self, action: &Action, vars: &Vars, depth: usize) -> Result<Flow, ReproError> {
        let page = self.caps.page;
        match action {
            Action::Navigate { path, url } => {
                let url = self.resolve(
                    path.as_deref().map(|p| substitute(p, vars)).as_deref(),
                    url.as_deref().map(|u| substitute(u, vars)).as_deref(),
                )?;
                debug!(url = %url, "navigate");
                self.last_response = Some(page.navigate(url.as_str()).await?);
            }
            Action::Fill { selector, value } => {
                page.fill(&substitute(selector, vars), &substitute(value, vars)).await?;
            }
            Action::Click { selector } => page.click(&substitute(selector, vars)).await?,
            Action::Press { key } => page.press(&substitute(key, vars)).await?,
            Action::Wait { ms } => {
                let wait = Duration::from_millis((*ms).min(MAX_WAIT_MS));
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = self.cancel.cancelled() => {
                        return Err(ReproError::Cancelled("attempt interrupted".into()));
                    }
                }
            }
            Action::WaitForLoad => page.wait_for_load().await?,
            Action::Screenshot { label, .. } => {
                let path = self.caps.results.screenshot_path(&substitute(label, vars));
                page.screenshot(&path).await?;
                self.record.screenshots.push(path.display().to_string());
            }
            Action::Append { into, text } => {
                let text = substitute(text, vars);
                match into {
                    Collection::StepsToReproduce => self.record.steps_to_reproduce.push(text),
                    Collection::Evidence => self.record.evidence.push(text),
                    Collection::ConsoleLogs => self.record.console_logs.push(text),
                    Collection::Screenshots => {
                        return Err(ReproError::Runtime("screenshots are added by screenshot only".into()));
                    }
                }
            }
            Action::SetSuccess => self.record.success = true,
            Action::Check { condition, then, otherwise } => {
                let branch = if self.holds(condition, vars).await? { then } else { otherwise };
                return self.run_block(branch, vars, depth + 1).await;
            }
            Action::ForEach { values, var, body, stop_on_success } => {
                for value in values {
                    let mut scoped = vars.clone();
                    scoped.insert(var.clone(), substitute(value, vars));
                    if let Flow::Return = self.run_block(body, &scoped, depth + 1).await? {
                        return Ok(Flow::Return);
                    }
                    if *stop_on_success && self.record.success {
                        break;
                    }
                }
            }
            Action::Call { routine } => {
                let doc = self.doc;
                let callee = doc
                    .routine(routine)
                    .ok_or_else(|| ReproError::Runtime(format!("unknown routine '{}'", routine)))?;
                // `return` inside the callee only leaves the callee
                self.run_block(&callee.actions, vars, depth + 1).await?;
            }
            Action::Return => return Ok(Flow::Return),
        }
        Ok(Flow::Continue)
    }

    async fn holds(&self, condition: &Condition, vars: &Vars) -> Result<bool, ReproError> {
        let page = self.caps.page;
        Ok(match condition {
            Condition::UrlContains(s) => page.current_url().await?.contains(&substitute(s, vars)),
            Condition::ContentContains(s) => page.content().await?.contains(&substitute(s, vars)),
            Condition::ElementExists(sel) => page.element_exists(&substitute(sel, vars)).await?,
            Condition::DialogSeen(s) => {
                let needle = substitute(s, vars);
                page.dialogs().await?.iter().any(|d| needle.is_empty() || d.contains(&needle))
            }
            Condition::ConsoleContains(s) => {
                let needle = substitute(s, vars);
                page.console_messages().await?.iter().any(|m| m.contains(&needle))
            }
            Condition::HeaderMissing(name) => self.last_navigation()?.header(&substitute(name, vars)).is_none(),
            Condition::StatusIs(code) => self.last_navigation()?.status == Some(*code),
        })
    }

    fn last_navigation(&self) -> Result<&NavigationResponse, ReproError> {
        self.last_response
            .as_ref()
            .ok_or_else(|| ReproError::Runtime("no navigation response to inspect".into()))
    }

    fn resolve(&self, path: Option<&str>, url: Option<&str>) -> Result<Url, ReproError> {
        let target = self.caps.target;
        let resolved = match (url, path) {
            (Some(u), _) => Url::parse(u).map_err(|e| ReproError::Runtime(format!("bad url '{}': {}", u, e)))?,
            (None, Some(p)) => target
                .join(p)
                .map_err(|e| ReproError::Runtime(format!("bad path '{}': {}", p, e)))?,
            (None, None) => return Err(ReproError::Runtime("navigate needs a path or url".into())),
        };
        if resolved.origin() != target.origin() {
            return Err(ReproError::Runtime(format!("navigation outside target origin: {}", resolved)));
        }
        Ok(resolved)
    }
}

/// Replace `{{name}}` placeholders with loop variables.
fn substitute(text: &str, vars: &Vars) -> String {
    if vars.is_empty() || !text.contains("{{") {
        return text.to_string();
    }
    let mut out = text.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}
