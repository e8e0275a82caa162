use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use crate::container::ContainerManager;
use crate::errors::ReproError;
use super::engine::{BrowserEngine, BrowserPage, NavigationResponse};
use tracing::{debug, warn};

const SESSION_ROOT: &str = "/tmp/vulnrepro";
const NODE_PATH: &str = "/opt/vulnrepro/node_modules";
const READY_TIMEOUT: Duration = Duration::from_secs(30);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(45);

/// Node server kept resident for one session. It polls a command file and
/// answers through a result file tagged with the command's sequence number.
const SERVER_SCRIPT: &str = r#"const fs = require('fs');
const pw = require('playwright');

const DIR = '__DIR__';
const PENDING = DIR + '/pending';
const RESULT = DIR + '/result';

(async () => {
  const browser = await pw.chromium.launch({headless: __HEADLESS__, args: ['--no-sandbox', '--disable-dev-shm-usage']});
  const context = await browser.newContext({ignoreHTTPSErrors: true});
  const page = await context.newPage();
  const consoleLog = [];
  const dialogs = [];

  page.on('console', m => consoleLog.push(m.type() + ': ' + m.text()));
  page.on('dialog', async d => {
    dialogs.push(d.type() + ': ' + d.message());
    try { await d.dismiss(); } catch (e) {}
  });

  const reply = (seq, body) => {
    fs.writeFileSync(RESULT + '.tmp', JSON.stringify(Object.assign({seq: seq}, body)));
    fs.renameSync(RESULT + '.tmp', RESULT);
  };

  fs.writeFileSync(DIR + '/ready', 'ready');

  while (true) {
    if (fs.existsSync(PENDING)) {
      const cmd = JSON.parse(fs.readFileSync(PENDING, 'utf-8'));
      fs.unlinkSync(PENDING);
      try {
        let value = null;
        switch (cmd.action) {
          case 'navigate': {
            const resp = await page.goto(cmd.url, {waitUntil: 'domcontentloaded', timeout: 30000});
            value = {
              status: resp ? resp.status() : null,
              headers: resp ? await resp.allHeaders() : {},
              url: page.url(),
            };
            break;
          }
          case 'fill': await page.fill(cmd.selector, cmd.value, {timeout: 10000}); break;
          case 'click': await page.click(cmd.selector, {timeout: 10000}); break;
          case 'press': await page.keyboard.press(cmd.key); break;
          case 'wait_for_load': await page.waitForLoadState('load', {timeout: 30000}); break;
          case 'content': value = await page.content(); break;
          case 'url': value = page.url(); break;
          case 'exists': value = (await page.$(cmd.selector)) !== null; break;
          case 'screenshot': await page.screenshot({path: cmd.path, fullPage: true}); break;
          case 'console': value = consoleLog; break;
          case 'dialogs': value = dialogs; break;
          case 'quit':
            reply(cmd.seq, {ok: true, value: null});
            await browser.close();
            process.exit(0);
          default: throw new Error('unknown action ' + cmd.action);
        }
        reply(cmd.seq, {ok: true, value: value});
      } catch (e) {
        reply(cmd.seq, {ok: false, error: String((e && e.message) || e)});
      }
    }
    await new Promise(r => setTimeout(r, 50));
  }
})().catch(e => {
  fs.writeFileSync(DIR + '/fatal', String((e && e.message) || e));
  process.exit(1);
});
"#;

/// Launches one Chromium per session inside the browser container.
pub struct PlaywrightEngine {
    container: Arc<ContainerManager>,
    headless: bool,
}

impl PlaywrightEngine {
    pub fn new(container: Arc<ContainerManager>, headless: bool) -> Self {
        Self { container, headless }
    }
}

#[async_trait]
impl BrowserEngine for PlaywrightEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserPage>, ReproError> {
        let session = PlaywrightSession::start(self.container.clone(), self.headless).await?;
        Ok(Box::new(session))
    }
}

pub struct PlaywrightSession {
    container: Arc<ContainerManager>,
    session_id: String,
    seq: AtomicU64,
    closed: AtomicBool,
}

impl PlaywrightSession {
    async fn start(container: Arc<ContainerManager>, headless: bool) -> Result<Self, ReproError> {
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        let session = Self {
            container,
            session_id,
            seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        };
        let dir = session.dir();

        let script = SERVER_SCRIPT
            .replace("__DIR__", &dir)
            .replace("__HEADLESS__", if headless { "true" } else { "false" });
        session.container.exec(&format!("mkdir -p {}", dir), 10).await?;
        session.container
            .exec(&write_file_command(&format!("{}/server.js", dir), script.as_bytes()), 10)
            .await?;

        let launch = format!(
            "cd {dir} && NODE_PATH={node} nohup node server.js > server.log 2>&1 &",
            dir = dir,
            node = NODE_PATH,
        );
        session.container.exec(&launch, 15).await?;

        if let Err(e) = session.wait_ready().await {
            let _ = session.container.exec(&format!("rm -rf {}", dir), 10).await;
            session.closed.store(true, Ordering::SeqCst);
            return Err(e);
        }

        debug!(session = %session.session_id, "Browser session ready");
        Ok(session)
    }

    fn dir(&self) -> String {
        format!("{}/{}", SESSION_ROOT, self.session_id)
    }

    async fn wait_ready(&self) -> Result<(), ReproError> {
        let dir = self.dir();
        let probe = format!(
            "if [ -f {d}/ready ]; then echo READY; elif [ -f {d}/fatal ]; then echo FATAL; cat {d}/fatal; fi",
            d = dir
        );
        let start = Instant::now();
        loop {
            let out = self.container.exec(&probe, 5).await?;
            let out = out.trim();
            if out.starts_with("READY") {
                return Ok(());
            }
            if let Some(reason) = out.strip_prefix("FATAL") {
                return Err(ReproError::Browser(format!("Browser failed to launch: {}", reason.trim())));
            }
            if start.elapsed() > READY_TIMEOUT {
                return Err(ReproError::Timeout("Browser session did not become ready".into()));
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn send(&self, mut cmd: serde_json::Value) -> Result<serde_json::Value, ReproError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ReproError::Browser("Browser session is closed".into()));
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        cmd["seq"] = serde_json::json!(seq);
        let payload = serde_json::to_vec(&cmd)?;

        let dir = self.dir();
        let tmp = format!("{}/pending.tmp", dir);
        let write = format!(
            "{} && mv {} {}/pending",
            write_file_command(&tmp, &payload),
            tmp,
            dir
        );
        self.container.exec(&write, 5).await?;

        let read = format!("cat {d}/result 2>/dev/null && rm -f {d}/result", d = dir);
        let start = Instant::now();
        loop {
            if start.elapsed() > COMMAND_TIMEOUT {
                return Err(ReproError::Timeout(format!(
                    "Browser command '{}' timed out",
                    cmd["action"].as_str().unwrap_or("?")
                )));
            }

            let raw = self.container.exec(&read, 5).await?;
            if !raw.trim().is_empty() {
                return parse_reply(raw.trim(), seq);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

fn parse_reply(raw: &str, seq: u64) -> Result<serde_json::Value, ReproError> {
    let reply: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ReproError::Browser(format!("Malformed browser reply: {}", e)))?;

    if reply["seq"].as_u64() != Some(seq) {
        return Err(ReproError::Browser(format!(
            "Browser reply out of order (expected {}, got {})",
            seq, reply["seq"]
        )));
    }
    if reply["ok"].as_bool() == Some(true) {
        Ok(reply["value"].clone())
    } else {
        Err(ReproError::Browser(
            reply["error"].as_str().unwrap_or("unknown browser error").to_string(),
        ))
    }
}

/// Shell command writing `bytes` to `path` without exposing them to shell expansion.
fn write_file_command(path: &str, bytes: &[u8]) -> String {
    format!("echo {} | base64 -d > {}", data_encoding::BASE64.encode(bytes), path)
}

#[async_trait]
impl BrowserPage for PlaywrightSession {
    async fn navigate(&self, url: &str) -> Result<NavigationResponse, ReproError> {
        let value = self.send(serde_json::json!({"action": "navigate", "url": url})).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), ReproError> {
        self.send(serde_json::json!({"action": "fill", "selector": selector, "value": value})).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), ReproError> {
        self.send(serde_json::json!({"action": "click", "selector": selector})).await?;
        Ok(())
    }

    async fn press(&self, key: &str) -> Result<(), ReproError> {
        self.send(serde_json::json!({"action": "press", "key": key})).await?;
        Ok(())
    }

    async fn wait_for_load(&self) -> Result<(), ReproError> {
        self.send(serde_json::json!({"action": "wait_for_load"})).await?;
        Ok(())
    }

    async fn content(&self) -> Result<String, ReproError> {
        let value = self.send(serde_json::json!({"action": "content"})).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&self) -> Result<String, ReproError> {
        let value = self.send(serde_json::json!({"action": "url"})).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn element_exists(&self, selector: &str) -> Result<bool, ReproError> {
        let value = self.send(serde_json::json!({"action": "exists", "selector": selector})).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), ReproError> {
        let remote = format!("{}/shot.png", self.dir());
        self.send(serde_json::json!({"action": "screenshot", "path": remote})).await?;

        let encoded = self.container
            .exec(&format!("base64 -w0 {r} && rm -f {r}", r = remote), 30)
            .await?;
        let bytes = data_encoding::BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| ReproError::Browser(format!("Screenshot transfer failed: {}", e)))?;

        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn console_messages(&self) -> Result<Vec<String>, ReproError> {
        let value = self.send(serde_json::json!({"action": "console"})).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn dialogs(&self) -> Result<Vec<String>, ReproError> {
        let value = self.send(serde_json::json!({"action": "dialogs"})).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn close(&self) -> Result<(), ReproError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.send(serde_json::json!({"action": "quit"})).await {
            warn!(session = %self.session_id, error = %e, "Browser did not acknowledge quit");
        }
        self.closed.store(true, Ordering::SeqCst);

        // Kill anything left behind and drop the session directory
        let cleanup = format!(
            "pkill -f '{d}/server.js' 2>/dev/null; rm -rf {d}",
            d = self.dir()
        );
        self.container.exec(&cleanup, 10).await?;
        debug!(session = %self.session_id, "Browser session closed");
        Ok(())
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // Best-effort cleanup when a session is dropped without close()
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let container = self.container.clone();
            let dir = self.dir();
            handle.spawn(async move {
                let _ = container
                    .exec(&format!("pkill -f '{d}/server.js' 2>/dev/null; rm -rf {d}", d = dir), 10)
                    .await;
            });
        }
    }
}
