use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use crate::errors::ReproError;

/// What the browser saw for the main document of a navigation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationResponse {
    pub status: Option<u16>,
    /// Header names are lowercased.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub url: String,
}

impl NavigationResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// One isolated page with its own cookies, storage and event log.
///
/// Implementations record console output and dialogs for the lifetime of the
/// session; dialogs are dismissed as soon as they open.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<NavigationResponse, ReproError>;
    async fn fill(&self, selector: &str, value: &str) -> Result<(), ReproError>;
    async fn click(&self, selector: &str) -> Result<(), ReproError>;
    async fn press(&self, key: &str) -> Result<(), ReproError>;
    async fn wait_for_load(&self) -> Result<(), ReproError>;
    async fn content(&self) -> Result<String, ReproError>;
    async fn current_url(&self) -> Result<String, ReproError>;
    async fn element_exists(&self, selector: &str) -> Result<bool, ReproError>;
    /// Capture the full page into a PNG at `path` on the local filesystem.
    async fn screenshot(&self, path: &Path) -> Result<(), ReproError>;
    async fn console_messages(&self) -> Result<Vec<String>, ReproError>;
    async fn dialogs(&self) -> Result<Vec<String>, ReproError>;
    /// Release the session. Calling it twice is harmless.
    async fn close(&self) -> Result<(), ReproError>;
}

#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Start a fresh session sharing no state with any other.
    async fn open_session(&self) -> Result<Box<dyn BrowserPage>, ReproError>;
}
