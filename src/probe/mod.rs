//! Reachability check run once before any vulnerability is processed.

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::ReproError;

#[async_trait]
pub trait SiteProbe: Send + Sync {
    /// Ok with the HTTP status when the target answers at all, `Unreachable` otherwise.
    async fn probe(&self, target: &Url) -> Result<u16, ReproError>;
}

pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ReproError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ReproError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl SiteProbe for HttpProbe {
    async fn probe(&self, target: &Url) -> Result<u16, ReproError> {
        info!(target = %target, timeout_ms = self.timeout.as_millis() as u64, "Checking target availability");
        match self.client.get(target.clone()).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                info!(target = %target, status, "Target is reachable");
                Ok(status)
            }
            Err(e) if e.is_timeout() => {
                warn!(target = %target, "Target did not answer in time");
                Err(ReproError::Unreachable(format!(
                    "{} did not answer within {}ms",
                    target,
                    self.timeout.as_millis()
                )))
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Target is not reachable");
                Err(ReproError::Unreachable(format!("{}: {}", target, e)))
            }
        }
    }
}
