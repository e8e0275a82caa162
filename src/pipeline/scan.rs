use reqwest::Url;
use std::sync::Arc;
use std::time::Instant;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::{BrowserEngine, PlaywrightEngine};
use crate::container::ContainerManager;
use crate::errors::{ReproError, RetryPolicy};
use crate::feed::{self, FileFeed, VulnerabilityFeed};
use crate::generator::ScriptGenerator;
use crate::knowledge::KnowledgeBase;
use crate::llm::{self, LLMProvider};
use crate::models::VerdictStatus;
use crate::probe::{HttpProbe, SiteProbe};
use crate::runners::RunnerRegistry;
use crate::sandbox::ExecutionSandbox;
use crate::store::{FsResultStore, ResultStore, ResultsDir};
use super::orchestrator::AttemptOrchestrator;
use super::state::{ScanConfig, ScanSummary};

/// Probe, then walk the feed one vulnerability at a time, persisting each verdict.
pub struct ScanPipeline {
    target: Url,
    probe: Arc<dyn SiteProbe>,
    feed: Arc<dyn VulnerabilityFeed>,
    orchestrator: AttemptOrchestrator,
    store: Arc<dyn ResultStore>,
    prioritize_by_severity: bool,
    cancel_token: CancellationToken,
}

impl ScanPipeline {
    pub fn new(
        target: Url,
        probe: Arc<dyn SiteProbe>,
        feed: Arc<dyn VulnerabilityFeed>,
        orchestrator: AttemptOrchestrator,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            target,
            probe,
            feed,
            orchestrator,
            store,
            prioritize_by_severity: false,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Wire up the production collaborators described by `config`.
    pub async fn from_config(config: &ScanConfig) -> Result<Self, ReproError> {
        let target = config.target_url()?;

        let llm: Arc<dyn LLMProvider> = Arc::from(llm::create_provider(
            &config.provider,
            &config.api_key,
            config.model.as_deref(),
            config.base_url.as_deref(),
        )?);

        let knowledge = Arc::new(match &config.knowledge_file {
            Some(path) => KnowledgeBase::load_with_overrides(path).await?,
            None => KnowledgeBase::builtin(),
        });

        let registry = if config.use_runners {
            RunnerRegistry::with_defaults(&knowledge)
        } else {
            RunnerRegistry::new()
        };

        let container = Arc::new(ContainerManager::new(&config.browser).await?);
        container.ensure_running().await?;
        let engine: Arc<dyn BrowserEngine> = Arc::new(PlaywrightEngine::new(container, config.headless));

        let results = ResultsDir::new(&config.output_dir);
        results.ensure().await?;
        let sandbox = Arc::new(ExecutionSandbox::new(engine, results.clone(), config.attempt_timeout));

        let generator = Arc::new(
            ScriptGenerator::new(llm, knowledge, target.as_str()).with_max_attempts(config.max_attempts),
        );
        let orchestrator = AttemptOrchestrator::new(Arc::new(registry), generator, sandbox, target.clone())
            .with_max_attempts(config.max_attempts)
            .with_generation_policy(RetryPolicy::new(config.generation_retries));

        info!(
            scan_id = %config.scan_id,
            target = %target,
            provider = %config.provider,
            results = %config.output_dir.display(),
            "Scan pipeline ready"
        );

        Ok(Self::new(
            target,
            Arc::new(HttpProbe::new(config.probe_timeout)?),
            Arc::new(FileFeed::new(&config.feed_path)),
            orchestrator,
            Arc::new(FsResultStore::new(results)),
        )
        .with_prioritization(config.prioritize_by_severity))
    }

    pub fn with_prioritization(mut self, enabled: bool) -> Self {
        self.prioritize_by_severity = enabled;
        self
    }

    /// Replace the pipeline's cancel token with an external one (e.g. wired to Ctrl-C).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    fn check_cancelled(&self) -> Result<(), ReproError> {
        if self.cancel_token.is_cancelled() {
            return Err(ReproError::Cancelled("Scan cancelled".into()));
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<ScanSummary, ReproError> {
        let start = Instant::now();
        let mut summary = ScanSummary { started_at: Some(Utc::now()), ..Default::default() };

        self.check_cancelled()?;
        self.probe.probe(&self.target).await?;

        let mut reports = self.feed.load().await?;
        if self.prioritize_by_severity {
            feed::prioritize(&mut reports);
        }
        info!(count = reports.len(), target = %self.target, "Starting vulnerability reproduction");

        for (index, report) in reports.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                warn!(remaining = reports.len() - index, "Scan cancelled, skipping remaining vulnerabilities");
                break;
            }

            info!(index = index + 1, total = reports.len(), vulnerability = %report.name, "Processing vulnerability");
            let verdict = self.orchestrator.run(report, &self.cancel_token).await;

            let artifact = match self.store.persist(&verdict).await {
                Ok(path) => path,
                Err(e) => {
                    error!(vulnerability = %report.name, error = %e, "Failed to persist verdict");
                    return Err(e);
                }
            };
            summary.record(&verdict, artifact);

            if verdict.status == VerdictStatus::Failed {
                break;
            }
        }

        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            exhausted = summary.exhausted,
            manual = summary.manual,
            interrupted = summary.interrupted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Scan complete"
        );
        Ok(summary)
    }
}
