use reqwest::Url;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier;
use crate::errors::RetryPolicy;
use crate::generator::ScriptGenerator;
use crate::models::{
    AggregatedVerdict, AttemptResult, Classification, ExecutionRecord, VulnerabilityReport,
};
use crate::runners::{Route, RunnerRegistry};
use crate::sandbox::ExecutionSandbox;
use super::state::{OrchestratorState, MAX_ATTEMPTS};

/// Drives the bounded attempt loop for one vulnerability at a time.
pub struct AttemptOrchestrator {
    registry: Arc<RunnerRegistry>,
    generator: Arc<ScriptGenerator>,
    sandbox: Arc<ExecutionSandbox>,
    target: Url,
    max_attempts: u32,
    generation_policy: RetryPolicy,
}

impl AttemptOrchestrator {
    pub fn new(
        registry: Arc<RunnerRegistry>,
        generator: Arc<ScriptGenerator>,
        sandbox: Arc<ExecutionSandbox>,
        target: Url,
    ) -> Self {
        Self {
            registry,
            generator,
            sandbox,
            target,
            max_attempts: MAX_ATTEMPTS,
            generation_policy: RetryPolicy::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_generation_policy(mut self, policy: RetryPolicy) -> Self {
        self.generation_policy = policy;
        self
    }

    /// Classify, route and attempt `vulnerability`. Attempt failures never escape;
    /// they are part of the returned verdict.
    pub async fn run(&self, vulnerability: &VulnerabilityReport, cancel: &CancellationToken) -> AggregatedVerdict {
        let classification = classifier::classify(&vulnerability.name, &vulnerability.details);
        let target = self.target.as_str();
        info!(
            vulnerability = %vulnerability.name,
            category = %classification.category,
            automatable = classification.automatable,
            "Vulnerability classified"
        );

        let route = self.registry.route(&classification);
        if let Route::Manual = route {
            info!(vulnerability = %vulnerability.name, "No automated path, manual testing required");
            return AggregatedVerdict::manual(&vulnerability.name, target, classification.category);
        }

        let mut state = OrchestratorState::Pending;
        let mut attempts = Vec::new();
        transition(&mut state, OrchestratorState::Running, &vulnerability.name);

        for attempt_number in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                transition(&mut state, OrchestratorState::Failed, &vulnerability.name);
                break;
            }

            let start = Instant::now();
            let record = self.attempt(&route, &classification, vulnerability, attempt_number, cancel).await;
            info!(
                vulnerability = %vulnerability.name,
                attempt = attempt_number,
                status = ?record.status,
                success = record.success,
                duration_ms = start.elapsed().as_millis() as u64,
                "Attempt finished"
            );
            if let Some(err) = &record.error {
                warn!(vulnerability = %vulnerability.name, attempt = attempt_number, error = %err, "Attempt errored");
            }

            let success = record.success;
            attempts.push(AttemptResult::new(attempt_number, record));

            if success {
                transition(&mut state, OrchestratorState::Succeeded, &vulnerability.name);
                break;
            }
            if cancel.is_cancelled() {
                transition(&mut state, OrchestratorState::Failed, &vulnerability.name);
                break;
            }
        }

        if !state.is_terminal() {
            transition(&mut state, OrchestratorState::Exhausted, &vulnerability.name);
        }

        AggregatedVerdict::aggregate(
            &vulnerability.name,
            target,
            classification.category,
            state.verdict_status(),
            attempts,
        )
    }

    async fn attempt(
        &self,
        route: &Route,
        classification: &Classification,
        vulnerability: &VulnerabilityReport,
        attempt_number: u32,
        cancel: &CancellationToken,
    ) -> ExecutionRecord {
        match route {
            Route::Runner(runner) => {
                debug!(runner = runner.name(), attempt = attempt_number, "Using specialised runner");
                runner.run(vulnerability, &self.sandbox, &self.target, cancel).await
            }
            Route::Generated => {
                let script = self
                    .generator
                    .generate_with_retry(
                        vulnerability,
                        classification.category,
                        attempt_number,
                        &self.generation_policy,
                        cancel,
                    )
                    .await;
                match script {
                    Ok(script) => self.sandbox.execute(&script, &self.target, cancel).await,
                    Err(e) => ExecutionRecord::error(e.to_string()),
                }
            }
            Route::Manual => ExecutionRecord::manual_testing_required(),
        }
    }
}

fn transition(state: &mut OrchestratorState, next: OrchestratorState, vulnerability: &str) {
    debug!(vulnerability = %vulnerability, from = %state, to = %next, "Attempt loop state");
    *state = next;
}
