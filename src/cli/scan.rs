use crate::cli::commands::ScanArgs;
use crate::config::{self, ReproConfig};
use crate::errors::ReproError;
use crate::llm::catalog;
use crate::pipeline::state::ScanConfig;
use crate::pipeline::ScanPipeline;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn handle_scan(args: ScanArgs) -> Result<(), ReproError> {
    info!(target = %args.target, feed = %args.feed, "Starting vulnerability reproduction scan");

    // Parse config file if provided
    let file_config = if let Some(config_path) = &args.config {
        Some(config::parse_config(&PathBuf::from(config_path)).await?)
    } else {
        None
    };

    let scan_config = build_scan_config(&args, file_config.as_ref())?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current attempt");
            on_signal.cancel();
        }
    });

    let pipeline = ScanPipeline::from_config(&scan_config).await?.with_cancel_token(cancel);
    let summary = pipeline.run().await?;

    println!(
        "Processed {} vulnerabilities: {} reproduced, {} exhausted, {} need manual testing{}",
        summary.processed,
        summary.succeeded,
        summary.exhausted,
        summary.manual,
        if summary.interrupted > 0 { ", scan interrupted" } else { "" }
    );
    println!("Results written to {}", scan_config.output_dir.display());
    Ok(())
}

/// CLI flags win over the config file, which wins over built-in defaults.
pub fn build_scan_config(args: &ScanArgs, file_config: Option<&ReproConfig>) -> Result<ScanConfig, ReproError> {
    let mut config = ScanConfig::new(&args.target, PathBuf::from(&args.feed));
    config.target_url()?;

    let llm = file_config.and_then(|c| c.llm.as_ref());
    let scan = file_config.and_then(|c| c.scan.as_ref());

    config.provider = args.provider.clone()
        .or_else(|| llm.and_then(|l| l.provider.clone()))
        .unwrap_or(config.provider);
    if catalog::get_provider(&config.provider).is_none() {
        return Err(ReproError::Config(format!("Unknown LLM provider: {}", config.provider)));
    }
    config.model = args.model.clone().or_else(|| llm.and_then(|l| l.model.clone()));
    config.base_url = args.base_url.clone().or_else(|| llm.and_then(|l| l.base_url.clone()));
    config.api_key = args.api_key.clone()
        .or_else(|| llm.and_then(|l| l.api_key.clone()))
        .or_else(|| resolve_api_key_from_env(&config.provider))
        .unwrap_or_default();

    if let Some(id) = &args.scan_id {
        config.scan_id = id.clone();
    }
    if let Some(output) = args.output.clone()
        .or_else(|| file_config.and_then(|c| c.output.as_ref()?.directory.clone()))
    {
        config.output_dir = PathBuf::from(output);
    }

    if let Some(n) = args.max_attempts.or_else(|| scan.and_then(|s| s.max_attempts)) {
        if n == 0 {
            return Err(ReproError::Config("max attempts must be at least 1".into()));
        }
        config.max_attempts = n;
    }
    if let Some(n) = scan.and_then(|s| s.generation_retries) {
        config.generation_retries = n.max(1);
    }
    if let Some(secs) = args.attempt_timeout.or_else(|| scan.and_then(|s| s.attempt_timeout_secs)) {
        config.attempt_timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(ms) = scan.and_then(|s| s.probe_timeout_ms) {
        config.probe_timeout = Duration::from_millis(ms);
    }
    config.prioritize_by_severity = args.prioritize
        || scan.and_then(|s| s.prioritize_by_severity).unwrap_or(false);
    config.use_runners = !args.no_runners && scan.and_then(|s| s.use_runners).unwrap_or(true);
    config.headless = !args.headed;

    if let Some(browser) = file_config.and_then(|c| c.browser.clone()) {
        config.browser = browser;
    }
    config.knowledge_file = file_config
        .and_then(|c| c.knowledge.as_ref()?.file.clone())
        .map(PathBuf::from);

    Ok(config)
}

fn resolve_api_key_from_env(provider: &str) -> Option<String> {
    let var_name = catalog::api_key_env_var(provider)?;
    std::env::var(var_name).ok().filter(|k| !k.is_empty())
}
