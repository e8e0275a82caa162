use crate::cli::commands::StopArgs;
use crate::config::{self, BrowserHostConfig};
use crate::container::ContainerManager;
use crate::errors::ReproError;
use std::path::PathBuf;
use tracing::info;

pub async fn handle_stop(args: StopArgs) -> Result<(), ReproError> {
    let browser = match &args.config {
        Some(path) => config::parse_config(&PathBuf::from(path)).await?.browser.unwrap_or_default(),
        None => BrowserHostConfig::default(),
    };
    let manager = ContainerManager::new(&browser).await?;

    if args.remove {
        info!(container = %manager.container_name(), "Stopping and removing browser container");
        manager.stop(true).await?;
        println!("Container {} removed", manager.container_name());
    } else {
        manager.stop(false).await?;
        println!("Container {} stopped", manager.container_name());
    }

    Ok(())
}
