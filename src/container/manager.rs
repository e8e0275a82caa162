use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, StartContainerOptions, StopContainerOptions,
    RemoveContainerOptions, ListContainersOptions,
};
use bollard::models::HostConfig;
use std::collections::HashMap;
use crate::config::BrowserHostConfig;
use crate::errors::ReproError;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerStatus {
    Running,
    Stopped,
    NotFound,
}

/// Owns the long-lived container that browser sessions are launched in.
pub struct ContainerManager {
    docker: Docker,
    image: String,
    container_name: String,
    network_mode: String,
    shm_size_mb: i64,
    playwright_version: String,
}

impl ContainerManager {
    pub async fn new(config: &BrowserHostConfig) -> Result<Self, ReproError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ReproError::Container(format!("Failed to connect to Docker: {}", e)))?;
        let defaults = BrowserHostConfig::default();

        Ok(Self {
            docker,
            image: config.image.clone().or(defaults.image).unwrap_or_default(),
            container_name: config.name.clone().or(defaults.name).unwrap_or_default(),
            network_mode: config.network_mode.clone().or(defaults.network_mode).unwrap_or_default(),
            shm_size_mb: config.shm_size_mb.or(defaults.shm_size_mb).unwrap_or(1024),
            playwright_version: config.playwright_version.clone()
                .or(defaults.playwright_version)
                .unwrap_or_default(),
        })
    }

    pub async fn status(&self) -> ContainerStatus {
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![self.container_name.clone()]);

        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        match self.docker.list_containers(Some(options)).await {
            Ok(containers) => {
                let target = format!("/{}", self.container_name);
                for container in &containers {
                    let matches = container.names.as_ref()
                        .is_some_and(|names| names.iter().any(|n| n == &target));
                    if matches {
                        return match container.state.as_deref() {
                            Some("running") => ContainerStatus::Running,
                            _ => ContainerStatus::Stopped,
                        };
                    }
                }
                ContainerStatus::NotFound
            }
            Err(_) => ContainerStatus::NotFound,
        }
    }

    pub async fn ensure_running(&self) -> Result<(), ReproError> {
        match self.status().await {
            ContainerStatus::Running => {
                info!(container = %self.container_name, "Browser container already running");
            }
            ContainerStatus::Stopped => {
                info!(container = %self.container_name, "Starting existing browser container");
                self.start_existing().await?;
            }
            ContainerStatus::NotFound => {
                info!(container = %self.container_name, "Creating browser container");
                self.ensure_image().await?;
                self.create_and_start().await?;
            }
        }
        self.ensure_playwright().await
    }

    async fn start_existing(&self) -> Result<(), ReproError> {
        self.docker
            .start_container(&self.container_name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| ReproError::Container(format!("Failed to start container: {}", e)))?;
        Ok(())
    }

    async fn ensure_image(&self) -> Result<(), ReproError> {
        match self.docker.inspect_image(&self.image).await {
            Ok(_) => {
                info!(image = %self.image, "Image found locally");
                Ok(())
            }
            Err(_) => {
                warn!(image = %self.image, "Browser image not found locally");
                Err(ReproError::Container(format!(
                    "Image '{}' not found. Pull it with: docker pull {}",
                    self.image, self.image
                )))
            }
        }
    }

    /// The stock Playwright images ship browsers but not the npm package.
    async fn ensure_playwright(&self) -> Result<(), ReproError> {
        let check = "test -d /opt/vulnrepro/node_modules/playwright && echo present";
        if self.exec(check, 10).await?.contains("present") {
            return Ok(());
        }

        info!(version = %self.playwright_version, "Installing playwright package in container");
        let install = format!(
            "mkdir -p /opt/vulnrepro && cd /opt/vulnrepro && npm install --silent playwright@{} >/dev/null 2>&1 && echo installed",
            self.playwright_version
        );
        let output = self.exec(&install, 300).await?;
        if !output.contains("installed") {
            return Err(ReproError::Container(format!(
                "Failed to install playwright@{} in container",
                self.playwright_version
            )));
        }
        Ok(())
    }

    async fn create_and_start(&self) -> Result<(), ReproError> {
        let host_config = HostConfig {
            network_mode: Some(self.network_mode.clone()),
            shm_size: Some(self.shm_size_mb * 1024 * 1024),
            ..Default::default()
        };

        let config = Config {
            image: Some(self.image.clone()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            env: Some(vec!["NODE_PATH=/opt/vulnrepro/node_modules".to_string()]),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: &self.container_name,
            platform: None,
        };

        self.docker.create_container(Some(options), config).await
            .map_err(|e| ReproError::Container(format!("Failed to create container: {}", e)))?;

        self.start_existing().await?;

        info!(container = %self.container_name, "Browser container created and started");
        Ok(())
    }

    pub async fn stop(&self, remove: bool) -> Result<(), ReproError> {
        let status = self.status().await;
        if status == ContainerStatus::NotFound {
            return Ok(());
        }

        if status == ContainerStatus::Running {
            self.docker
                .stop_container(&self.container_name, Some(StopContainerOptions { t: 10 }))
                .await
                .map_err(|e| ReproError::Container(format!("Failed to stop container: {}", e)))?;
            info!(container = %self.container_name, "Browser container stopped");
        }

        if remove {
            self.docker
                .remove_container(
                    &self.container_name,
                    Some(RemoveContainerOptions { force: true, ..Default::default() }),
                )
                .await
                .map_err(|e| ReproError::Container(format!("Failed to remove container: {}", e)))?;
            info!(container = %self.container_name, "Browser container removed");
        }

        Ok(())
    }

    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }
}
