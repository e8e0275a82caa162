use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::StreamExt;
use std::time::Duration;
use crate::errors::ReproError;
use super::manager::ContainerManager;
use tracing::debug;

impl ContainerManager {
    /// Run a shell command in the browser container, returning stdout and stderr combined.
    pub async fn exec(&self, command: &str, timeout_secs: u64) -> Result<String, ReproError> {
        debug!(command = %truncate(command, 200), "Executing in container");

        let exec = self.docker().create_exec(
            self.container_name(),
            CreateExecOptions {
                cmd: Some(vec!["bash", "-c", command]),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                ..Default::default()
            },
        ).await
        .map_err(|e| ReproError::Container(format!("Failed to create exec: {}", e)))?;

        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.collect_exec_output(&exec.id),
        ).await
        .map_err(|_| ReproError::Timeout(format!(
            "Container command timed out after {}s: {}",
            timeout_secs,
            truncate(command, 100)
        )))?
        .map_err(|e| ReproError::Container(format!("Exec failed: {}", e)))
    }

    async fn collect_exec_output(&self, exec_id: &str) -> Result<String, bollard::errors::Error> {
        let start_result = self.docker().start_exec(exec_id, None).await?;

        let mut collected = String::new();

        if let StartExecResults::Attached { mut output, .. } = start_result {
            while let Some(msg) = output.next().await {
                match msg {
                    Ok(chunk) => collected.push_str(&chunk.to_string()),
                    Err(e) => {
                        collected.push_str(&format!("\n[exec error: {}]", e));
                        break;
                    }
                }
            }
        }

        Ok(collected)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 10), "ab");
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
