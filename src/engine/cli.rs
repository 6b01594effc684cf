//! Engine implementation that shells out to podman or docker
//!
//! Both CLIs accept the same subcommands for everything bpack needs, so
//! one implementation covers either binary.

use crate::engine::Engine;
use crate::error::{BpackError, BpackResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Container engine driven through its command line
#[derive(Debug, Clone)]
pub struct CliEngine {
    binary: String,
}

impl CliEngine {
    /// Create an engine for the given binary (e.g. "podman" or "docker")
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Execute an engine command and return the output
    async fn exec(&self, args: &[&str]) -> BpackResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.binary, args);

        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BpackError::command_failed(format!("{} {:?}", self.binary, args), e))
    }

    /// Execute an inspect command, mapping "not found" to `false`
    ///
    /// Any other failure (unreachable daemon, broken storage) is an error so
    /// callers never mistake an outage for a missing object.
    async fn exec_exists(&self, subcommand: &str, args: &[&str]) -> BpackResult<bool> {
        let output = self.exec(args).await?;

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_not_found(&stderr) {
            Ok(false)
        } else {
            Err(BpackError::command_exec(
                format!("{} {}", self.binary, subcommand),
                stderr.trim(),
            ))
        }
    }

    /// Execute a command that must succeed, reporting stderr otherwise
    async fn exec_ok(&self, subcommand: &str, args: &[&str]) -> BpackResult<()> {
        let output = self.exec(args).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(BpackError::command_exec(
                format!("{} {}", self.binary, subcommand),
                stderr.trim(),
            ))
        }
    }
}

impl Default for CliEngine {
    fn default() -> Self {
        Self::new("podman")
    }
}

/// Whether engine stderr reports a missing object rather than a failure
///
/// docker says "No such volume" / "No such image", podman says
/// "no such volume" or "image not known".
fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["no such", "not known", "not found"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

/// Render a label as a Dockerfile `LABEL` instruction for `import --change`
fn label_change(key: &str, value: &str) -> String {
    let quoted = serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value));
    format!("LABEL {}={}", key, quoted)
}

#[async_trait]
impl Engine for CliEngine {
    async fn image_exists(&self, image: &str) -> BpackResult<bool> {
        self.exec_exists(
            "image inspect",
            &["image", "inspect", "--format", "{{.Id}}", image],
        )
        .await
    }

    async fn pull_image(&self, image: &str) -> BpackResult<()> {
        info!("Pulling image: {}", image);

        let output = self.exec(&["pull", image]).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(BpackError::ImagePull {
                image: image.to_string(),
                reason: stderr.trim().to_string(),
            })
        }
    }

    async fn save_image(&self, image: &str, dest: &Path) -> BpackResult<()> {
        debug!("Saving image {} to {}", image, dest.display());
        let dest = dest.to_string_lossy();
        self.exec_ok("save", &["save", "-o", &dest, image]).await
    }

    async fn import_image(
        &self,
        archive: &Path,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> BpackResult<()> {
        info!("Importing package image: {}", name);

        let changes: Vec<String> = labels.iter().map(|(k, v)| label_change(k, v)).collect();
        let archive = archive.to_string_lossy();

        let mut args = vec!["import"];
        for change in &changes {
            args.push("--change");
            args.push(change);
        }
        args.push(&archive);
        args.push(name);

        self.exec_ok("import", &args).await
    }

    async fn push_image(&self, name: &str) -> BpackResult<()> {
        info!("Pushing image: {}", name);
        self.exec_ok("push", &["push", name]).await
    }

    async fn volume_exists(&self, name: &str) -> BpackResult<bool> {
        self.exec_exists("volume inspect", &["volume", "inspect", name])
            .await
    }

    async fn volume_create(&self, name: &str, labels: &HashMap<String, String>) -> BpackResult<()> {
        debug!("Creating volume: {}", name);

        let label_args: Vec<String> = labels.iter().map(|(k, v)| format!("{}={}", k, v)).collect();

        let mut args = vec!["volume", "create"];
        for label in &label_args {
            args.push("--label");
            args.push(label);
        }
        args.push(name);

        self.exec_ok("volume create", &args).await
    }

    async fn volume_remove(&self, name: &str) -> BpackResult<()> {
        debug!("Removing volume: {}", name);
        self.exec_ok("volume rm", &["volume", "rm", name]).await
    }

    fn engine_name(&self) -> &str {
        &self.binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_engine_default_is_podman() {
        let engine = CliEngine::default();
        assert_eq!(engine.engine_name(), "podman");
    }

    #[test]
    fn label_change_quotes_value() {
        assert_eq!(
            label_change("io.bpack.name", "my bp"),
            r#"LABEL io.bpack.name="my bp""#
        );
        assert_eq!(
            label_change("io.bpack.meta", r#"{"os":"linux"}"#),
            r#"LABEL io.bpack.meta="{\"os\":\"linux\"}""#
        );
    }

    #[test]
    fn not_found_messages() {
        assert!(is_not_found("Error: No such volume: bpack-cache-x"));
        assert!(is_not_found("Error: no such volume bpack-cache-x"));
        assert!(is_not_found("Error: example/image: image not known"));
        assert!(!is_not_found(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock"
        ));
        assert!(!is_not_found("Error: database is locked"));
    }

    /// Engine binary that prints `stderr` and exits 1 for every command
    #[cfg(unix)]
    fn failing_engine(dir: &tempfile::TempDir, stderr: &str) -> CliEngine {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.path().join("engine");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho '{}' >&2\nexit 1\n", stderr),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        CliEngine::new(script.to_string_lossy().into_owned())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreachable_daemon_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = failing_engine(&dir, "Cannot connect to the Docker daemon");

        let err = engine.volume_exists("bpack-cache-x").await.unwrap_err();
        assert!(matches!(err, BpackError::CommandExecution { .. }));
        assert!(err.to_string().contains("Cannot connect"));

        let err = engine.image_exists("example/image").await.unwrap_err();
        assert!(matches!(err, BpackError::CommandExecution { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_volume_is_false() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = failing_engine(&dir, "Error: No such volume: bpack-cache-x");

        assert!(!engine.volume_exists("bpack-cache-x").await.unwrap());
        assert!(!engine.image_exists("example/image").await.unwrap());
    }

    #[tokio::test]
    async fn missing_binary_is_command_failed() {
        let engine = CliEngine::new("bpack-engine-that-does-not-exist");
        let err = engine.image_exists("example/image").await.unwrap_err();
        assert!(matches!(err, BpackError::CommandFailed { .. }));
    }
}
