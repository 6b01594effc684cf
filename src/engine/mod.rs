//! Container engine abstraction
//!
//! The packager and the volume cache never talk to a registry or build
//! image layers themselves. They delegate to an engine CLI (podman or
//! docker) through the [`Engine`] trait.

mod cli;

pub use cli::CliEngine;

use crate::error::{BpackError, BpackResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Abstract container engine interface
#[async_trait]
pub trait Engine: Send + Sync {
    /// Check whether an image is present in local storage
    async fn image_exists(&self, image: &str) -> BpackResult<bool>;

    /// Pull an image from its registry
    async fn pull_image(&self, image: &str) -> BpackResult<()>;

    /// Save a local image to an archive file
    async fn save_image(&self, image: &str, dest: &Path) -> BpackResult<()>;

    /// Import a filesystem archive as image `name`
    async fn import_image(
        &self,
        archive: &Path,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> BpackResult<()>;

    /// Push a local image to its registry
    async fn push_image(&self, name: &str) -> BpackResult<()>;

    /// Check whether a named volume exists
    async fn volume_exists(&self, name: &str) -> BpackResult<bool>;

    /// Create a named volume
    async fn volume_create(&self, name: &str, labels: &HashMap<String, String>) -> BpackResult<()>;

    /// Remove a named volume. Fails if a container is using it.
    async fn volume_remove(&self, name: &str) -> BpackResult<()>;

    /// Get the human-readable engine name for display
    fn engine_name(&self) -> &str;
}

/// Run `fut` unless `cancel` fires first.
///
/// Dropping the engine future kills any child process it spawned.
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = BpackResult<T>>,
) -> BpackResult<T> {
    if cancel.is_cancelled() {
        return Err(BpackError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BpackError::Cancelled),
        result = fut => result,
    }
}
