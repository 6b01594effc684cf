//! Engine-volume backed cache
//!
//! Each artifact gets its own named volume. Packaging jobs hold a
//! [`CacheLease`] for their whole run; `clear` refuses to run while any
//! lease is outstanding.

use crate::cache::Cache;
use crate::engine::Engine;
use crate::error::{BpackError, BpackResult};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

/// Volume label keys used to track cache metadata
pub mod labels {
    /// Marks volume as a bpack cache
    pub const BPACK_CACHE: &str = "io.bpack.cache";
    /// Creation timestamp (RFC3339)
    pub const CREATED_AT: &str = "io.bpack.cache.created_at";
}

/// Prefix shared by every derived cache volume
pub const VOLUME_PREFIX: &str = "bpack-cache-";

/// Derive the cache volume name for an artifact
pub fn volume_name_for(artifact: &str) -> String {
    let digest = Sha256::digest(artifact.as_bytes());
    let hash = hex::encode(digest);
    format!("{}{}", VOLUME_PREFIX, &hash[..12])
}

/// Cache stored in a named engine volume
pub struct VolumeCache {
    name: String,
    engine: Arc<dyn Engine>,
    gate: RwLock<()>,
}

/// Shared hold on a cache that blocks `clear` until dropped
pub struct CacheLease<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

impl VolumeCache {
    /// Create a cache over the given volume
    pub fn new(name: impl Into<String>, engine: Arc<dyn Engine>) -> Self {
        Self {
            name: name.into(),
            engine,
            gate: RwLock::new(()),
        }
    }

    /// Create the cache for an artifact, deriving the volume name from it
    pub fn for_artifact(artifact: &str, engine: Arc<dyn Engine>) -> Self {
        Self::new(volume_name_for(artifact), engine)
    }

    /// Acquire a shared lease, waiting for any clear in progress
    pub async fn lease(&self) -> CacheLease<'_> {
        CacheLease {
            _guard: self.gate.read().await,
        }
    }

    /// Create the backing volume if it does not exist yet
    pub async fn ensure(&self) -> BpackResult<()> {
        if self.engine.volume_exists(&self.name).await? {
            return Ok(());
        }
        self.engine.volume_create(&self.name, &self.labels()).await
    }

    /// Labels applied when the volume is created
    pub fn labels(&self) -> HashMap<String, String> {
        let mut labels = HashMap::new();
        labels.insert(labels::BPACK_CACHE.to_string(), "true".to_string());
        labels.insert(labels::CREATED_AT.to_string(), Utc::now().to_rfc3339());
        labels
    }

    fn clear_failed(&self, reason: impl Into<String>) -> BpackError {
        BpackError::ClearFailed {
            volume: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Cache for VolumeCache {
    fn volume(&self) -> &str {
        &self.name
    }

    async fn clear(&self) -> BpackResult<()> {
        let _exclusive = self
            .gate
            .try_write()
            .map_err(|_| self.clear_failed("in use by a running packaging job"))?;

        let exists = self
            .engine
            .volume_exists(&self.name)
            .await
            .map_err(|e| self.clear_failed(e.to_string()))?;

        if !exists {
            debug!("Cache volume {} already empty", self.name);
            return Ok(());
        }

        // A failed remove leaves the volume untouched
        self.engine
            .volume_remove(&self.name)
            .await
            .map_err(|e| self.clear_failed(e.to_string()))?;

        // Contents are gone at this point; a missing volume is recreated by
        // the next `ensure`
        if let Err(e) = self.engine.volume_create(&self.name, &self.labels()).await {
            warn!(
                "Cleared cache volume {} but could not recreate it: {}",
                self.name, e
            );
            return Ok(());
        }

        info!("Cleared cache volume {}", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct VolumeEngine {
        volumes: Mutex<Vec<String>>,
        busy: AtomicBool,
        fail_create: AtomicBool,
        removes: AtomicUsize,
    }

    #[async_trait]
    impl Engine for VolumeEngine {
        async fn image_exists(&self, _image: &str) -> BpackResult<bool> {
            Ok(true)
        }
        async fn pull_image(&self, _image: &str) -> BpackResult<()> {
            Ok(())
        }
        async fn save_image(&self, _image: &str, _dest: &Path) -> BpackResult<()> {
            Ok(())
        }
        async fn import_image(
            &self,
            _archive: &Path,
            _name: &str,
            _labels: &HashMap<String, String>,
        ) -> BpackResult<()> {
            Ok(())
        }
        async fn push_image(&self, _name: &str) -> BpackResult<()> {
            Ok(())
        }
        async fn volume_exists(&self, name: &str) -> BpackResult<bool> {
            Ok(self.volumes.lock().unwrap().iter().any(|v| v == name))
        }
        async fn volume_create(
            &self,
            name: &str,
            _labels: &HashMap<String, String>,
        ) -> BpackResult<()> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(BpackError::command_exec(
                    "podman volume create",
                    "no space left on device",
                ));
            }
            self.volumes.lock().unwrap().push(name.to_string());
            Ok(())
        }
        async fn volume_remove(&self, name: &str) -> BpackResult<()> {
            if self.busy.load(Ordering::SeqCst) {
                return Err(BpackError::command_exec(
                    "podman volume rm",
                    "volume is being used",
                ));
            }
            self.removes.fetch_add(1, Ordering::SeqCst);
            self.volumes.lock().unwrap().retain(|v| v != name);
            Ok(())
        }
        fn engine_name(&self) -> &str {
            "fake"
        }
    }

    #[test]
    fn volume_name_is_stable_and_prefixed() {
        let a = volume_name_for("mybp");
        assert_eq!(a, volume_name_for("mybp"));
        assert!(a.starts_with(VOLUME_PREFIX));
        assert_eq!(a.len(), VOLUME_PREFIX.len() + 12);
        assert_ne!(a, volume_name_for("otherbp"));
    }

    #[tokio::test]
    async fn clear_twice_is_idempotent() {
        let engine = Arc::new(VolumeEngine::default());
        let cache = VolumeCache::for_artifact("mybp", engine.clone());
        cache.ensure().await.unwrap();
        let before = cache.volume().to_string();

        cache.clear().await.unwrap();
        cache.clear().await.unwrap();

        assert_eq!(cache.volume(), before);
        assert!(engine.volume_exists(&before).await.unwrap());
    }

    #[tokio::test]
    async fn clear_missing_volume_is_noop() {
        let engine = Arc::new(VolumeEngine::default());
        let cache = VolumeCache::new("bpack-cache-empty", engine.clone());

        cache.clear().await.unwrap();

        assert_eq!(engine.removes.load(Ordering::SeqCst), 0);
        assert!(!engine.volume_exists("bpack-cache-empty").await.unwrap());
    }

    #[tokio::test]
    async fn clear_fails_while_leased() {
        let engine = Arc::new(VolumeEngine::default());
        let cache = VolumeCache::new("bpack-cache-busy", engine.clone());
        cache.ensure().await.unwrap();

        let lease = cache.lease().await;
        let err = cache.clear().await.unwrap_err();
        assert!(matches!(err, BpackError::ClearFailed { ref volume, .. } if volume == "bpack-cache-busy"));
        assert_eq!(engine.removes.load(Ordering::SeqCst), 0);

        drop(lease);
        cache.clear().await.unwrap();
        assert_eq!(engine.removes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_fails_when_engine_reports_in_use() {
        let engine = Arc::new(VolumeEngine::default());
        let cache = VolumeCache::new("bpack-cache-shared", engine.clone());
        cache.ensure().await.unwrap();
        engine.busy.store(true, Ordering::SeqCst);

        let err = cache.clear().await.unwrap_err();

        assert!(matches!(err, BpackError::ClearFailed { .. }));
        assert!(err.to_string().contains("volume is being used"));
        assert!(engine.volume_exists("bpack-cache-shared").await.unwrap());
    }

    #[tokio::test]
    async fn clear_succeeds_when_recreate_fails_and_ensure_recovers() {
        let engine = Arc::new(VolumeEngine::default());
        let cache = VolumeCache::new("bpack-cache-full", engine.clone());
        cache.ensure().await.unwrap();
        engine.fail_create.store(true, Ordering::SeqCst);

        cache.clear().await.unwrap();
        assert_eq!(engine.removes.load(Ordering::SeqCst), 1);
        assert!(!engine.volume_exists("bpack-cache-full").await.unwrap());

        engine.fail_create.store(false, Ordering::SeqCst);
        cache.ensure().await.unwrap();
        assert!(engine.volume_exists("bpack-cache-full").await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clear_fails_when_engine_unreachable() {
        use crate::engine::CliEngine;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("engine");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'Cannot connect to the Docker daemon' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = Arc::new(CliEngine::new(script.to_string_lossy().into_owned()));
        let cache = VolumeCache::new("bpack-cache-x", engine);

        let err = cache.clear().await.unwrap_err();
        assert!(matches!(err, BpackError::ClearFailed { ref volume, .. } if volume == "bpack-cache-x"));
        assert!(err.to_string().contains("Cannot connect"));
    }

    #[test]
    fn labels_mark_cache() {
        let engine = Arc::new(VolumeEngine::default());
        let cache = VolumeCache::new("bpack-cache-x", engine);
        let labels = cache.labels();
        assert_eq!(labels.get(labels::BPACK_CACHE), Some(&"true".to_string()));
        assert!(labels.contains_key(labels::CREATED_AT));
    }
}
