//! Default packager backed by a container engine
//!
//! Stages every buildpack into a tar archive, then either persists the
//! archive as a file or imports it as an image. Nothing becomes visible
//! under the artifact name until the archive is complete.

use crate::buildpackage::{is_remote, PackageConfig};
use crate::cache::{Cache, VolumeCache};
use crate::engine::{cancellable, Engine};
use crate::error::{BpackError, BpackResult};
use crate::packager::archive::PackageArchive;
use crate::packager::{BuildpackPackager, PackageBuildpackOptions, PackageFormat};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Image label carrying the package metadata
pub const METADATA_LABEL: &str = "io.buildpacks.buildpackage.metadata";

/// Image label naming the cache volume used while packaging
const CACHE_LABEL: &str = "io.bpack.cache.volume";

/// Extension expected for file packages
const FILE_EXTENSION: &str = "cnb";

/// Limits for remote buildpack downloads
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Metadata recorded on package images
#[derive(Debug, Serialize)]
struct PackageMetadata<'a> {
    name: &'a str,
    os: &'a str,
    buildpacks: Vec<&'a str>,
    images: Vec<&'a str>,
}

/// Packager that delegates image work to a container engine
pub struct EnginePackager {
    engine: Arc<dyn Engine>,
    cache: Arc<VolumeCache>,
    default_format: PackageFormat,
}

impl EnginePackager {
    /// Create a packager
    pub fn new(
        engine: Arc<dyn Engine>,
        cache: Arc<VolumeCache>,
        default_format: PackageFormat,
    ) -> Self {
        Self {
            engine,
            cache,
            default_format,
        }
    }

    /// Make a dependency image available locally, pulling unless `no_pull`
    async fn ensure_image(
        &self,
        cancel: &CancellationToken,
        image: &str,
        no_pull: bool,
    ) -> BpackResult<()> {
        if cancellable(cancel, self.engine.image_exists(image)).await? {
            debug!("Dependency image present: {}", image);
            return Ok(());
        }

        if no_pull {
            return Err(BpackError::MissingDependency {
                image: image.to_string(),
            });
        }

        cancellable(cancel, self.engine.pull_image(image)).await
    }

    /// Resolve a buildpack URI to a local path, downloading remote ones
    async fn fetch_buildpack(
        &self,
        cancel: &CancellationToken,
        uri: &str,
        staging: &Path,
        index: usize,
    ) -> BpackResult<PathBuf> {
        if is_remote(uri) {
            let dest = staging.join(format!("download-{}-{}", index, remote_file_name(uri)));
            let url = uri.to_string();
            let target = dest.clone();
            let token = cancel.clone();
            cancellable(cancel, async move {
                tokio::task::spawn_blocking(move || download(&url, &target, &token))
                    .await
                    .map_err(|e| BpackError::Internal(format!("download task failed: {}", e)))?
            })
            .await?;
            return Ok(dest);
        }

        let local = uri.strip_prefix("file://").unwrap_or(uri);
        if local.contains("://") {
            return Err(BpackError::UnsupportedUri {
                uri: uri.to_string(),
                reason: "only local paths, file:// and http(s):// are supported".to_string(),
            });
        }

        let path = PathBuf::from(local);
        if !path.exists() {
            return Err(BpackError::UnsupportedUri {
                uri: uri.to_string(),
                reason: "path does not exist".to_string(),
            });
        }
        Ok(path)
    }

    /// Write the complete package archive into `file`
    ///
    /// Sources are gathered first; the archive itself is written on the
    /// blocking pool.
    async fn build_archive(
        &self,
        cancel: &CancellationToken,
        options: &PackageBuildpackOptions,
        file: std::fs::File,
        staging: &Path,
    ) -> BpackResult<std::fs::File> {
        let mut buildpacks = Vec::new();
        for (index, uri) in options.config.buildpack_uris().enumerate() {
            check_cancelled(cancel)?;
            buildpacks.push(self.fetch_buildpack(cancel, uri, staging, index).await?);
        }

        let mut images = Vec::new();
        for (index, image) in options.config.dependency_images().enumerate() {
            check_cancelled(cancel)?;
            self.ensure_image(cancel, image, options.no_pull).await?;

            let saved = staging.join(format!("image-{}.tar", index));
            cancellable(cancel, self.engine.save_image(image, &saved)).await?;
            images.push(saved);
        }

        check_cancelled(cancel)?;
        let config = options.config.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut archive = PackageArchive::new(file, cancel);
            archive.append_descriptor(&config)?;
            for source in &buildpacks {
                debug!("Adding buildpack {}", source.display());
                archive.append_buildpack(source)?;
            }
            for saved in &images {
                archive.append_image(saved)?;
            }
            archive.finish()
        })
        .await
        .map_err(|e| BpackError::Internal(format!("archive task failed: {}", e)))?
    }

    fn image_labels(&self, name: &str, config: &PackageConfig) -> BpackResult<HashMap<String, String>> {
        let metadata = PackageMetadata {
            name,
            os: &config.platform.os,
            buildpacks: config.buildpack_uris().collect(),
            images: config.dependency_images().collect(),
        };

        let mut labels = HashMap::new();
        labels.insert(METADATA_LABEL.to_string(), serde_json::to_string(&metadata)?);
        labels.insert(CACHE_LABEL.to_string(), self.cache.volume().to_string());
        Ok(labels)
    }
}

#[async_trait]
impl BuildpackPackager for EnginePackager {
    async fn package_buildpack(
        &self,
        cancel: &CancellationToken,
        options: PackageBuildpackOptions,
    ) -> BpackResult<()> {
        let format = options.format.unwrap_or(self.default_format);
        debug!("Packaging {} as {}", options.name, format);

        if format == PackageFormat::File && options.publish {
            return Err(BpackError::PublishRequiresImage);
        }

        if format == PackageFormat::Image && options.config.platform.os != "linux" {
            return Err(BpackError::UnsupportedPlatform {
                os: options.config.platform.os.clone(),
                format: format.to_string(),
            });
        }

        check_cancelled(cancel)?;
        let _lease = self.cache.lease().await;

        let needs_engine =
            format == PackageFormat::Image || options.config.dependency_images().next().is_some();
        if needs_engine {
            cancellable(cancel, self.cache.ensure()).await?;
            debug!(
                "Using {} with cache volume {}",
                self.engine.engine_name(),
                self.cache.volume()
            );
        }

        let staging = TempDir::new().map_err(|e| BpackError::io("creating staging directory", e))?;

        match format {
            PackageFormat::File => {
                let output = PathBuf::from(&options.name);
                if output.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                    warn!(
                        "{} does not end in .{}, it may not be recognized as a buildpackage",
                        output.display(),
                        FILE_EXTENSION
                    );
                }

                let parent = output
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let temp = NamedTempFile::new_in(parent)
                    .map_err(|e| BpackError::io(format!("creating file in {}", parent.display()), e))?;
                let file = temp
                    .reopen()
                    .map_err(|e| BpackError::io("opening staged package", e))?;

                self.build_archive(cancel, &options, file, staging.path())
                    .await?;

                temp.persist(&output).map_err(|e| {
                    BpackError::io(format!("writing {}", output.display()), e.error)
                })?;
                info!("Wrote package file {}", output.display());
            }
            PackageFormat::Image => {
                let temp = NamedTempFile::new_in(staging.path())
                    .map_err(|e| BpackError::io("creating staged package", e))?;
                let file = temp
                    .reopen()
                    .map_err(|e| BpackError::io("opening staged package", e))?;

                self.build_archive(cancel, &options, file, staging.path())
                    .await?;

                let labels = self.image_labels(&options.name, &options.config)?;
                cancellable(
                    cancel,
                    self.engine.import_image(temp.path(), &options.name, &labels),
                )
                .await?;

                if options.publish {
                    cancellable(cancel, self.engine.push_image(&options.name)).await?;
                }
            }
        }

        Ok(())
    }
}

fn check_cancelled(cancel: &CancellationToken) -> BpackResult<()> {
    if cancel.is_cancelled() {
        Err(BpackError::Cancelled)
    } else {
        Ok(())
    }
}

/// Last path segment of a URL, used as the staged file name
fn remote_file_name(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("buildpack.tgz")
        .to_string()
}

fn download(url: &str, dest: &Path, cancel: &CancellationToken) -> BpackResult<()> {
    info!("Downloading {}", url);

    let download_error = |reason: String| BpackError::Download {
        url: url.to_string(),
        reason,
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_connect(Some(CONNECT_TIMEOUT))
        .timeout_recv_response(Some(RESPONSE_TIMEOUT))
        .timeout_global(Some(DOWNLOAD_TIMEOUT))
        .build()
        .into();

    let response = agent
        .get(url)
        .call()
        .map_err(|e| download_error(e.to_string()))?;
    let mut reader = response.into_body().into_reader();

    let mut file = std::fs::File::create(dest)
        .map_err(|e| BpackError::io(format!("creating {}", dest.display()), e))?;

    // Copy in chunks so a cancelled run stops reading promptly
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        if cancel.is_cancelled() {
            return Err(BpackError::Cancelled);
        }
        let n = reader
            .read(&mut buf)
            .map_err(|e| download_error(e.to_string()))?;
        if n == 0 {
            return Ok(());
        }
        file.write_all(&buf[..n])
            .map_err(|e| BpackError::io(format!("writing {}", dest.display()), e))?;
    }
}
