//! Package-buildpack command - bundle buildpacks into an image or file
//!
//! Validation happens before any I/O. The descriptor is read once, the
//! packager runs once, and exactly one of {status line, error} comes out.

use crate::buildpackage::{PackageConfigReader, TomlConfigReader};
use crate::cache::VolumeCache;
use crate::cli::args::PackageBuildpackArgs;
use crate::config::Config;
use crate::engine::{CliEngine, Engine};
use crate::error::{BpackError, BpackResult};
use crate::packager::{
    BuildpackPackager, EnginePackager, PackageBuildpackOptions, PackageFormat,
};
use crate::ui::{ConsoleLogger, Logger, UiContext};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEPRECATED_FLAG_WARNING: &str =
    "Flag --package-config has been deprecated, please use --config instead";

/// A single packaging request built from command-line flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingRequest {
    /// Image reference or output file path
    pub name: String,
    /// Package descriptor path, empty when none was given
    pub config_path: PathBuf,
    /// Whether `config_path` came from the deprecated `--package-config`
    pub legacy_config_flag: bool,
    /// Requested format, `None` lets the packager decide
    pub format: Option<PackageFormat>,
    /// Push the image once created
    pub publish: bool,
    /// Never fetch missing images
    pub no_pull: bool,
}

impl PackagingRequest {
    /// Check flag combinations. Performs no I/O.
    pub fn validate(&self) -> BpackResult<()> {
        if self.publish && self.no_pull {
            return Err(BpackError::ConflictingFlags);
        }

        if self.config_path.as_os_str().is_empty() {
            return Err(BpackError::MissingConfig);
        }

        Ok(())
    }
}

impl From<PackageBuildpackArgs> for PackagingRequest {
    fn from(args: PackageBuildpackArgs) -> Self {
        let legacy_config_flag = args.package_config.is_some();
        let config_path = args.config.or(args.package_config).unwrap_or_default();

        Self {
            name: args.name,
            config_path,
            legacy_config_flag,
            format: args.format,
            publish: args.publish,
            no_pull: args.no_pull,
        }
    }
}

/// Orchestrates validation, descriptor reading and packaging
pub struct PackageBuildpackCommand {
    logger: Arc<dyn Logger>,
    packager: Arc<dyn BuildpackPackager>,
    reader: Arc<dyn PackageConfigReader>,
}

impl PackageBuildpackCommand {
    /// Create a command over its collaborators
    pub fn new(
        logger: Arc<dyn Logger>,
        packager: Arc<dyn BuildpackPackager>,
        reader: Arc<dyn PackageConfigReader>,
    ) -> Self {
        Self {
            logger,
            packager,
            reader,
        }
    }

    /// Run one packaging request to completion
    pub async fn execute(
        &self,
        request: PackagingRequest,
        cancel: &CancellationToken,
    ) -> BpackResult<()> {
        request.validate()?;

        if request.legacy_config_flag {
            self.logger.warn(DEPRECATED_FLAG_WARNING);
        }

        let config = self
            .reader
            .read(&request.config_path)
            .await
            .map_err(BpackError::config_read)?;

        let options = PackageBuildpackOptions {
            name: request.name.clone(),
            format: request.format,
            config,
            publish: request.publish,
            no_pull: request.no_pull,
        };

        debug!("Dispatching package {}", options.name);
        self.packager
            .package_buildpack(cancel, options)
            .await
            .map_err(|e| BpackError::packaging(&request.name, e))?;

        let action = if request.publish { "published" } else { "created" };
        self.logger.info(&format!(
            "Successfully {} package \"{}\"",
            action, request.name
        ));
        Ok(())
    }
}

/// Execute the package-buildpack command
pub async fn execute(
    args: PackageBuildpackArgs,
    config: &Config,
    cancel: &CancellationToken,
) -> BpackResult<()> {
    let request = PackagingRequest::from(args);

    let engine: Arc<dyn Engine> = Arc::new(CliEngine::new(config.engine.binary.clone()));
    let cache = match config.cache.volume_override() {
        Some(volume) => VolumeCache::new(volume, engine.clone()),
        None => VolumeCache::for_artifact(&request.name, engine.clone()),
    };

    let command = PackageBuildpackCommand::new(
        Arc::new(ConsoleLogger::new(UiContext::detect())),
        Arc::new(EnginePackager::new(
            engine,
            Arc::new(cache),
            config.packager.default_format,
        )),
        Arc::new(TomlConfigReader::new()),
    );

    command.execute(request, cancel).await
}
