//! Buildpack packaging
//!
//! A packager turns resolved [`PackageBuildpackOptions`] into one artifact,
//! either a container image or an archive file on disk.

pub mod archive;
mod engine_packager;

pub use archive::PackageArchive;
pub use engine_packager::{EnginePackager, METADATA_LABEL};

use crate::buildpackage::PackageConfig;
use crate::error::BpackResult;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Output form of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PackageFormat {
    /// Container image
    Image,
    /// Archive file on disk
    File,
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Fully resolved packaging options handed to a packager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBuildpackOptions {
    /// Image reference or output file path
    pub name: String,
    /// Requested format; `None` leaves the choice to the packager
    pub format: Option<PackageFormat>,
    /// Resolved package descriptor
    pub config: PackageConfig,
    /// Push the image after creating it
    pub publish: bool,
    /// Never fetch missing dependency images
    pub no_pull: bool,
}

/// Packages buildpacks into an artifact
///
/// Implementations own the default format, reject `publish` for the file
/// format, honour `no_pull`, and stop with `Cancelled` when `cancel` fires.
/// A failed call must not leave an artifact a retry would treat as done.
#[async_trait]
pub trait BuildpackPackager: Send + Sync {
    /// Produce the artifact named by `options.name`
    async fn package_buildpack(
        &self,
        cancel: &CancellationToken,
        options: PackageBuildpackOptions,
    ) -> BpackResult<()>;
}
