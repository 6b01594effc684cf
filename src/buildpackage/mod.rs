//! Package descriptors
//!
//! A package descriptor (`package.toml`) lists the buildpacks that make
//! up a buildpackage. Readers turn a path into a validated
//! [`PackageConfig`].

pub mod config;
pub mod reader;

pub use config::{is_remote, BuildpackRef, Dependency, DependencySource, PackageConfig, Platform};
pub use reader::TomlConfigReader;

use crate::error::BpackResult;
use async_trait::async_trait;
use std::path::Path;

/// Resolves a path into a package descriptor
///
/// Fails with `ConfigNotFound` when the path is not a readable file and
/// `ConfigParse` when its content is invalid. Never modifies the source.
#[async_trait]
pub trait PackageConfigReader: Send + Sync {
    /// Read and validate the descriptor at `path`
    async fn read(&self, path: &Path) -> BpackResult<PackageConfig>;
}
