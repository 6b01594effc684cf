//! Package descriptor parsing
//!
//! A `package.toml` names the main buildpack and the dependencies that
//! are bundled alongside it:
//!
//! ```toml
//! [buildpack]
//! uri = "./my-buildpack"
//!
//! [[dependencies]]
//! uri = "https://example.com/dep.tgz"
//!
//! [[dependencies]]
//! image = "registry.example.com/buildpacks/node:1.2"
//!
//! [platform]
//! os = "linux"
//! ```

use crate::error::{BpackError, BpackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Operating systems a package may target
pub const SUPPORTED_OS: &[&str] = &["linux", "windows"];

/// Parsed package descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// The main buildpack
    pub buildpack: BuildpackRef,

    /// Bundled dependencies, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,

    /// Target platform
    #[serde(default)]
    pub platform: Platform,
}

/// Location of the main buildpack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackRef {
    #[serde(default)]
    pub uri: String,
}

/// A dependency declared by either `uri` or `image`, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Borrowed view of where a dependency comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySource<'a> {
    /// Buildpack archive or directory
    Uri(&'a str),
    /// Container image holding a packaged buildpack
    Image(&'a str),
}

impl Dependency {
    /// Where this dependency comes from. Only meaningful after validation.
    pub fn source(&self) -> Option<DependencySource<'_>> {
        match (&self.uri, &self.image) {
            (Some(uri), None) => Some(DependencySource::Uri(uri)),
            (None, Some(image)) => Some(DependencySource::Image(image)),
            _ => None,
        }
    }
}

/// Target platform section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default = "default_os")]
    pub os: String,
}

impl Default for Platform {
    fn default() -> Self {
        Self { os: default_os() }
    }
}

fn default_os() -> String {
    "linux".to_string()
}

impl PackageConfig {
    /// Parse and validate a descriptor. `origin` is used for error messages
    /// and as the base for relative URIs.
    pub fn parse(content: &str, origin: &Path) -> BpackResult<Self> {
        let mut config: PackageConfig =
            toml::from_str(content).map_err(|e| BpackError::ConfigParse {
                path: origin.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate(origin)?;

        if let Some(base) = origin.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.resolve_relative_uris(base);
        }

        Ok(config)
    }

    fn validate(&self, origin: &Path) -> BpackResult<()> {
        let invalid = |reason: String| BpackError::ConfigParse {
            path: origin.to_path_buf(),
            reason,
        };

        if self.buildpack.uri.trim().is_empty() {
            return Err(invalid("missing 'buildpack.uri'".to_string()));
        }

        for (index, dep) in self.dependencies.iter().enumerate() {
            match (&dep.uri, &dep.image) {
                (Some(_), Some(_)) => {
                    return Err(invalid(format!(
                        "dependency {} must set only one of 'uri' or 'image'",
                        index + 1
                    )))
                }
                (None, None) => {
                    return Err(invalid(format!(
                        "dependency {} must set 'uri' or 'image'",
                        index + 1
                    )))
                }
                (Some(value), None) | (None, Some(value)) if value.trim().is_empty() => {
                    return Err(invalid(format!("dependency {} is empty", index + 1)))
                }
                _ => {}
            }
        }

        if !SUPPORTED_OS.contains(&self.platform.os.as_str()) {
            return Err(invalid(format!(
                "invalid 'platform.os' {:?}, must be one of {}",
                self.platform.os,
                SUPPORTED_OS.join(", ")
            )));
        }

        Ok(())
    }

    fn resolve_relative_uris(&mut self, base: &Path) {
        self.buildpack.uri = resolve_uri(base, &self.buildpack.uri);
        for dep in &mut self.dependencies {
            if let Some(uri) = dep.uri.as_mut() {
                *uri = resolve_uri(base, uri);
            }
        }
    }

    /// Every buildpack URI in archive order: the main buildpack first, then
    /// URI dependencies
    pub fn buildpack_uris(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.buildpack.uri.as_str()).chain(
            self.dependencies
                .iter()
                .filter_map(|d| match d.source() {
                    Some(DependencySource::Uri(uri)) => Some(uri),
                    _ => None,
                }),
        )
    }

    /// Image dependencies in declaration order
    pub fn dependency_images(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().filter_map(|d| match d.source() {
            Some(DependencySource::Image(image)) => Some(image),
            _ => None,
        })
    }
}

/// Whether a URI points at a remote location
pub fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

fn resolve_uri(base: &Path, uri: &str) -> String {
    if uri.contains("://") || Path::new(uri).is_absolute() {
        return uri.to_string();
    }
    base.join(uri).to_string_lossy().into_owned()
}
