//! Configuration schema for bpack
//!
//! Configuration is stored at `~/.config/bpack/config.toml`

use crate::packager::PackageFormat;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Packaging defaults
    pub packager: PackagerConfig,

    /// Container engine settings
    pub engine: EngineConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Packager defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    /// Format used when `--format` is not given
    pub default_format: PackageFormat,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            default_format: PackageFormat::Image,
        }
    }
}

/// Container engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary (podman or docker)
    pub binary: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "podman".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Fixed cache volume name. Empty derives one per artifact.
    pub volume: String,
}

impl CacheConfig {
    /// The configured volume override, if any
    pub fn volume_override(&self) -> Option<&str> {
        let trimmed = self.volume.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
