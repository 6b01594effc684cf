//! Reads package descriptors from disk

use super::config::PackageConfig;
use super::PackageConfigReader;
use crate::error::{BpackError, BpackResult};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Reads `package.toml` descriptors from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlConfigReader;

impl TomlConfigReader {
    /// Create a new reader
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackageConfigReader for TomlConfigReader {
    async fn read(&self, path: &Path) -> BpackResult<PackageConfig> {
        debug!("Reading package config: {}", path.display());

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            debug!("Cannot read {}: {}", path.display(), e);
            BpackError::ConfigNotFound(path.to_path_buf())
        })?;

        PackageConfig::parse(&content, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn read_resolves_relative_to_descriptor() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.toml");
        std::fs::write(&path, "[buildpack]\nuri = \"bp\"\n").unwrap();

        let config = TomlConfigReader::new().read(&path).await.unwrap();

        assert_eq!(
            config.buildpack.uri,
            temp.path().join("bp").to_string_lossy()
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.toml");

        let err = TomlConfigReader::new().read(&path).await.unwrap_err();
        assert!(matches!(err, BpackError::ConfigNotFound(p) if p == path));
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let temp = TempDir::new().unwrap();

        let err = TomlConfigReader::new().read(temp.path()).await.unwrap_err();
        assert!(matches!(err, BpackError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn invalid_content_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        let err = TomlConfigReader::new().read(&path).await.unwrap_err();
        assert!(matches!(err, BpackError::ConfigParse { .. }));
    }

    #[tokio::test]
    async fn read_leaves_source_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.toml");
        let content = "[buildpack]\nuri = \"bp\"\n";
        std::fs::write(&path, content).unwrap();

        TomlConfigReader::new().read(&path).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }
}
