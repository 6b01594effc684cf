//! Error types for bpack
//!
//! All modules use `BpackResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bpack operations
pub type BpackResult<T> = Result<T, BpackError>;

/// All errors that can occur in bpack
#[derive(Error, Debug)]
pub enum BpackError {
    // Request validation errors
    #[error("The --publish and --no-pull flags cannot be used together. The --publish flag requires the use of remote images.")]
    ConflictingFlags,

    #[error("Please provide a package config path, using --config")]
    MissingConfig,

    // Package descriptor errors
    #[error("Package config not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid package config {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("reading config: {source}")]
    ConfigRead {
        #[source]
        source: Box<BpackError>,
    },

    // Packaging errors
    #[error("packaging {name}: {source}")]
    Packaging {
        name: String,
        #[source]
        source: Box<BpackError>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Dependency image {image} is not available locally and pulling is disabled")]
    MissingDependency { image: String },

    #[error("Cannot publish a package saved as a file. --publish applies to the image format only")]
    PublishRequiresImage,

    #[error("Unsupported platform for {format} packages: {os}")]
    UnsupportedPlatform { os: String, format: String },

    #[error("Unsupported buildpack URI {uri}: {reason}")]
    UnsupportedUri { uri: String, reason: String },

    #[error("Download failed: {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Image pull failed: {image}: {reason}")]
    ImagePull { image: String, reason: String },

    // Cache errors
    #[error("Failed to clear cache volume {volume}: {reason}")]
    ClearFailed { volume: String, reason: String },

    // Application configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl BpackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Wrap a package descriptor failure with the stage that produced it
    pub fn config_read(source: BpackError) -> Self {
        Self::ConfigRead {
            source: Box::new(source),
        }
    }

    /// Wrap a packager failure with the artifact it was producing
    pub fn packaging(name: impl Into<String>, source: BpackError) -> Self {
        Self::Packaging {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through stage wrappers
    pub fn root_cause(&self) -> &BpackError {
        match self {
            Self::ConfigRead { source } | Self::Packaging { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::ImagePull { .. } | Self::Download { .. } | Self::ClearFailed { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self.root_cause() {
            Self::ConflictingFlags => Some("Drop --no-pull, or package without --publish"),
            Self::MissingConfig => Some("Pass the path to package.toml with --config"),
            Self::MissingDependency { .. } => {
                Some("Pull the image first, or run without --no-pull")
            }
            Self::PublishRequiresImage => Some("Use --format image to publish"),
            Self::ClearFailed { .. } => {
                Some("Wait for running packaging jobs to finish, then retry")
            }
            _ => None,
        }
    }
}
