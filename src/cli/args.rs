//! CLI argument definitions using clap derive

use crate::packager::PackageFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// bpack - package buildpacks
///
/// Bundles a buildpack and its dependencies into a container image or a
/// buildpackage file.
#[derive(Parser, Debug)]
#[command(name = "bpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// bpack configuration file
    #[arg(long, global = true, env = "BPACK_CONFIG", value_name = "PATH")]
    pub config_file: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Package buildpack in OCI format
    PackageBuildpack(PackageBuildpackArgs),

    /// Manage build cache volumes
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the package-buildpack command
#[derive(Parser, Debug)]
pub struct PackageBuildpackArgs {
    /// Image reference or file path of the package
    pub name: String,

    /// Path to package TOML config (required)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Deprecated alias for --config
    #[arg(
        short = 'p',
        long = "package-config",
        value_name = "PATH",
        hide = true,
        conflicts_with = "config"
    )]
    pub package_config: Option<PathBuf>,

    /// Format to save package as
    #[arg(short, long, value_enum)]
    pub format: Option<PackageFormat>,

    /// Publish to registry (applies to "--format image" only)
    #[arg(long)]
    pub publish: bool,

    /// Skip pulling packages before use
    #[arg(long)]
    pub no_pull: bool,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the cache volume used for a package
    Info {
        /// Image reference or file path of the package
        name: String,
    },

    /// Remove all contents of a package's cache volume
    Clear {
        /// Image reference or file path of the package
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
