//! CLI command implementations

pub mod cache;
pub mod config;
pub mod package_buildpack;

pub use cache::execute as cache;
pub use config::execute as config;
pub use package_buildpack::execute as package_buildpack;
pub use package_buildpack::{PackageBuildpackCommand, PackagingRequest};
