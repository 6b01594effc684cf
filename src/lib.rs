//! bpack - buildpack packaging
//!
//! Validates packaging requests, resolves package descriptors and hands
//! them to a packager that produces an image or a buildpackage file.

pub mod buildpackage;
pub mod cache;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod packager;
pub mod ui;

pub use error::{BpackError, BpackResult};
