//! Build cache
//!
//! A cache is a named storage volume used by the packaging backend for
//! intermediate state. At this layer it has an identity and can be reset.
//!
//! # Guarantees
//!
//! - `volume()` never changes for the lifetime of a cache instance
//! - `clear()` either empties the store or fails without touching it
//! - `clear()` on an empty cache succeeds

pub mod volume;

pub use volume::{labels, volume_name_for, CacheLease, VolumeCache, VOLUME_PREFIX};

use crate::error::BpackResult;
use async_trait::async_trait;

/// Named storage volume used during builds
#[async_trait]
pub trait Cache: Send + Sync {
    /// The backing-store identifier
    fn volume(&self) -> &str;

    /// Remove all contents. Fails with `ClearFailed` if the store is in use
    /// or inaccessible.
    async fn clear(&self) -> BpackResult<()>;
}
