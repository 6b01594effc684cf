//! Cache command - inspect and clear build cache volumes

use crate::cache::{Cache, VolumeCache};
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::Config;
use crate::engine::{CliEngine, Engine};
use crate::error::BpackResult;
use crate::ui::{self, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> BpackResult<()> {
    let engine: Arc<dyn Engine> = Arc::new(CliEngine::new(config.engine.binary.clone()));
    let ctx = UiContext::detect();

    match args.action {
        CacheAction::Info { name } => {
            let cache = cache_for(&name, config, engine);
            show_info(&ctx, &name, &cache);
            Ok(())
        }
        CacheAction::Clear { name, yes } => {
            let cache = cache_for(&name, config, engine);
            clear_cache(&ctx.with_assume_yes(yes), &cache).await
        }
    }
}

/// The cache a package build of `name` would use
fn cache_for(name: &str, config: &Config, engine: Arc<dyn Engine>) -> VolumeCache {
    match config.cache.volume_override() {
        Some(volume) => VolumeCache::new(volume, engine),
        None => VolumeCache::for_artifact(name, engine),
    }
}

fn show_info(ctx: &UiContext, name: &str, cache: &dyn Cache) {
    ui::key_value(ctx, "package", name);
    ui::key_value(ctx, "volume", cache.volume());
}

async fn clear_cache(ctx: &UiContext, cache: &dyn Cache) -> BpackResult<()> {
    let prompt = format!("Remove all contents of cache volume {}?", cache.volume());
    if !ui::confirm(ctx, &prompt, false).await? {
        ui::info(ctx, "Aborted, cache left untouched");
        return Ok(());
    }

    debug!("Clearing cache volume {}", cache.volume());
    cache.clear().await?;
    ui::success(ctx, &format!("Cleared cache volume {}", cache.volume()));
    Ok(())
}
