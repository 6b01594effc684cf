//! Confirmation prompt with non-interactive fallback

use super::context::UiContext;
use crate::error::{BpackError, BpackResult};

/// Ask a yes/no question. Returns `true` when pre-approved and `default`
/// when no terminal is attached.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> BpackResult<bool> {
    if ctx.assume_yes() {
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| BpackError::Internal(format!("prompt task failed: {}", e)))?
    .map_err(|e| BpackError::User(format!("Prompt failed: {}", e)))
}
