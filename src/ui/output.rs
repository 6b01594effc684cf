//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Report a finished action
pub fn success(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::success(message).ok();
    } else {
        println!("{} {}", style("[OK]").green(), message);
    }
}

/// Report a non-fatal problem
pub fn warn(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::warning(message).ok();
    } else {
        eprintln!("{} {}", style("[WARN]").yellow(), message);
    }
}

/// Report progress or neutral information
pub fn info(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::info(message).ok();
    } else {
        println!("{} {}", style("[INFO]").cyan(), message);
    }
}

/// Print an aligned key/value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {}: {}", style(key).dim(), style(value).cyan());
    } else {
        println!("{}: {}", key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        // These should not panic
        success(&ctx, "Done");
        warn(&ctx, "Careful");
        info(&ctx, "Working");
        key_value(&ctx, "volume", "bpack-cache-0123456789ab");
    }
}
