//! Terminal output
//!
//! Rich `cliclack` rendering in interactive terminals, plain prefixed
//! lines in CI and pipes.

mod context;
mod logger;
mod output;
mod prompts;

pub use context::UiContext;
pub use logger::{ConsoleLogger, LogLine, Logger, MemoryLogger};
pub use output::{info, key_value, success, warn};
pub use prompts::confirm;
