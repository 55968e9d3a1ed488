//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! and the runners for each command.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod live_app;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{run_chat, run_reminders, run_voice, AppError, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, SessionOptions};
pub use live_app::run_live;
pub use presenter::Presenter;
