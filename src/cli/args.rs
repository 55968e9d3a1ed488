//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};

/// Voice Ledger - talk to your expenses and appointments
#[derive(Parser, Debug)]
#[command(name = "voice-ledger")]
#[command(version)]
#[command(about = "Voice-first expense and appointment assistant using Google Gemini")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Account to act as (email-like id)
    #[arg(short = 'u', long, global = true, env = "VOICE_LEDGER_USER", value_name = "EMAIL")]
    pub user: Option<String>,

    /// Disable desktop notifications for reminders
    #[arg(long, global = true)]
    pub no_notify: bool,

    /// Disable audio cues
    #[arg(long, global = true)]
    pub no_cues: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a typed message, or chat interactively when no message is given
    Chat {
        /// Message text
        message: Vec<String>,

        /// Don't check reminders while chatting
        #[arg(long)]
        no_reminders: bool,
    },
    /// Record a voice note, send it and speak the reply
    Voice {
        /// Maximum note length (e.g., 10s, 30s, 1m)
        #[arg(short = 'd', long, value_name = "TIME")]
        duration: Option<String>,

        /// Print the reply without speaking it
        #[arg(long)]
        silent: bool,
    },
    /// Start a realtime voice session (m + Enter toggles mute, q + Enter quits)
    Live {
        /// Prebuilt voice for the model
        #[arg(long, value_name = "NAME")]
        voice: Option<String>,
    },
    /// Watch appointments and alert when they are due
    Reminders {
        /// Time between checks (e.g., 30s, 1m)
        #[arg(short = 'i', long, value_name = "TIME")]
        interval: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Options shared by every command that acts for a user
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub user_id: String,
    pub display_name: String,
    pub api_key: String,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "api_key",
    "user",
    "display_name",
    "chat_model",
    "tts_model",
    "live_model",
    "voice",
    "note_duration",
    "check_interval",
    "alert_lead",
    "alert_lookback",
    "data_dir",
    "audio_cues",
    "notify",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
