//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::reminder::AlertWindow;
use crate::domain::time::Duration;

/// Model used for turn-based chat with tools
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Model used to speak replies to voice notes
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Model used for realtime voice sessions
pub const DEFAULT_LIVE_MODEL: &str = "gemini-live-2.5-flash-preview";

/// Prebuilt voice for synthesized speech
pub const DEFAULT_VOICE: &str = "Kore";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub display_name: Option<String>,
    pub chat_model: Option<String>,
    pub tts_model: Option<String>,
    pub live_model: Option<String>,
    pub voice: Option<String>,
    pub note_duration: Option<String>,
    pub check_interval: Option<String>,
    pub alert_lead: Option<String>,
    pub alert_lookback: Option<String>,
    pub data_dir: Option<String>,
    pub audio_cues: Option<bool>,
    pub notify: Option<bool>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            api_key: None,
            user: None,
            display_name: None,
            chat_model: Some(DEFAULT_CHAT_MODEL.to_string()),
            tts_model: Some(DEFAULT_TTS_MODEL.to_string()),
            live_model: Some(DEFAULT_LIVE_MODEL.to_string()),
            voice: Some(DEFAULT_VOICE.to_string()),
            note_duration: Some("10s".to_string()),
            check_interval: Some("30s".to_string()),
            alert_lead: Some("60s".to_string()),
            alert_lookback: Some("1h".to_string()),
            data_dir: None,
            audio_cues: Some(true),
            notify: Some(true),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            api_key: other.api_key.or(self.api_key),
            user: other.user.or(self.user),
            display_name: other.display_name.or(self.display_name),
            chat_model: other.chat_model.or(self.chat_model),
            tts_model: other.tts_model.or(self.tts_model),
            live_model: other.live_model.or(self.live_model),
            voice: other.voice.or(self.voice),
            note_duration: other.note_duration.or(self.note_duration),
            check_interval: other.check_interval.or(self.check_interval),
            alert_lead: other.alert_lead.or(self.alert_lead),
            alert_lookback: other.alert_lookback.or(self.alert_lookback),
            data_dir: other.data_dir.or(self.data_dir),
            audio_cues: other.audio_cues.or(self.audio_cues),
            notify: other.notify.or(self.notify),
        }
    }

    /// Voice note length, or default if not set/invalid
    pub fn note_duration_or_default(&self) -> Duration {
        parse_or(&self.note_duration, Duration::default_note())
    }

    /// Reminder polling interval, or default if not set/invalid
    pub fn check_interval_or_default(&self) -> Duration {
        parse_or(&self.check_interval, Duration::default_check_interval())
    }

    /// Alert window built from `alert_lead` and `alert_lookback`
    pub fn alert_window(&self) -> AlertWindow {
        AlertWindow::new(
            parse_or(&self.alert_lead, Duration::default_alert_lead()),
            parse_or(&self.alert_lookback, Duration::default_alert_lookback()),
        )
    }

    pub fn chat_model_or_default(&self) -> &str {
        self.chat_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }

    pub fn tts_model_or_default(&self) -> &str {
        self.tts_model.as_deref().unwrap_or(DEFAULT_TTS_MODEL)
    }

    pub fn live_model_or_default(&self) -> &str {
        self.live_model.as_deref().unwrap_or(DEFAULT_LIVE_MODEL)
    }

    pub fn voice_or_default(&self) -> &str {
        self.voice.as_deref().unwrap_or(DEFAULT_VOICE)
    }

    /// Display name, falling back to the part of the user id before '@'
    pub fn display_name_for(&self, user_id: &str) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| user_id.split('@').next().unwrap_or(user_id).to_string())
    }

    /// Ledger directory, or the platform data dir
    pub fn data_dir_or_default(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("voice-ledger")
            })
    }

    /// Get audio cue setting, or true if not set
    pub fn audio_cues_or_default(&self) -> bool {
        self.audio_cues.unwrap_or(true)
    }

    /// Get notify setting, or true if not set
    pub fn notify_or_default(&self) -> bool {
        self.notify.unwrap_or(true)
    }
}

fn parse_or(value: &Option<String>, default: Duration) -> Duration {
    value
        .as_ref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
