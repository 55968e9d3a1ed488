//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, DEFAULT_CHAT_MODEL, DEFAULT_LIVE_MODEL, DEFAULT_TTS_MODEL, DEFAULT_VOICE,
};
