//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::time::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;
    store.save(&config).await?;

    let shown = if key == "api_key" {
        mask_api_key(value)
    } else {
        value.to_string()
    };
    presenter.success(&format!("{} = {}", key, shown));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let config = store.load().await?;
    presenter.output(display_value(&config, key).as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, display_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate and store one value
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "note_duration" | "check_interval" | "alert_lead" | "alert_lookback" => {
            value
                .parse::<Duration>()
                .map_err(|e| invalid(e.to_string()))?;
        }
        "user" if !value.contains('@') => {
            return Err(invalid("Expected an email-like id".into()));
        }
        _ => {}
    }

    if let Some(slot) = flag_slot(config, key) {
        *slot = Some(parse_bool(value).map_err(|_| invalid("Value must be 'true' or 'false'".into()))?);
        return Ok(());
    }
    if let Some(slot) = text_slot(config, key) {
        *slot = Some(value.to_string());
        return Ok(());
    }
    Err(invalid("Unknown key".into()))
}

fn text_slot<'a>(config: &'a mut AppConfig, key: &str) -> Option<&'a mut Option<String>> {
    Some(match key {
        "api_key" => &mut config.api_key,
        "user" => &mut config.user,
        "display_name" => &mut config.display_name,
        "chat_model" => &mut config.chat_model,
        "tts_model" => &mut config.tts_model,
        "live_model" => &mut config.live_model,
        "voice" => &mut config.voice,
        "note_duration" => &mut config.note_duration,
        "check_interval" => &mut config.check_interval,
        "alert_lead" => &mut config.alert_lead,
        "alert_lookback" => &mut config.alert_lookback,
        "data_dir" => &mut config.data_dir,
        _ => return None,
    })
}

fn flag_slot<'a>(config: &'a mut AppConfig, key: &str) -> Option<&'a mut Option<bool>> {
    match key {
        "audio_cues" => Some(&mut config.audio_cues),
        "notify" => Some(&mut config.notify),
        _ => None,
    }
}

/// Value as shown to the user; the API key is masked
fn display_value(config: &AppConfig, key: &str) -> Option<String> {
    let mut copy = config.clone();
    if let Some(flag) = flag_slot(&mut copy, key) {
        return flag.map(|b| b.to_string());
    }
    let value = text_slot(&mut copy, key)?.take()?;
    Some(if key == "api_key" {
        mask_api_key(&value)
    } else {
        value
    })
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ()> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(()),
    }
}

/// Mask API key for display (show first 4 and last 4 chars)
fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
