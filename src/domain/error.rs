//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format like 30s, 1m, 2m30s or 1h")]
pub struct DurationParseError {
    pub input: String,
}

/// Input rejected before it reaches the network or the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("A message needs text or a voice note")]
    EmptyTurn,

    #[error("Voice note is too short ({size} bytes). Hold the button a little longer.")]
    AudioTooShort { size: usize },
}

impl ValidationError {
    /// Shorthand for an invalid field value
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// Error when a state machine is driven out of order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: String,
    pub action: String,
}

impl InvalidStateTransition {
    pub fn new(current_state: impl ToString, action: impl Into<String>) -> Self {
        Self {
            current_state: current_state.to_string(),
            action: action.into(),
        }
    }
}
