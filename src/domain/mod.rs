//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod ledger;
pub mod live;
pub mod reminder;
pub mod time;

// Re-export common types
pub use audio::{AudioData, AudioMimeType, PcmAudio};
pub use config::AppConfig;
pub use conversation::{ConversationTurn, SystemPrompt, ToolCall, ToolResult};
pub use error::*;
pub use ledger::{Appointment, AppointmentStatus, AppointmentType, Expense, User};
pub use live::{LiveLifecycle, LiveSessionState};
pub use reminder::AlertWindow;
pub use time::Duration;
