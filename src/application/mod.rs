//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod chat;
pub mod live;
pub mod ports;
pub mod reminders;
pub mod retry;
pub mod tool_bridge;

// Re-export use cases
pub use chat::{ChatDispatcher, ChatError, SpeechOutput, TurnInput, MAX_TOOL_ROUNDS, MIN_VOICE_NOTE_BYTES};
pub use live::{CloseReport, LiveError, LiveInput, LiveSessionManager, LiveUpdate};
pub use reminders::{NotificationScheduler, SchedulerConfig, SchedulerHandle};
pub use retry::RetryPolicy;
pub use tool_bridge::{ToolExecutionBridge, RECENT_EXPENSE_LIMIT};
