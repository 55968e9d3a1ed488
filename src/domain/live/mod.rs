//! Realtime voice session lifecycle

mod session_state;

pub use session_state::{LiveLifecycle, LiveSessionState};
