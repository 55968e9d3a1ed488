//! Realtime voice sessions

mod playback;
mod session;

pub use playback::{ActivityIndicator, PlaybackQueue, ACTIVITY_BARS, ACTIVITY_INTERVAL_MS};
pub use session::{CloseReport, LiveError, LiveInput, LiveSessionManager, LiveUpdate};
