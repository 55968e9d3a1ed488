//! Voice note recording port

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::audio::AudioData;
use crate::domain::time::Duration;

/// Recording errors
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Failed to start recording: {0}")]
    StartFailed(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("Failed to encode voice note: {0}")]
    EncodeFailed(String),

    #[error("Recording was cancelled")]
    Cancelled,

    #[error("No audio device available")]
    NoAudioDevice,
}

/// Progress callback type for reporting recording progress.
/// Parameters: (elapsed_ms, total_ms)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Port for recording a voice note of bounded length
#[async_trait]
pub trait AudioRecorder: Send + Sync {
    /// Record up to `max_duration`, or until `stop_early` is called.
    ///
    /// # Returns
    /// The encoded voice note, with its recorded length attached
    async fn record(
        &self,
        max_duration: Duration,
        on_progress: Option<ProgressCallback>,
    ) -> Result<AudioData, RecordingError>;

    /// Ask an in-flight recording to finish with what it has so far
    fn stop_early(&self);
}
