//! Audio device ports for live capture and playback

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::PcmAudio;

/// Audio device errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Permission denied or no input device. Not retried.
    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Audio stream failed: {0}")]
    StreamFailed(String),

    #[error("Audio device already closed")]
    Closed,
}

/// Handle of a scheduled playback voice
pub type VoiceId = u64;

/// Port for acquiring the microphone
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Open the input device and start capturing
    async fn acquire(&self) -> Result<Box<dyn CaptureHandle>, DeviceError>;
}

/// A running capture stream
#[async_trait]
pub trait CaptureHandle: Send {
    /// Next mono f32 frame at the capture rate. `None` once the stream ends.
    async fn next_frame(&mut self) -> Option<Vec<f32>>;

    /// Stop the input stream and release the device
    fn release(&mut self) -> Result<(), DeviceError>;

    /// Tear down the processing context (resampler, buffers)
    fn close(&mut self) -> Result<(), DeviceError>;
}

/// Port for sample-accurate scheduled playback.
/// Times are seconds on the output clock.
pub trait AudioOutput: Send {
    /// Current output clock
    fn now(&self) -> f64;

    /// Queue a frame to start at `start_at`
    fn schedule(&mut self, frame: &PcmAudio, start_at: f64) -> Result<VoiceId, DeviceError>;

    /// Stop a voice immediately. Stopping a finished voice is not an error.
    fn stop(&mut self, voice: VoiceId) -> Result<(), DeviceError>;

    /// Release the output device
    fn close(&mut self) -> Result<(), DeviceError>;
}

/// Port for opening a fresh output context per live session
pub trait OutputDevice: Send + Sync {
    fn open_output(&self) -> Result<Box<dyn AudioOutput>, DeviceError>;
}

/// Port for playing a whole utterance (spoken replies)
#[async_trait]
pub trait SpeechPlayback: Send + Sync {
    /// Play to completion
    async fn play(&self, audio: &PcmAudio) -> Result<(), DeviceError>;
}

/// Blanket implementation for boxed playback types
#[async_trait]
impl SpeechPlayback for Box<dyn SpeechPlayback> {
    async fn play(&self, audio: &PcmAudio) -> Result<(), DeviceError> {
        self.as_ref().play(audio).await
    }
}

/// Blanket implementation for boxed outputs
impl AudioOutput for Box<dyn AudioOutput> {
    fn now(&self) -> f64 {
        self.as_ref().now()
    }

    fn schedule(&mut self, frame: &PcmAudio, start_at: f64) -> Result<VoiceId, DeviceError> {
        self.as_mut().schedule(frame, start_at)
    }

    fn stop(&mut self, voice: VoiceId) -> Result<(), DeviceError> {
        self.as_mut().stop(voice)
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.as_mut().close()
    }
}

/// Blanket implementation for boxed output devices
impl OutputDevice for Box<dyn OutputDevice> {
    fn open_output(&self) -> Result<Box<dyn AudioOutput>, DeviceError> {
        self.as_ref().open_output()
    }
}

/// Blanket implementation for boxed microphones
#[async_trait]
impl Microphone for Box<dyn Microphone> {
    async fn acquire(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        self.as_ref().acquire().await
    }
}
