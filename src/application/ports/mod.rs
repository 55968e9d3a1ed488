//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod audio;
pub mod audio_cue;
pub mod config;
pub mod live;
pub mod model;
pub mod notifier;
pub mod recorder;
pub mod store;

// Re-export common types
pub use audio::{
    AudioOutput, CaptureHandle, DeviceError, Microphone, OutputDevice, SpeechPlayback, VoiceId,
};
pub use audio_cue::{AudioCue, AudioCueError, AudioCueType};
pub use config::ConfigStore;
pub use live::{LiveConnection, LiveEvent, LiveModel, LiveSender, LiveSetup};
pub use model::{ChatModel, ChatRequest, ModelError, SpeechSynthesizer};
pub use notifier::{NotificationError, NotificationIcon, Notifier, SilentNotifier};
pub use recorder::{AudioRecorder, ProgressCallback, RecordingError};
pub use store::{LedgerStore, StoreError};
