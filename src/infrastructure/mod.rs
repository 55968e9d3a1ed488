//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with Gemini, audio devices, desktop notifications and disk.

pub mod audio;
pub mod audio_cue;
pub mod config;
pub mod model;
pub mod notification;
pub mod recording;
pub mod storage;

// Re-export adapters
pub use audio::{CpalMicrophone, RodioOutputDevice, RodioSpeechPlayback};
pub use audio_cue::{create_audio_cue, NoOpAudioCue, RodioAudioCue};
pub use config::XdgConfigStore;
pub use model::{GeminiChatModel, GeminiLiveModel, GeminiSpeechSynthesizer};
pub use notification::{create_notifier, NotifyRustNotifier};
pub use recording::CpalRecorder;
pub use storage::{InMemoryLedgerStore, JsonFileLedgerStore};
