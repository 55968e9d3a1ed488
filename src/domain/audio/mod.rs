//! Audio value objects

mod audio_data;
mod pcm;

pub use audio_data::{AudioData, AudioMimeType};
pub use pcm::{encode_pcm16_le, PcmAudio, CAPTURE_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE};
