//! Voice note recording
//!
//! Notes are captured with cpal and encoded to FLAC for lossless,
//! Gemini-compatible input.

mod cpal_recorder;
mod flac_encoder;

pub use cpal_recorder::CpalRecorder;
pub use flac_encoder::{encode_to_flac, encode_voice_note, EncodingError, TARGET_SAMPLE_RATE};
