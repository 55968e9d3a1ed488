//! Audio device adapters for live sessions and spoken replies

pub(crate) mod capture;
mod cpal_microphone;
mod rodio_output;
mod rodio_speech;

pub use cpal_microphone::CpalMicrophone;
pub use rodio_output::{RodioOutput, RodioOutputDevice};
pub use rodio_speech::RodioSpeechPlayback;
