//! Whole-utterance playback for spoken replies

use async_trait::async_trait;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use crate::application::ports::{DeviceError, SpeechPlayback};
use crate::domain::audio::PcmAudio;

/// Plays synthesized replies on the default output device
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioSpeechPlayback;

impl RodioSpeechPlayback {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechPlayback for RodioSpeechPlayback {
    async fn play(&self, audio: &PcmAudio) -> Result<(), DeviceError> {
        if audio.is_empty() {
            return Ok(());
        }
        let samples = audio.samples().to_vec();
        let sample_rate = audio.sample_rate();

        tokio::task::spawn_blocking(move || {
            let (_stream, handle) = OutputStream::try_default()
                .map_err(|e| DeviceError::OutputUnavailable(e.to_string()))?;
            let sink =
                Sink::try_new(&handle).map_err(|e| DeviceError::StreamFailed(e.to_string()))?;
            sink.append(SamplesBuffer::new(1, sample_rate, samples));
            sink.sleep_until_end();
            Ok(())
        })
        .await
        .map_err(|e| DeviceError::StreamFailed(format!("playback task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_audio_is_a_no_op() {
        let playback = RodioSpeechPlayback::new();
        playback.play(&PcmAudio::new(Vec::new(), 24_000)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires audio output"]
    async fn plays_short_tone() {
        let tone: Vec<f32> = (0..4_800)
            .map(|i| (i as f32 * 660.0 * std::f32::consts::TAU / 24_000.0).sin() * 0.2)
            .collect();
        RodioSpeechPlayback::new()
            .play(&PcmAudio::new(tone, 24_000))
            .await
            .unwrap();
    }
}
