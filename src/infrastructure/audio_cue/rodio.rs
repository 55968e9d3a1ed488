//! Rodio-based audio cue adapter
//!
//! Synthesizes short tones: a rising chime for due appointments and
//! single beeps around voice note recording.

use std::time::Duration;

use async_trait::async_trait;
use rodio::source::{SineWave, Source, Zero};
use rodio::{OutputStream, Sink};

use crate::application::ports::{AudioCue, AudioCueError, AudioCueType};

/// Chime tones for appointment alerts, in Hz
const ALERT_TONES: [f32; 3] = [660.0, 880.0, 1100.0];

/// Audio cue implementation using rodio
pub struct RodioAudioCue;

impl RodioAudioCue {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RodioAudioCue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioCue for RodioAudioCue {
    async fn play(&self, cue_type: AudioCueType) -> Result<(), AudioCueError> {
        // OutputStream is not Send; keep it on a blocking thread
        tokio::task::spawn_blocking(move || play_cue_sync(cue_type))
            .await
            .map_err(|e| AudioCueError::PlaybackFailed(format!("Task join error: {}", e)))?
    }
}

/// A tone with a short fade in
fn gentle_tone(freq: f32, duration_ms: u64, amplitude: f32) -> impl Source<Item = f32> + Send {
    let fade_ms = (duration_ms / 5).min(30);
    SineWave::new(freq)
        .take_duration(Duration::from_millis(duration_ms))
        .fade_in(Duration::from_millis(fade_ms))
        .amplify(amplitude)
}

fn gap(ms: u64) -> impl Source<Item = f32> + Send {
    Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(ms))
}

fn play_cue_sync(cue_type: AudioCueType) -> Result<(), AudioCueError> {
    let (_stream, stream_handle) = OutputStream::try_default()
        .map_err(|e| AudioCueError::DeviceNotAvailable(e.to_string()))?;

    let sink =
        Sink::try_new(&stream_handle).map_err(|e| AudioCueError::PlaybackFailed(e.to_string()))?;

    const AMP: f32 = 0.3;

    match cue_type {
        AudioCueType::AppointmentAlert => {
            for (i, freq) in ALERT_TONES.iter().enumerate() {
                if i > 0 {
                    sink.append(gap(60));
                }
                sink.append(gentle_tone(*freq, 180, AMP));
            }
        }
        AudioCueType::RecordingStart => sink.append(gentle_tone(880.0, 150, AMP)),
        AudioCueType::RecordingStop => sink.append(gentle_tone(440.0, 150, AMP)),
    }

    sink.sleep_until_end();

    Ok(())
}
