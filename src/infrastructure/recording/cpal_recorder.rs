//! Voice note recorder using cpal
//!
//! Captures mono audio at the device rate, resamples to 16kHz and
//! encodes to FLAC when the note ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use async_trait::async_trait;
use cpal::traits::StreamTrait;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, info};

use super::flac_encoder::encode_voice_note;
use crate::application::ports::{AudioRecorder, ProgressCallback, RecordingError};
use crate::domain::audio::AudioData;
use crate::domain::time::Duration;
use crate::infrastructure::audio::capture;

/// Poll step while waiting for the note to end
const WAIT_STEP_MS: u64 = 50;

/// Bounded voice note recorder
///
/// The cpal stream lives on a blocking thread for the length of one note,
/// since `cpal::Stream` is not `Send`.
pub struct CpalRecorder {
    /// Captured mono samples at the device rate
    audio_buffer: Arc<StdMutex<Vec<f32>>>,
    is_recording: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self {
            audio_buffer: Arc::new(StdMutex::new(Vec::new())),
            is_recording: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    fn take_samples(&self) -> Result<Vec<f32>, RecordingError> {
        let mut buffer = self
            .audio_buffer
            .lock()
            .map_err(|_| RecordingError::RecordingFailed("audio buffer poisoned".into()))?;
        Ok(std::mem::take(&mut *buffer))
    }

    /// Resample to 16kHz and encode as FLAC
    fn encode_audio(samples: &[f32], sample_rate: u32) -> Result<AudioData, RecordingError> {
        let resampled = capture::resample_all(samples, sample_rate)?;
        encode_voice_note(&resampled).map_err(|e| RecordingError::EncodeFailed(e.to_string()))
    }
}

impl Default for CpalRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioRecorder for CpalRecorder {
    async fn record(
        &self,
        max_duration: Duration,
        on_progress: Option<ProgressCallback>,
    ) -> Result<AudioData, RecordingError> {
        if self.is_recording.swap(true, Ordering::SeqCst) {
            return Err(RecordingError::StartFailed(
                "Recording already in progress".to_string(),
            ));
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        self.take_samples()?;

        let duration_ms = max_duration.as_millis();
        let audio_buffer = Arc::clone(&self.audio_buffer);
        let is_recording = Arc::clone(&self.is_recording);
        let stop_requested = Arc::clone(&self.stop_requested);

        let record_handle = tokio::task::spawn_blocking(move || {
            let result = (|| -> Result<u32, RecordingError> {
                let device = capture::input_device()?;
                let (config, sample_format) = capture::input_config(&device)?;
                let sample_rate = config.sample_rate.0;

                let sink = Arc::clone(&audio_buffer);
                let stream = capture::build_mono_stream(
                    &device,
                    &config,
                    sample_format,
                    move |mono| {
                        if let Ok(mut buffer) = sink.lock() {
                            buffer.extend_from_slice(&mono);
                        }
                    },
                )?;

                stream
                    .play()
                    .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
                info!(sample_rate, channels = config.channels, "voice note recording");

                let started = Instant::now();
                while (started.elapsed().as_millis() as u64) < duration_ms
                    && !stop_requested.load(Ordering::SeqCst)
                {
                    std::thread::sleep(std::time::Duration::from_millis(WAIT_STEP_MS));
                }
                drop(stream);
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "voice note stopped");

                Ok(sample_rate)
            })();
            is_recording.store(false, Ordering::SeqCst);
            result
        });

        if let Some(progress) = on_progress {
            let start = Instant::now();
            let is_recording = Arc::clone(&self.is_recording);

            tokio::spawn(async move {
                let mut ticker = interval(TokioDuration::from_millis(100));
                while is_recording.load(Ordering::SeqCst) {
                    ticker.tick().await;
                    let elapsed = start.elapsed().as_millis() as u64;
                    if elapsed >= duration_ms {
                        progress(duration_ms, duration_ms);
                        break;
                    }
                    progress(elapsed, duration_ms);
                }
            });
        }

        let sample_rate = record_handle
            .await
            .map_err(|e| RecordingError::RecordingFailed(format!("Task join error: {}", e)))??;

        let samples = self.take_samples()?;
        if samples.is_empty() {
            return Err(RecordingError::RecordingFailed(
                "No audio data captured".to_string(),
            ));
        }
        debug!(samples = samples.len(), sample_rate, "encoding voice note");

        tokio::task::spawn_blocking(move || Self::encode_audio(&samples, sample_rate))
            .await
            .map_err(|e| RecordingError::RecordingFailed(format!("Encode task error: {}", e)))?
    }

    fn stop_early(&self) {
        if self.is_recording() {
            self.stop_requested.store(true, Ordering::SeqCst);
        }
    }
}
