//! cpal input helpers shared by the voice note recorder and the live microphone

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use rubato::{FftFixedIn, Resampler};
use thiserror::Error;
use tracing::warn;

use crate::application::ports::{DeviceError, RecordingError};
use crate::domain::audio::CAPTURE_SAMPLE_RATE;

/// Frames per resampler chunk
const RESAMPLE_CHUNK: usize = 1024;

#[derive(Debug, Error)]
pub(crate) enum CaptureError {
    #[error("no input device")]
    NoDevice,

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Stream(String),

    #[error("resampling failed: {0}")]
    Resample(String),
}

impl From<CaptureError> for RecordingError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NoDevice => Self::NoAudioDevice,
            CaptureError::Config(msg) | CaptureError::Stream(msg) => Self::StartFailed(msg),
            CaptureError::Resample(msg) => Self::EncodeFailed(msg),
        }
    }
}

impl From<CaptureError> for DeviceError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::NoDevice => Self::MicrophoneUnavailable("no input device".into()),
            CaptureError::Config(msg) => Self::MicrophoneUnavailable(msg),
            CaptureError::Stream(msg) | CaptureError::Resample(msg) => Self::StreamFailed(msg),
        }
    }
}

/// Get the default input device
pub(crate) fn input_device() -> Result<cpal::Device, CaptureError> {
    cpal::default_host()
        .default_input_device()
        .ok_or(CaptureError::NoDevice)
}

/// Pick an input configuration, preferring mono and the capture rate
pub(crate) fn input_config(
    device: &cpal::Device,
) -> Result<(StreamConfig, SampleFormat), CaptureError> {
    let supported_configs = device
        .supported_input_configs()
        .map_err(|e| CaptureError::Config(format!("Failed to get configs: {}", e)))?;

    let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

    for config in supported_configs {
        if config.sample_format() != SampleFormat::I16
            && config.sample_format() != SampleFormat::F32
        {
            continue;
        }

        let includes_target = config.min_sample_rate().0 <= CAPTURE_SAMPLE_RATE
            && config.max_sample_rate().0 >= CAPTURE_SAMPLE_RATE;

        let is_better = match &best_config {
            None => true,
            Some(current) => {
                let fewer_channels = config.channels() < current.channels();
                let better_rate =
                    includes_target && current.min_sample_rate().0 > CAPTURE_SAMPLE_RATE;
                fewer_channels || better_rate
            }
        };
        if is_better {
            best_config = Some(config);
        }
    }

    let config_range =
        best_config.ok_or_else(|| CaptureError::Config("No suitable config found".into()))?;

    let sample_rate = if config_range.min_sample_rate().0 <= CAPTURE_SAMPLE_RATE
        && config_range.max_sample_rate().0 >= CAPTURE_SAMPLE_RATE
    {
        SampleRate(CAPTURE_SAMPLE_RATE)
    } else {
        config_range.min_sample_rate()
    };

    let config = StreamConfig {
        channels: config_range.channels(),
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    Ok((config, config_range.sample_format()))
}

/// Average interleaved channels into mono
pub(crate) fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Build a mono f32 input stream. `on_samples` runs on the audio thread.
pub(crate) fn build_mono_stream<F>(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    mut on_samples: F,
) -> Result<cpal::Stream, CaptureError>
where
    F: FnMut(Vec<f32>) + Send + 'static,
{
    let channels = config.channels;
    let on_error = |err| warn!(error = %err, "audio input stream error");

    let stream = match format {
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                on_samples(downmix(&floats, channels));
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                on_samples(downmix(data, channels));
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::Config(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    };

    stream.map_err(|e| CaptureError::Stream(e.to_string()))
}

/// Incremental resampler from the device rate to the capture rate
pub(crate) struct StreamResampler {
    resampler: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32) -> Result<Self, CaptureError> {
        let resampler = if source_rate == CAPTURE_SAMPLE_RATE {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(
                    source_rate as usize,
                    CAPTURE_SAMPLE_RATE as usize,
                    RESAMPLE_CHUNK,
                    2,
                    1,
                )
                .map_err(|e| CaptureError::Resample(format!("init failed: {}", e)))?,
            )
        };
        Ok(Self {
            resampler,
            pending: Vec::new(),
        })
    }

    /// Feed samples; returns whatever full chunks produced
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<f32>, CaptureError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(samples.to_vec());
        };
        self.pending.extend_from_slice(samples);

        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            let resampled = resampler
                .process(&[chunk], None)
                .map_err(|e| CaptureError::Resample(e.to_string()))?;
            output.extend_from_slice(&resampled[0]);
        }
        Ok(output)
    }

    /// Pad and process the remainder
    pub fn flush(&mut self) -> Result<Vec<f32>, CaptureError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.resize(resampler.input_frames_next(), 0.0);
        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| CaptureError::Resample(e.to_string()))?;
        Ok(resampled[0].clone())
    }
}

/// Resample a whole recording, trimmed to the expected length
pub(crate) fn resample_all(samples: &[f32], source_rate: u32) -> Result<Vec<f32>, CaptureError> {
    if source_rate == CAPTURE_SAMPLE_RATE {
        return Ok(samples.to_vec());
    }
    let expected =
        (samples.len() as f64 * CAPTURE_SAMPLE_RATE as f64 / source_rate as f64).ceil() as usize;
    let mut resampler = StreamResampler::new(source_rate)?;
    let mut output = resampler.push(samples)?;
    output.extend(resampler.flush()?);
    output.truncate(expected);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_mono_is_identity() {
        let mono = vec![0.1, 0.2, 0.3];
        assert_eq!(downmix(&mono, 1), mono);
    }

    #[test]
    fn downmix_averages_stereo_frames() {
        let stereo = vec![0.2, 0.4, -0.5, 0.5];
        let mono = downmix(&stereo, 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
    }

    #[test]
    fn same_rate_passes_through() {
        let mut resampler = StreamResampler::new(CAPTURE_SAMPLE_RATE).unwrap();
        assert_eq!(resampler.push(&[0.5; 10]).unwrap().len(), 10);
        assert!(resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn resample_48k_to_16k_thirds_length() {
        let one_second = vec![0.0f32; 48_000];
        let output = resample_all(&one_second, 48_000).unwrap();
        assert_eq!(output.len(), 16_000);
    }

    #[test]
    fn capture_error_maps_to_port_errors() {
        assert!(matches!(
            RecordingError::from(CaptureError::NoDevice),
            RecordingError::NoAudioDevice
        ));
        assert!(matches!(
            DeviceError::from(CaptureError::NoDevice),
            DeviceError::MicrophoneUnavailable(_)
        ));
    }
}
