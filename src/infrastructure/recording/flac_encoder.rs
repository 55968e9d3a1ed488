//! FLAC encoding for voice notes
//!
//! Notes are sent to the chat model as lossless 16kHz mono 16-bit FLAC.

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use crate::domain::audio::{AudioData, AudioMimeType, CAPTURE_SAMPLE_RATE};

/// Sample rate of encoded notes
pub const TARGET_SAMPLE_RATE: u32 = CAPTURE_SAMPLE_RATE;

const BITS_PER_SAMPLE: usize = 16;
const CHANNELS: usize = 1;

/// Encode mono f32 samples at the capture rate into a voice note
pub fn encode_voice_note(samples: &[f32]) -> Result<AudioData, EncodingError> {
    if samples.is_empty() {
        return Err(EncodingError::Empty);
    }
    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();
    let flac = encode_to_flac(&pcm)?;

    let duration_ms = pcm.len() as u64 * 1000 / TARGET_SAMPLE_RATE as u64;
    Ok(AudioData::new(flac, AudioMimeType::Flac).with_duration_ms(duration_ms))
}

/// Encode mono i16 samples at 16kHz to FLAC bytes
pub fn encode_to_flac(pcm_samples: &[i16]) -> Result<Vec<u8>, EncodingError> {
    let samples_i32: Vec<i32> = pcm_samples.iter().map(|&s| s as i32).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        &samples_i32,
        CHANNELS,
        BITS_PER_SAMPLE,
        TARGET_SAMPLE_RATE as usize,
    );

    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}

/// FLAC encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("no samples to encode")]
    Empty,

    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_flac_magic() {
        let silence = vec![0i16; TARGET_SAMPLE_RATE as usize];
        let flac_data = encode_to_flac(&silence).unwrap();
        assert!(flac_data.len() > 50);
        assert_eq!(&flac_data[0..4], b"fLaC");
    }

    #[test]
    fn tone_compresses_below_raw_pcm() {
        let samples: Vec<i16> = (0..TARGET_SAMPLE_RATE as usize)
            .map(|i| {
                let t = i as f32 / TARGET_SAMPLE_RATE as f32;
                (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 16000.0) as i16
            })
            .collect();

        let flac_data = encode_to_flac(&samples).unwrap();
        assert!(flac_data.len() < samples.len() * 2);
    }

    #[test]
    fn voice_note_carries_length() {
        let note = encode_voice_note(&vec![0.25f32; 8_000]).unwrap();
        assert_eq!(note.mime_type(), AudioMimeType::Flac);
        assert_eq!(note.duration_ms(), 500);
    }

    #[test]
    fn empty_note_is_rejected() {
        assert!(matches!(encode_voice_note(&[]), Err(EncodingError::Empty)));
    }
}
