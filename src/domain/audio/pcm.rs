//! Raw PCM frames exchanged with the live channel and the speakers

/// Sample rate the live channel expects for microphone audio
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of audio produced by the model (live and TTS)
pub const MODEL_OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Mono f32 samples at a known rate
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmAudio {
    /// Wrap mono samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode little-endian signed 16-bit PCM. A trailing odd byte is ignored.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Encode as little-endian signed 16-bit PCM
    pub fn to_pcm16_le(&self) -> Vec<u8> {
        encode_pcm16_le(&self.samples)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Clamp and quantize f32 samples to little-endian i16 bytes
pub fn encode_pcm16_le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_sample_count() {
        let pcm = PcmAudio::new(vec![0.0; 12_000], MODEL_OUTPUT_SAMPLE_RATE);
        assert!((pcm.duration_secs() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_reads_little_endian() {
        let bytes = [0x00, 0x40, 0x00, 0xC0];
        let pcm = PcmAudio::from_pcm16_le(&bytes, 16_000);
        assert_eq!(pcm.samples(), &[0.5, -0.5]);
    }

    #[test]
    fn decode_ignores_trailing_byte() {
        let pcm = PcmAudio::from_pcm16_le(&[0, 0, 7], 16_000);
        assert_eq!(pcm.samples().len(), 1);
    }

    #[test]
    fn encode_clamps_out_of_range() {
        let bytes = encode_pcm16_le(&[2.0, -2.0]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 32767);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -32767);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        assert_eq!(PcmAudio::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }
}
