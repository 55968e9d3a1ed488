//! Gapless playback scheduling and the activity indicator

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::application::ports::{AudioOutput, DeviceError, VoiceId};
use crate::domain::audio::PcmAudio;

/// Schedules inbound model audio back to back on the output clock.
///
/// Each frame starts at `max(now, cursor)` and advances the cursor by its
/// duration. Scheduled voices stay in the live set until their end time
/// passes or they are stopped.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    cursor: f64,
    live: HashMap<VoiceId, f64>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output time at which the next frame will start, unless the clock is ahead
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Voices scheduled and not yet finished
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Schedule a frame right after everything already queued
    pub fn enqueue<O>(&mut self, output: &mut O, frame: &PcmAudio) -> Result<VoiceId, DeviceError>
    where
        O: AudioOutput + ?Sized,
    {
        let now = output.now();
        self.live.retain(|_, end| *end > now);

        let start = now.max(self.cursor);
        let voice = output.schedule(frame, start)?;
        self.cursor = start + frame.duration_secs();
        self.live.insert(voice, self.cursor);
        Ok(voice)
    }

    /// Barge-in: stop every live voice and restart the cursor at now.
    /// Returns the number of voices stopped.
    pub fn interrupt<O>(&mut self, output: &mut O) -> usize
    where
        O: AudioOutput + ?Sized,
    {
        let mut stopped = 0;
        for (voice, _) in self.live.drain() {
            match output.stop(voice) {
                Ok(()) => stopped += 1,
                Err(e) => warn!(voice, error = %e, "failed to stop voice"),
            }
        }
        self.cursor = output.now();
        stopped
    }

    /// Stop everything for teardown. Reports the first failure.
    pub fn stop_all<O>(&mut self, output: &mut O) -> Result<(), DeviceError>
    where
        O: AudioOutput + ?Sized,
    {
        let mut first_error = None;
        for (voice, _) in self.live.drain() {
            if let Err(e) = output.stop(voice) {
                first_error.get_or_insert(e);
            }
        }
        self.cursor = 0.0;
        first_error.map_or(Ok(()), Err)
    }
}

/// Number of bars in the activity display
pub const ACTIVITY_BARS: usize = 12;

/// Interval between activity samples
pub const ACTIVITY_INTERVAL_MS: u64 = 100;

/// Pseudo-random bar heights shown while the session is listening.
/// Decorative only, not derived from the signal.
pub struct ActivityIndicator {
    rng: StdRng,
}

impl ActivityIndicator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One sample of bar magnitudes in `0.1..1.0`
    pub fn sample(&mut self) -> Vec<f32> {
        (0..ACTIVITY_BARS)
            .map(|_| self.rng.gen_range(0.1..1.0))
            .collect()
    }
}

impl Default for ActivityIndicator {
    fn default() -> Self {
        Self::new()
    }
}
