//! Scheduled playback of model audio through rodio
//!
//! `rodio::OutputStream` is not `Send`, so a worker thread owns it and
//! one `Sink` per voice. Voices are delayed sources that start at their
//! scheduled time on the output clock.

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink, Source};
use tracing::{debug, warn};

use crate::application::ports::{AudioOutput, DeviceError, OutputDevice, VoiceId};
use crate::domain::audio::PcmAudio;

enum Command {
    Schedule {
        voice: VoiceId,
        samples: Vec<f32>,
        sample_rate: u32,
        start: Instant,
    },
    Stop(VoiceId),
    Close,
}

/// Default output device, opened fresh for each live session
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioOutputDevice;

impl RodioOutputDevice {
    pub fn new() -> Self {
        Self
    }
}

impl OutputDevice for RodioOutputDevice {
    fn open_output(&self) -> Result<Box<dyn AudioOutput>, DeviceError> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("live-playback".into())
            .spawn(move || run_output(receiver, ready_tx))
            .map_err(|e| DeviceError::OutputUnavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| DeviceError::OutputUnavailable("playback thread exited".into()))??;

        Ok(Box::new(RodioOutput::new(commands, Some(worker))))
    }
}

fn run_output(commands: mpsc::Receiver<Command>, ready: mpsc::Sender<Result<(), DeviceError>>) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(DeviceError::OutputUnavailable(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut voices: HashMap<VoiceId, Sink> = HashMap::new();
    while let Ok(command) = commands.recv() {
        voices.retain(|_, sink| !sink.empty());
        match command {
            Command::Schedule {
                voice,
                samples,
                sample_rate,
                start,
            } => match Sink::try_new(&handle) {
                Ok(sink) => {
                    let delay = start.saturating_duration_since(Instant::now());
                    sink.append(SamplesBuffer::new(1, sample_rate, samples).delay(delay));
                    voices.insert(voice, sink);
                }
                Err(e) => warn!(voice, error = %e, "could not create playback sink"),
            },
            Command::Stop(voice) => {
                if let Some(sink) = voices.remove(&voice) {
                    sink.stop();
                }
            }
            Command::Close => break,
        }
    }

    for sink in voices.into_values() {
        sink.stop();
    }
    drop(stream);
    debug!("playback thread finished");
}

/// Handle to an open output context
pub struct RodioOutput {
    commands: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
    opened_at: Instant,
    next_voice: VoiceId,
    closed: bool,
}

impl RodioOutput {
    fn new(commands: mpsc::Sender<Command>, worker: Option<JoinHandle<()>>) -> Self {
        Self {
            commands,
            worker,
            opened_at: Instant::now(),
            next_voice: 0,
            closed: false,
        }
    }

    fn send(&self, command: Command) -> Result<(), DeviceError> {
        self.commands
            .send(command)
            .map_err(|_| DeviceError::StreamFailed("playback thread is gone".into()))
    }
}

impl AudioOutput for RodioOutput {
    fn now(&self) -> f64 {
        self.opened_at.elapsed().as_secs_f64()
    }

    fn schedule(&mut self, frame: &PcmAudio, start_at: f64) -> Result<VoiceId, DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        self.next_voice += 1;
        let voice = self.next_voice;
        let start = self.opened_at + Duration::from_secs_f64(start_at.max(0.0));

        self.send(Command::Schedule {
            voice,
            samples: frame.samples().to_vec(),
            sample_rate: frame.sample_rate(),
            start,
        })?;
        Ok(voice)
    }

    fn stop(&mut self, voice: VoiceId) -> Result<(), DeviceError> {
        if self.closed {
            return Ok(());
        }
        self.send(Command::Stop(voice))
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Err(DeviceError::Closed);
        }
        self.closed = true;
        let sent = self.send(Command::Close);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| DeviceError::StreamFailed("playback thread panicked".into()))?;
        }
        sent
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.commands.send(Command::Close);
        }
    }
}
