//! Live microphone capture using cpal
//!
//! A dedicated thread owns the input stream. Device callbacks push mono
//! chunks over a channel; the handle resamples them to the capture rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::StreamTrait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::capture::{self, CaptureError, StreamResampler};
use crate::application::ports::{CaptureHandle, DeviceError, Microphone};

/// How often the capture thread checks for release
const RELEASE_POLL: Duration = Duration::from_millis(20);

/// Default input device as a live microphone
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn acquire(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<u32, DeviceError>>();
        let running = Arc::new(AtomicBool::new(true));
        let keep_running = Arc::clone(&running);

        std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let opened = (|| -> Result<(cpal::Stream, u32), CaptureError> {
                    let device = capture::input_device()?;
                    let (config, format) = capture::input_config(&device)?;
                    let stream = capture::build_mono_stream(&device, &config, format, move |mono| {
                        let _ = frames_tx.send(mono);
                    })?;
                    // Permission denials usually surface when the stream starts
                    stream
                        .play()
                        .map_err(|e| CaptureError::Config(e.to_string()))?;
                    Ok((stream, config.sample_rate.0))
                })();

                match opened {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        while keep_running.load(Ordering::SeqCst) {
                            std::thread::sleep(RELEASE_POLL);
                        }
                        drop(stream);
                        debug!("microphone stream dropped");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                    }
                }
            })
            .map_err(|e| DeviceError::MicrophoneUnavailable(e.to_string()))?;

        let device_rate = ready_rx.await.map_err(|_| {
            DeviceError::MicrophoneUnavailable("capture thread exited".into())
        })??;
        info!(device_rate, "microphone acquired");

        let resampler = match StreamResampler::new(device_rate) {
            Ok(r) => r,
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        Ok(Box::new(CpalCapture {
            frames: frames_rx,
            running,
            resampler: Some(resampler),
        }))
    }
}

/// A running capture. Dropping it releases the device.
struct CpalCapture {
    frames: mpsc::UnboundedReceiver<Vec<f32>>,
    running: Arc<AtomicBool>,
    /// `None` once the processing context is closed
    resampler: Option<StreamResampler>,
}

#[async_trait]
impl CaptureHandle for CpalCapture {
    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        loop {
            let chunk = self.frames.recv().await?;
            let resampler = self.resampler.as_mut()?;
            match resampler.push(&chunk) {
                Ok(frame) if frame.is_empty() => continue,
                Ok(frame) => return Some(frame),
                Err(e) => {
                    warn!(error = %e, "dropping microphone stream");
                    return None;
                }
            }
        }
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.resampler
            .take()
            .map(|_| ())
            .ok_or(DeviceError::Closed)
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::CAPTURE_SAMPLE_RATE;

    fn capture_with(rate: u32) -> (mpsc::UnboundedSender<Vec<f32>>, CpalCapture) {
        let (tx, rx) = mpsc::unbounded_channel();
        let capture = CpalCapture {
            frames: rx,
            running: Arc::new(AtomicBool::new(true)),
            resampler: Some(StreamResampler::new(rate).unwrap()),
        };
        (tx, capture)
    }

    #[tokio::test]
    async fn frames_pass_through_at_capture_rate() {
        let (tx, mut capture) = capture_with(CAPTURE_SAMPLE_RATE);
        tx.send(vec![0.1; 320]).unwrap();
        assert_eq!(capture.next_frame().await.unwrap().len(), 320);
    }

    #[tokio::test]
    async fn short_chunks_accumulate_before_resampling() {
        let (tx, mut capture) = capture_with(48_000);
        for _ in 0..4 {
            tx.send(vec![0.0; 480]).unwrap();
        }
        drop(tx);
        let frame = capture.next_frame().await.unwrap();
        assert!(!frame.is_empty());
    }

    #[tokio::test]
    async fn stream_end_yields_none() {
        let (tx, mut capture) = capture_with(CAPTURE_SAMPLE_RATE);
        drop(tx);
        assert!(capture.next_frame().await.is_none());
    }

    #[test]
    fn release_stops_thread_and_close_is_single_shot() {
        let (_tx, mut capture) = capture_with(CAPTURE_SAMPLE_RATE);
        capture.release().unwrap();
        assert!(!capture.running.load(Ordering::SeqCst));

        capture.close().unwrap();
        assert_eq!(capture.close(), Err(DeviceError::Closed));
    }

    #[tokio::test]
    async fn closed_capture_stops_yielding() {
        let (tx, mut capture) = capture_with(CAPTURE_SAMPLE_RATE);
        capture.close().unwrap();
        tx.send(vec![0.0; 160]).unwrap();
        assert!(capture.next_frame().await.is_none());
    }

    #[tokio::test]
    #[ignore = "requires microphone"]
    async fn acquires_default_input() {
        let mut handle = CpalMicrophone::new().acquire().await.unwrap();
        assert!(handle.next_frame().await.is_some());
        handle.release().unwrap();
        handle.close().unwrap();
    }
}
