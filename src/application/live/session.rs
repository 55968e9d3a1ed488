//! Realtime voice session use case

use std::fmt;
use std::time::Duration as StdDuration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::ports::{
    AudioOutput, CaptureHandle, DeviceError, LedgerStore, LiveEvent, LiveModel, LiveSender,
    LiveSetup, Microphone, ModelError, OutputDevice,
};
use crate::application::tool_bridge::ToolExecutionBridge;
use crate::domain::audio::encode_pcm16_le;
use crate::domain::conversation::{
    tool_declarations, RecordCard, SystemPrompt, ToolCall, ToolOutput,
};
use crate::domain::error::InvalidStateTransition;
use crate::domain::ledger::User;
use crate::domain::live::{LiveLifecycle, LiveSessionState};

use super::playback::{ActivityIndicator, PlaybackQueue, ACTIVITY_INTERVAL_MS};

/// Live session errors
#[derive(Debug, Error)]
pub enum LiveError {
    /// Permission denied or no device. The user has to fix it and reopen.
    #[error("{0}")]
    Device(#[from] DeviceError),

    #[error("Live connection failed: {0}")]
    Connection(#[from] ModelError),

    #[error(transparent)]
    State(#[from] InvalidStateTransition),
}

/// What the UI is told about the session
#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    State(LiveSessionState),
    Record(RecordCard),
    ManualEntryRequested { hint: Option<String> },
    BudgetChanged(User),
    Transcript(String),
    TurnComplete,
    Activity(Vec<f32>),
    Error(String),
}

/// One unit of work for the session loop
#[derive(Debug)]
pub enum LiveInput {
    Frame(Option<Vec<f32>>),
    Event(Option<LiveEvent>),
    Tick,
}

/// Teardown steps that failed. Closing always runs every step.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloseReport {
    failures: Vec<(&'static str, String)>,
}

impl CloseReport {
    fn record<E: fmt::Display>(&mut self, step: &'static str, result: Result<(), E>) {
        if let Err(e) = result {
            warn!(step, error = %e, "live teardown step failed");
            self.failures.push((step, e.to_string()));
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_steps(&self) -> Vec<&'static str> {
        self.failures.iter().map(|(step, _)| *step).collect()
    }
}

/// Resources held while a session is open
struct ActiveSession {
    user: User,
    capture: Box<dyn CaptureHandle>,
    output: Box<dyn AudioOutput>,
    sender: Box<dyn LiveSender>,
    events: mpsc::Receiver<LiveEvent>,
    playback: PlaybackQueue,
    ticker: Interval,
}

impl ActiveSession {
    /// Synchronous teardown steps, shared by `close` and `Drop`
    fn release_devices(&mut self, report: &mut CloseReport) {
        report.record("release microphone", self.capture.release());
        report.record("stop playback", self.playback.stop_all(self.output.as_mut()));
        report.record("close capture", self.capture.close());
        report.record("close output", self.output.close());
    }
}

/// Undo a partial `open`. The caller reports the open error itself, so
/// teardown failures are only logged.
fn release_after_failed_open(
    capture: &mut dyn CaptureHandle,
    output: Option<&mut Box<dyn AudioOutput>>,
) -> CloseReport {
    let mut report = CloseReport::default();
    report.record("release microphone", capture.release());
    report.record("close capture", capture.close());
    if let Some(output) = output {
        report.record("close output", output.close());
    }
    report
}

/// Continuous bidirectional voice session
pub struct LiveSessionManager<L, S>
where
    L: LiveModel,
    S: LedgerStore,
{
    model: L,
    bridge: ToolExecutionBridge<S>,
    microphone: Box<dyn Microphone>,
    speakers: Box<dyn OutputDevice>,
    voice: Option<String>,
    lifecycle: LiveLifecycle,
    session: Option<ActiveSession>,
    closing: bool,
    indicator: ActivityIndicator,
    updates: mpsc::UnboundedSender<LiveUpdate>,
}

impl<L, S> LiveSessionManager<L, S>
where
    L: LiveModel,
    S: LedgerStore,
{
    /// Create a manager. UI updates arrive on the returned receiver.
    pub fn new(
        model: L,
        store: S,
        microphone: Box<dyn Microphone>,
        speakers: Box<dyn OutputDevice>,
    ) -> (Self, mpsc::UnboundedReceiver<LiveUpdate>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let manager = Self {
            model,
            bridge: ToolExecutionBridge::new(store),
            microphone,
            speakers,
            voice: None,
            lifecycle: LiveLifecycle::new(),
            session: None,
            closing: false,
            indicator: ActivityIndicator::new(),
            updates,
        };
        (manager, rx)
    }

    /// Prebuilt voice for model speech
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_indicator(mut self, indicator: ActivityIndicator) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn state(&self) -> LiveSessionState {
        self.lifecycle.state()
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.is_open()
    }

    pub fn store(&self) -> &S {
        self.bridge.store()
    }

    /// Open a session for `user`, closing any previous one first
    pub async fn open(&mut self, user: &User) -> Result<(), LiveError> {
        if self.session.is_some() {
            self.close().await;
        }
        self.lifecycle.begin_connect()?;
        self.publish_state();

        let mut capture = match self.microphone.acquire().await {
            Ok(capture) => capture,
            Err(e) => {
                warn!(error = %e, "microphone unavailable");
                self.abort_connect();
                return Err(e.into());
            }
        };

        let mut output = match self.speakers.open_output() {
            Ok(output) => output,
            Err(e) => {
                release_after_failed_open(capture.as_mut(), None);
                self.abort_connect();
                return Err(e.into());
            }
        };

        let setup = LiveSetup {
            system_instruction: SystemPrompt::live(user, Utc::now()).into_content(),
            tools: tool_declarations(),
            voice: self.voice.clone(),
        };
        let connection = match self.model.connect(&setup).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(error = %e, "live connection failed");
                release_after_failed_open(capture.as_mut(), Some(&mut output));
                self.abort_connect();
                return Err(e.into());
            }
        };

        let period = StdDuration::from_millis(ACTIVITY_INTERVAL_MS);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.session = Some(ActiveSession {
            user: user.clone(),
            capture,
            output,
            sender: connection.sender,
            events: connection.events,
            playback: PlaybackQueue::new(),
            ticker,
        });
        self.closing = false;
        self.lifecycle.connected()?;
        info!(user = %user.id, "live session open");
        self.publish_state();
        Ok(())
    }

    /// Mute or unmute the microphone. Muted frames are dropped before encoding.
    pub fn set_muted(&mut self, muted: bool) -> Result<(), LiveError> {
        self.lifecycle.set_muted(muted)?;
        self.publish_state();
        Ok(())
    }

    pub fn toggle_mute(&mut self) -> Result<(), LiveError> {
        let muted = self.state() == LiveSessionState::Muted;
        self.set_muted(!muted)
    }

    /// Current indicator magnitudes; nothing when muted or not open
    pub fn activity(&mut self) -> Option<Vec<f32>> {
        if self.state() != LiveSessionState::Listening {
            return None;
        }
        Some(self.indicator.sample())
    }

    /// Wait for the next capture frame, service event or indicator tick.
    /// Cancel safe. `None` when no session is open.
    pub async fn next_input(&mut self) -> Option<LiveInput> {
        if self.closing {
            return None;
        }
        let session = self.session.as_mut()?;
        let input = tokio::select! {
            biased;
            event = session.events.recv() => LiveInput::Event(event),
            frame = session.capture.next_frame() => LiveInput::Frame(frame),
            _ = session.ticker.tick() => LiveInput::Tick,
        };
        Some(input)
    }

    /// Process one input. Returns `false` once the session has ended.
    pub async fn handle(&mut self, input: LiveInput) -> Result<bool, LiveError> {
        if self.closing || self.session.is_none() {
            return Ok(false);
        }
        match input {
            LiveInput::Frame(Some(frame)) => self.stream_frame(&frame).await,
            LiveInput::Frame(None) => {
                self.end_session("microphone stream ended").await;
                Ok(false)
            }
            LiveInput::Event(Some(event)) => self.handle_event(event).await,
            LiveInput::Event(None) => {
                self.end_session("connection dropped").await;
                Ok(false)
            }
            LiveInput::Tick => {
                if let Some(levels) = self.activity() {
                    self.publish(LiveUpdate::Activity(levels));
                }
                Ok(true)
            }
        }
    }

    /// Wait for and process one input
    pub async fn step(&mut self) -> Result<bool, LiveError> {
        match self.next_input().await {
            Some(input) => self.handle(input).await,
            None => Ok(false),
        }
    }

    /// Run until the session ends
    pub async fn run(&mut self) -> Result<(), LiveError> {
        while self.step().await? {}
        Ok(())
    }

    /// Close the session. Every teardown step runs even if an earlier one fails.
    pub async fn close(&mut self) -> CloseReport {
        let mut report = CloseReport::default();
        let Some(mut session) = self.session.take() else {
            return report;
        };
        self.closing = true;
        let _ = self.lifecycle.begin_close();
        self.publish_state();

        session.release_devices(&mut report);
        report.record("close channel", session.sender.close().await);
        drop(session);

        let _ = self.lifecycle.finish_close();
        self.closing = false;
        info!(clean = report.is_clean(), "live session closed");
        self.publish_state();
        report
    }

    async fn stream_frame(&mut self, frame: &[f32]) -> Result<bool, LiveError> {
        if self.state() != LiveSessionState::Listening {
            return Ok(true);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        let pcm = encode_pcm16_le(frame);
        let sent = session.sender.send_audio(&pcm).await;
        if let Err(e) = sent {
            self.fail_session(&e).await;
            return Ok(false);
        }
        Ok(true)
    }

    async fn handle_event(&mut self, event: LiveEvent) -> Result<bool, LiveError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        match event {
            LiveEvent::Audio(frame) => {
                if let Err(e) = session.playback.enqueue(session.output.as_mut(), &frame) {
                    warn!(error = %e, "failed to schedule model audio");
                }
            }
            LiveEvent::Interrupted => {
                let stopped = session.playback.interrupt(session.output.as_mut());
                debug!(stopped, "playback interrupted");
            }
            LiveEvent::ToolCalls(calls) => return self.answer_calls(calls).await,
            LiveEvent::ToolCallCancellation(ids) => {
                info!(?ids, "service cancelled tool calls; nothing undone");
            }
            LiveEvent::TurnComplete => self.publish(LiveUpdate::TurnComplete),
            LiveEvent::Transcript(text) => self.publish(LiveUpdate::Transcript(text)),
            LiveEvent::Closed(reason) => {
                let reason = reason.unwrap_or_else(|| "closed by service".to_string());
                self.end_session(&reason).await;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run every call through the bridge and answer them in one message
    async fn answer_calls(&mut self, calls: Vec<ToolCall>) -> Result<bool, LiveError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(false);
        };
        let mut results = Vec::with_capacity(calls.len());
        let mut updates = Vec::new();
        for call in &calls {
            let (outcome, result) = self.bridge.resolve(call, &session.user).await;
            if let Ok(output) = &outcome {
                match output {
                    ToolOutput::ManualEntryRequested { hint } => {
                        updates.push(LiveUpdate::ManualEntryRequested { hint: hint.clone() })
                    }
                    ToolOutput::BudgetSet(user) => {
                        session.user = user.clone();
                        updates.push(LiveUpdate::BudgetChanged(user.clone()));
                    }
                    _ => {}
                }
                if let Some(card) = output.card() {
                    updates.push(LiveUpdate::Record(card));
                }
            }
            results.push(result);
        }

        let sent = session.sender.send_tool_results(&results).await;
        for update in updates {
            self.publish(update);
        }
        if let Err(e) = sent {
            self.fail_session(&e).await;
            return Ok(false);
        }
        Ok(true)
    }

    async fn fail_session(&mut self, err: &ModelError) {
        warn!(error = %err, "live channel failed");
        self.publish(LiveUpdate::Error(err.to_string()));
        self.close().await;
    }

    async fn end_session(&mut self, reason: &str) {
        info!(reason, "live session ended");
        self.close().await;
    }

    fn abort_connect(&mut self) {
        let _ = self.lifecycle.connect_failed();
        self.publish_state();
    }

    fn publish_state(&self) {
        self.publish(LiveUpdate::State(self.lifecycle.state()));
    }

    fn publish(&self, update: LiveUpdate) {
        // The UI may already be gone
        let _ = self.updates.send(update);
    }
}

impl<L, S> Drop for LiveSessionManager<L, S>
where
    L: LiveModel,
    S: LedgerStore,
{
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.closing = true;
            let mut report = CloseReport::default();
            session.release_devices(&mut report);
            // Dropping the sender closes the remote channel
            drop(session);
            debug!(clean = report.is_clean(), "live session dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{LiveConnection, VoiceId};
    use crate::domain::audio::PcmAudio;
    use crate::domain::conversation::ToolResult;
    use crate::infrastructure::storage::InMemoryLedgerStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Devices {
        acquired: usize,
        released: usize,
        capture_closed: usize,
        output_closed: usize,
        now: f64,
        next_voice: VoiceId,
        scheduled: Vec<(VoiceId, f64)>,
        stopped: Vec<VoiceId>,
        fail_release: bool,
    }

    type Shared<T> = Arc<Mutex<T>>;

    struct MockMicrophone {
        devices: Shared<Devices>,
        frames: Mutex<Option<mpsc::Receiver<Vec<f32>>>>,
        unavailable: bool,
    }

    #[async_trait]
    impl Microphone for MockMicrophone {
        async fn acquire(&self) -> Result<Box<dyn CaptureHandle>, DeviceError> {
            if self.unavailable {
                return Err(DeviceError::MicrophoneUnavailable("permission denied".into()));
            }
            self.devices.lock().unwrap().acquired += 1;
            let frames = self.frames.lock().unwrap().take().unwrap();
            Ok(Box::new(MockCapture {
                devices: self.devices.clone(),
                frames,
            }))
        }
    }

    struct MockCapture {
        devices: Shared<Devices>,
        frames: mpsc::Receiver<Vec<f32>>,
    }

    #[async_trait]
    impl CaptureHandle for MockCapture {
        async fn next_frame(&mut self) -> Option<Vec<f32>> {
            self.frames.recv().await
        }

        fn release(&mut self) -> Result<(), DeviceError> {
            let mut devices = self.devices.lock().unwrap();
            devices.released += 1;
            if devices.fail_release {
                return Err(DeviceError::StreamFailed("already gone".into()));
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), DeviceError> {
            self.devices.lock().unwrap().capture_closed += 1;
            Ok(())
        }
    }

    struct MockSpeakers(Shared<Devices>);

    impl OutputDevice for MockSpeakers {
        fn open_output(&self) -> Result<Box<dyn AudioOutput>, DeviceError> {
            Ok(Box::new(MockOutput(self.0.clone())))
        }
    }

    struct MockOutput(Shared<Devices>);

    impl AudioOutput for MockOutput {
        fn now(&self) -> f64 {
            self.0.lock().unwrap().now
        }

        fn schedule(&mut self, _frame: &PcmAudio, start_at: f64) -> Result<VoiceId, DeviceError> {
            let mut devices = self.0.lock().unwrap();
            devices.next_voice += 1;
            let id = devices.next_voice;
            devices.scheduled.push((id, start_at));
            Ok(id)
        }

        fn stop(&mut self, voice: VoiceId) -> Result<(), DeviceError> {
            self.0.lock().unwrap().stopped.push(voice);
            Ok(())
        }

        fn close(&mut self) -> Result<(), DeviceError> {
            self.0.lock().unwrap().output_closed += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Wire {
        connects: usize,
        setup: Option<LiveSetup>,
        audio: Vec<Vec<u8>>,
        tool_responses: Vec<Vec<ToolResult>>,
        closed: bool,
    }

    struct MockLive {
        wire: Shared<Wire>,
        events: Mutex<Option<mpsc::Receiver<LiveEvent>>>,
        refuse: bool,
    }

    #[async_trait]
    impl LiveModel for MockLive {
        async fn connect(&self, setup: &LiveSetup) -> Result<LiveConnection, ModelError> {
            let mut wire = self.wire.lock().unwrap();
            wire.connects += 1;
            if self.refuse {
                return Err(ModelError::InvalidApiKey);
            }
            wire.setup = Some(setup.clone());
            Ok(LiveConnection {
                sender: Box::new(MockSender(self.wire.clone())),
                events: self.events.lock().unwrap().take().unwrap(),
            })
        }
    }

    struct MockSender(Shared<Wire>);

    #[async_trait]
    impl LiveSender for MockSender {
        async fn send_audio(&mut self, pcm16: &[u8]) -> Result<(), ModelError> {
            self.0.lock().unwrap().audio.push(pcm16.to_vec());
            Ok(())
        }

        async fn send_tool_results(&mut self, results: &[ToolResult]) -> Result<(), ModelError> {
            self.0.lock().unwrap().tool_responses.push(results.to_vec());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ModelError> {
            self.0.lock().unwrap().closed = true;
            Ok(())
        }
    }

    struct Harness {
        manager: LiveSessionManager<MockLive, InMemoryLedgerStore>,
        updates: mpsc::UnboundedReceiver<LiveUpdate>,
        devices: Shared<Devices>,
        wire: Shared<Wire>,
        mic: mpsc::Sender<Vec<f32>>,
        service: mpsc::Sender<LiveEvent>,
    }

    impl Harness {
        fn build(mic_unavailable: bool, refuse: bool) -> Self {
            let devices: Shared<Devices> = Arc::default();
            let wire: Shared<Wire> = Arc::default();
            let (mic, frames) = mpsc::channel(16);
            let (service, events) = mpsc::channel(16);
            let (manager, updates) = LiveSessionManager::new(
                MockLive {
                    wire: wire.clone(),
                    events: Mutex::new(Some(events)),
                    refuse,
                },
                InMemoryLedgerStore::new(),
                Box::new(MockMicrophone {
                    devices: devices.clone(),
                    frames: Mutex::new(Some(frames)),
                    unavailable: mic_unavailable,
                }),
                Box::new(MockSpeakers(devices.clone())),
            );
            Self {
                manager: manager.with_indicator(ActivityIndicator::seeded(1)),
                updates,
                devices,
                wire,
                mic,
                service,
            }
        }

        fn new() -> Self {
            Self::build(false, false)
        }

        fn drain_updates(&mut self) -> Vec<LiveUpdate> {
            let mut out = Vec::new();
            while let Ok(update) = self.updates.try_recv() {
                out.push(update);
            }
            out
        }
    }

    fn user() -> User {
        User::new("ana@example.com", "Ana")
    }

    fn model_audio(secs: f64) -> LiveEvent {
        let samples = (secs * 24_000.0) as usize;
        LiveEvent::Audio(PcmAudio::new(vec![0.0; samples], 24_000))
    }

    #[tokio::test]
    async fn open_sends_setup_with_tools_and_listens() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();

        assert_eq!(h.manager.state(), LiveSessionState::Listening);
        let wire = h.wire.lock().unwrap();
        let setup = wire.setup.as_ref().unwrap();
        assert_eq!(setup.tools.len(), 9);
        assert!(setup.system_instruction.contains("spoken yes"));
        drop(wire);

        let states: Vec<_> = h
            .drain_updates()
            .into_iter()
            .filter_map(|u| match u {
                LiveUpdate::State(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![LiveSessionState::Connecting, LiveSessionState::Listening]
        );
    }

    #[tokio::test]
    async fn frames_are_streamed_as_pcm16() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();

        h.mic.send(vec![0.5; 160]).await.unwrap();
        assert!(h.manager.step().await.unwrap());

        let wire = h.wire.lock().unwrap();
        assert_eq!(wire.audio.len(), 1);
        assert_eq!(wire.audio[0].len(), 320);
    }

    #[tokio::test]
    async fn muted_frames_are_dropped() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();
        h.manager.set_muted(true).unwrap();

        h.mic.send(vec![0.5; 160]).await.unwrap();
        assert!(h.manager.step().await.unwrap());

        assert!(h.wire.lock().unwrap().audio.is_empty());
        assert!(h.manager.activity().is_none());
    }

    #[tokio::test]
    async fn model_audio_is_scheduled_gaplessly() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();

        h.service.send(model_audio(0.5)).await.unwrap();
        h.service.send(model_audio(0.25)).await.unwrap();
        h.manager.step().await.unwrap();
        h.manager.step().await.unwrap();

        let starts: Vec<f64> = h.devices.lock().unwrap().scheduled.iter().map(|(_, s)| *s).collect();
        assert_eq!(starts, vec![0.0, 0.5]);
    }

    #[tokio::test]
    async fn interruption_stops_every_scheduled_frame() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();

        for _ in 0..3 {
            h.service.send(model_audio(0.5)).await.unwrap();
            h.manager.step().await.unwrap();
        }
        h.devices.lock().unwrap().now = 0.2;
        h.service.send(LiveEvent::Interrupted).await.unwrap();
        h.manager.step().await.unwrap();

        h.service.send(model_audio(0.5)).await.unwrap();
        h.manager.step().await.unwrap();

        let devices = h.devices.lock().unwrap();
        let mut stopped = devices.stopped.clone();
        stopped.sort_unstable();
        assert_eq!(stopped, vec![1, 2, 3]);
        assert_eq!(devices.scheduled.last().unwrap().1, 0.2);
    }

    #[tokio::test]
    async fn tool_calls_are_answered_in_one_message() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();
        h.drain_updates();

        h.service
            .send(LiveEvent::ToolCalls(vec![
                ToolCall::new(
                    "a",
                    "addAppointment",
                    json!({ "title": "Dentist", "date": "2026-10-20T09:00:00Z", "type": "meeting" }),
                ),
                ToolCall::new("b", "requestManualEntry", json!({})),
            ]))
            .await
            .unwrap();
        assert!(h.manager.step().await.unwrap());

        let responses = h.wire.lock().unwrap().tool_responses.clone();
        assert_eq!(responses.len(), 1);
        let ids: Vec<&str> = responses[0].iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let updates = h.drain_updates();
        assert!(updates
            .iter()
            .any(|u| matches!(u, LiveUpdate::Record(RecordCard::Appointment(a)) if a.title == "Dentist")));
        assert!(updates
            .iter()
            .any(|u| matches!(u, LiveUpdate::ManualEntryRequested { hint: None })));
        assert_eq!(h.manager.store().snapshot().await.appointments.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_microphone_fails_without_connecting() {
        let mut h = Harness::build(true, false);

        let err = h.manager.open(&user()).await.unwrap_err();

        assert!(matches!(err, LiveError::Device(DeviceError::MicrophoneUnavailable(_))));
        assert_eq!(h.manager.state(), LiveSessionState::Closed);
        assert_eq!(h.wire.lock().unwrap().connects, 0);
    }

    #[tokio::test]
    async fn failed_connect_releases_microphone() {
        let mut h = Harness::build(false, true);

        let err = h.manager.open(&user()).await.unwrap_err();

        assert!(matches!(err, LiveError::Connection(ModelError::InvalidApiKey)));
        assert_eq!(h.manager.state(), LiveSessionState::Closed);
        let devices = h.devices.lock().unwrap();
        assert_eq!(devices.acquired, 1);
        assert_eq!(devices.released, 1);
        assert_eq!(devices.output_closed, 1);
    }

    #[tokio::test]
    async fn failed_connect_finishes_teardown_when_release_fails() {
        let mut h = Harness::build(false, true);
        h.devices.lock().unwrap().fail_release = true;

        let err = h.manager.open(&user()).await.unwrap_err();

        assert!(matches!(err, LiveError::Connection(ModelError::InvalidApiKey)));
        let devices = h.devices.lock().unwrap();
        assert_eq!(devices.released, 1);
        assert_eq!(devices.capture_closed, 1);
        assert_eq!(devices.output_closed, 1);
    }

    #[test]
    fn partial_open_teardown_reports_each_failed_step() {
        let devices: Shared<Devices> = Arc::default();
        devices.lock().unwrap().fail_release = true;
        let (_tx, frames) = mpsc::channel(1);
        let mut capture = MockCapture {
            devices: devices.clone(),
            frames,
        };
        let mut output: Box<dyn AudioOutput> = Box::new(MockOutput(devices.clone()));

        let report = release_after_failed_open(&mut capture, Some(&mut output));

        assert_eq!(report.failed_steps(), vec!["release microphone"]);
        let devices = devices.lock().unwrap();
        assert_eq!(devices.capture_closed, 1);
        assert_eq!(devices.output_closed, 1);
    }

    #[tokio::test]
    async fn close_runs_every_step_and_reports_failures() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();
        h.service.send(model_audio(0.5)).await.unwrap();
        h.manager.step().await.unwrap();
        h.devices.lock().unwrap().fail_release = true;

        let report = h.manager.close().await;

        assert_eq!(report.failed_steps(), vec!["release microphone"]);
        assert_eq!(h.manager.state(), LiveSessionState::Closed);
        let devices = h.devices.lock().unwrap();
        assert_eq!(devices.stopped, vec![1]);
        assert_eq!(devices.capture_closed, 1);
        assert_eq!(devices.output_closed, 1);
        assert!(h.wire.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn remote_close_ends_session() {
        let mut h = Harness::new();
        h.manager.open(&user()).await.unwrap();

        h.service.send(LiveEvent::Closed(Some("bye".into()))).await.unwrap();
        assert!(!h.manager.step().await.unwrap());

        assert_eq!(h.manager.state(), LiveSessionState::Closed);
        assert!(!h.manager.step().await.unwrap());
    }

    #[tokio::test]
    async fn drop_releases_devices() {
        let h = Harness::new();
        let devices = h.devices.clone();
        let Harness { mut manager, .. } = h;
        manager.open(&user()).await.unwrap();

        drop(manager);

        let devices = devices.lock().unwrap();
        assert_eq!(devices.released, 1);
        assert_eq!(devices.output_closed, 1);
    }
}
