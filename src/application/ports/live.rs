//! Realtime bidirectional model channel

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::audio::PcmAudio;
use crate::domain::conversation::{ToolCall, ToolDeclaration, ToolResult};

use super::model::ModelError;

/// Session parameters sent when the channel opens
#[derive(Debug, Clone)]
pub struct LiveSetup {
    pub system_instruction: String,
    pub tools: Vec<ToolDeclaration>,
    pub voice: Option<String>,
}

/// Inbound events from the live channel
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Model speech, PCM at the model output rate
    Audio(PcmAudio),
    ToolCalls(Vec<ToolCall>),
    /// Ids of pending calls the service no longer wants answered
    ToolCallCancellation(Vec<String>),
    /// The user started speaking over the model
    Interrupted,
    TurnComplete,
    /// Text transcription of the model's speech
    Transcript(String),
    /// The remote side closed the channel, with an optional reason
    Closed(Option<String>),
}

/// Outbound half of a live channel
#[async_trait]
pub trait LiveSender: Send {
    /// Stream one PCM16 LE microphone frame at the capture rate
    async fn send_audio(&mut self, pcm16: &[u8]) -> Result<(), ModelError>;

    /// Answer function calls, all in one message
    async fn send_tool_results(&mut self, results: &[ToolResult]) -> Result<(), ModelError>;

    /// Close the channel
    async fn close(&mut self) -> Result<(), ModelError>;
}

/// An open live channel. Dropping it closes the connection.
pub struct LiveConnection {
    pub sender: Box<dyn LiveSender>,
    pub events: mpsc::Receiver<LiveEvent>,
}

/// Port for realtime voice sessions
#[async_trait]
pub trait LiveModel: Send + Sync {
    /// Open a channel and complete the setup handshake
    async fn connect(&self, setup: &LiveSetup) -> Result<LiveConnection, ModelError>;
}

/// Blanket implementation for boxed live models
#[async_trait]
impl LiveModel for Box<dyn LiveModel> {
    async fn connect(&self, setup: &LiveSetup) -> Result<LiveConnection, ModelError> {
        self.as_ref().connect(setup).await
    }
}
