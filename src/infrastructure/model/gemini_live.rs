//! Gemini Live adapter over the `BidiGenerateContent` WebSocket

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::application::ports::{
    LiveConnection, LiveEvent, LiveModel, LiveSender, LiveSetup, ModelError,
};
use crate::domain::audio::CAPTURE_SAMPLE_RATE;
use crate::domain::config::DEFAULT_LIVE_MODEL;
use crate::domain::conversation::ToolResult;

use super::wire::{decode_pcm, CallIds, Content, FunctionCall, FunctionResponse, SpeechConfig, Tool};

/// Live API WebSocket host
pub const LIVE_BASE_URL: &str = "wss://generativelanguage.googleapis.com";

const LIVE_PATH: &str =
    "/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// How long to wait for `setupComplete`
const SETUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Inbound event buffer
const EVENT_BUFFER: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Client messages

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupMessage {
    setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup {
    model: String,
    generation_config: LiveGenerationConfig,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    output_audio_transcription: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveGenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

// Server messages

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServerMessage {
    setup_complete: Option<Value>,
    server_content: Option<ServerContent>,
    tool_call: Option<ToolCallMessage>,
    tool_call_cancellation: Option<ToolCallCancellation>,
    go_away: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServerContent {
    model_turn: Option<Content>,
    interrupted: bool,
    turn_complete: bool,
    output_transcription: Option<Transcription>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Transcription {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ToolCallMessage {
    function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToolCallCancellation {
    ids: Vec<String>,
}

impl ServerMessage {
    fn parse(message: &Message) -> Option<Self> {
        let text = match message {
            Message::Text(text) => text.as_str(),
            Message::Binary(bytes) => std::str::from_utf8(bytes).ok()?,
            _ => return None,
        };
        match serde_json::from_str(text) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(error = %e, "ignoring unparseable live message");
                None
            }
        }
    }

    /// Translate into port events, in playback order
    fn into_events(self, ids: &CallIds) -> Vec<LiveEvent> {
        let mut events = Vec::new();
        if let Some(content) = self.server_content {
            if content.interrupted {
                events.push(LiveEvent::Interrupted);
            }
            for part in content.model_turn.map(|t| t.parts).unwrap_or_default() {
                if let Some(inline) = part.inline_data {
                    match decode_pcm(&inline) {
                        Ok(audio) if !audio.is_empty() => events.push(LiveEvent::Audio(audio)),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "dropping undecodable audio frame"),
                    }
                }
            }
            if let Some(text) = content.output_transcription.and_then(|t| t.text) {
                if !text.is_empty() {
                    events.push(LiveEvent::Transcript(text));
                }
            }
            if content.turn_complete {
                events.push(LiveEvent::TurnComplete);
            }
        }
        if let Some(tool_call) = self.tool_call {
            let calls: Vec<_> = tool_call
                .function_calls
                .into_iter()
                .map(|call| ids.to_call(call))
                .collect();
            if !calls.is_empty() {
                events.push(LiveEvent::ToolCalls(calls));
            }
        }
        if let Some(cancellation) = self.tool_call_cancellation {
            events.push(LiveEvent::ToolCallCancellation(cancellation.ids));
        }
        if self.go_away.is_some() {
            info!("live service announced disconnect");
        }
        events
    }
}

fn audio_message(pcm16: &[u8]) -> Value {
    json!({
        "realtimeInput": {
            "audio": {
                "mimeType": format!("audio/pcm;rate={}", CAPTURE_SAMPLE_RATE),
                "data": STANDARD.encode(pcm16),
            }
        }
    })
}

fn tool_response_message(results: &[ToolResult]) -> Value {
    let responses: Vec<FunctionResponse> = results.iter().map(FunctionResponse::from_result).collect();
    json!({ "toolResponse": { "functionResponses": responses } })
}

fn connect_error(err: tungstenite::Error) -> ModelError {
    match err {
        tungstenite::Error::Http(response)
            if response.status() == 401 || response.status() == 403 =>
        {
            ModelError::InvalidApiKey
        }
        tungstenite::Error::Http(response) if response.status() == 429 => ModelError::RateLimited,
        tungstenite::Error::Http(response) if response.status().is_server_error() => {
            ModelError::ServiceUnavailable(format!("HTTP {}", response.status()))
        }
        other => ModelError::RequestFailed(other.to_string()),
    }
}

/// Realtime voice model
pub struct GeminiLiveModel {
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiLiveModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_LIVE_MODEL.to_string(),
            base_url: LIVE_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another WebSocket host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}{}?key={}",
            self.base_url.trim_end_matches('/'),
            LIVE_PATH,
            self.api_key
        )
    }

    fn setup_message(&self, setup: &LiveSetup) -> SetupMessage {
        SetupMessage {
            setup: Setup {
                model: format!("models/{}", self.model),
                generation_config: LiveGenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: setup.voice.as_deref().map(SpeechConfig::voice),
                },
                system_instruction: Content::instruction(&setup.system_instruction),
                tools: Tool::wrap(&setup.tools),
                output_audio_transcription: json!({}),
            },
        }
    }
}

#[async_trait]
impl LiveModel for GeminiLiveModel {
    async fn connect(&self, setup: &LiveSetup) -> Result<LiveConnection, ModelError> {
        let (socket, _) = connect_async(self.url()).await.map_err(connect_error)?;
        let (mut write, mut read) = socket.split();

        let setup_json = serde_json::to_string(&self.setup_message(setup))
            .map_err(|e| ModelError::ParseError(e.to_string()))?;
        write
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| ModelError::RequestFailed(e.to_string()))?;

        tokio::time::timeout(SETUP_TIMEOUT, await_setup_complete(&mut read))
            .await
            .map_err(|_| ModelError::ConnectionClosed("timed out waiting for setup".into()))??;
        info!(model = %self.model, "live channel ready");

        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_events(read, events_tx));

        Ok(LiveConnection {
            sender: Box::new(GeminiLiveSender {
                write,
                reader: Some(reader),
            }),
            events,
        })
    }
}

async fn await_setup_complete(read: &mut SplitStream<Socket>) -> Result<(), ModelError> {
    while let Some(message) = read.next().await {
        let message = message.map_err(|e| ModelError::RequestFailed(e.to_string()))?;
        if let Message::Close(frame) = &message {
            let reason = frame
                .as_ref()
                .map(|f| f.reason.to_string())
                .unwrap_or_else(|| "closed during setup".to_string());
            return Err(ModelError::ConnectionClosed(reason));
        }
        if ServerMessage::parse(&message).is_some_and(|m| m.setup_complete.is_some()) {
            return Ok(());
        }
    }
    Err(ModelError::ConnectionClosed("closed during setup".into()))
}

/// Forward server messages as events until the socket closes
async fn read_events(mut read: SplitStream<Socket>, events: mpsc::Sender<LiveEvent>) {
    let ids = CallIds::default();
    let reason = loop {
        match read.next().await {
            Some(Ok(Message::Close(frame))) => {
                break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
            }
            Some(Ok(message)) => {
                let Some(parsed) = ServerMessage::parse(&message) else {
                    continue;
                };
                for event in parsed.into_events(&ids) {
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        }
    };
    debug!(?reason, "live socket closed");
    let _ = events.send(LiveEvent::Closed(reason)).await;
}

/// Outbound half. Dropping it stops the reader and closes the socket.
struct GeminiLiveSender {
    write: SplitSink<Socket, Message>,
    reader: Option<JoinHandle<()>>,
}

impl GeminiLiveSender {
    async fn send_json(&mut self, value: &Value) -> Result<(), ModelError> {
        self.write
            .send(Message::Text(value.to_string()))
            .await
            .map_err(|e| ModelError::ConnectionClosed(e.to_string()))
    }
}

#[async_trait]
impl LiveSender for GeminiLiveSender {
    async fn send_audio(&mut self, pcm16: &[u8]) -> Result<(), ModelError> {
        self.send_json(&audio_message(pcm16)).await
    }

    async fn send_tool_results(&mut self, results: &[ToolResult]) -> Result<(), ModelError> {
        debug!(count = results.len(), "sending tool responses");
        self.send_json(&tool_response_message(results)).await
    }

    async fn close(&mut self) -> Result<(), ModelError> {
        let result = self
            .write
            .close()
            .await
            .map_err(|e| ModelError::ConnectionClosed(e.to_string()));
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        result
    }
}

impl Drop for GeminiLiveSender {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
