//! Gemini REST adapters: chat with function calling, and text-to-speech

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ports::{ChatModel, ChatRequest, ModelError, SpeechSynthesizer};
use crate::domain::audio::PcmAudio;
use crate::domain::config::{DEFAULT_CHAT_MODEL, DEFAULT_TTS_MODEL, DEFAULT_VOICE};
use crate::domain::conversation::ModelReply;

use super::wire::{decode_pcm, reply_from_parts, CallIds, Content, Part, SpeechConfig, Tool};

/// Gemini API base URL
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// Request types for Gemini API

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

// Response types for Gemini API

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateContentResponse {
    fn into_parts(self) -> Result<Vec<Part>, ModelError> {
        if let Some(error) = self.error {
            return Err(ModelError::ApiError(error.message));
        }
        self.candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .filter(|parts| !parts.is_empty())
            .ok_or(ModelError::EmptyResponse)
    }
}

/// Shared HTTP plumbing for the REST adapters
#[derive(Debug, Clone)]
struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: API_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        )
    }

    async fn generate(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<Vec<Part>, ModelError> {
        let response = self
            .client
            .post(self.api_url(model))
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::RequestFailed(e.to_string()))?;

        let status = response.status();
        debug!(model, %status, "generateContent response");

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ModelError::InvalidApiKey);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("HTTP {}: {}", status, error_text);
            return Err(if status.is_server_error() {
                ModelError::ServiceUnavailable(message)
            } else {
                ModelError::ApiError(message)
            });
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::ParseError(e.to_string()))?;

        response.into_parts()
    }
}

/// Turn-based chat through `generateContent`
pub struct GeminiChatModel {
    http: GeminiClient,
    model: String,
    call_ids: CallIds,
}

impl GeminiChatModel {
    /// Create a chat model with the default model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, DEFAULT_CHAT_MODEL)
    }

    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: GeminiClient::new(api_key.into()),
            model: model.into(),
            call_ids: CallIds::default(),
        }
    }

    /// Point at another endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = base_url.into();
        self
    }

    fn build_request(request: &ChatRequest<'_>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: request.messages.iter().map(Content::from_message).collect(),
            system_instruction: Some(Content::instruction(request.system_instruction)),
            tools: Tool::wrap(request.tools),
            generation_config: None,
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<ModelReply, ModelError> {
        let body = Self::build_request(request);
        let parts = self.http.generate(&self.model, &body).await?;
        let reply = reply_from_parts(parts, &self.call_ids);

        if reply.text.is_none() && !reply.has_function_calls() {
            return Err(ModelError::EmptyResponse);
        }
        debug!(calls = reply.function_calls.len(), "model reply");
        Ok(reply)
    }
}

/// Speech synthesis through the TTS model's AUDIO modality
pub struct GeminiSpeechSynthesizer {
    http: GeminiClient,
    model: String,
    voice: String,
}

impl GeminiSpeechSynthesizer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: GeminiClient::new(api_key.into()),
            model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Point at another endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http.base_url = base_url.into();
        self
    }

    fn build_request(&self, text: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(text)],
            }],
            system_instruction: None,
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::voice(&self.voice)),
            }),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<PcmAudio, ModelError> {
        let body = self.build_request(text);
        let parts = self.http.generate(&self.model, &body).await?;

        let inline = parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or(ModelError::EmptyResponse)?;
        let audio = decode_pcm(&inline)?;
        if audio.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(audio)
    }
}
