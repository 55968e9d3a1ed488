//! Generative model port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::PcmAudio;
use crate::domain::conversation::{ModelMessage, ModelReply, ToolDeclaration};

/// Model service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Model service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Empty model response")]
    EmptyResponse,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Connection closed: {0}")]
    ConnectionClosed(String),
}

impl ModelError {
    /// Network failures, rate limits and 5xx responses are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed(_) | Self::RateLimited | Self::ServiceUnavailable(_)
        )
    }
}

/// Everything the chat model needs for one generation
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_instruction: &'a str,
    pub tools: &'a [ToolDeclaration],
    pub messages: &'a [ModelMessage],
}

/// Port for turn-based generation with function calling
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate the next model reply for the given context.
    ///
    /// # Returns
    /// Reply text and/or function calls, or an error
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<ModelReply, ModelError>;
}

/// Port for text-to-speech
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech for the given text.
    ///
    /// # Returns
    /// Mono PCM audio at the model output rate
    async fn synthesize(&self, text: &str) -> Result<PcmAudio, ModelError>;
}

/// Blanket implementation for boxed chat models
#[async_trait]
impl ChatModel for Box<dyn ChatModel> {
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<ModelReply, ModelError> {
        self.as_ref().generate(request).await
    }
}

/// Blanket implementation for boxed synthesizers
#[async_trait]
impl SpeechSynthesizer for Box<dyn SpeechSynthesizer> {
    async fn synthesize(&self, text: &str) -> Result<PcmAudio, ModelError> {
        self.as_ref().synthesize(text).await
    }
}
