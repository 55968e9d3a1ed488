//! Conversation context exchanged with the chat model

use crate::domain::audio::AudioData;

use super::tool_call::{ToolCall, ToolResult};
use super::turn::Role;

/// One part of a message
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text(String),
    Audio(AudioData),
    FunctionCall(ToolCall),
    FunctionResponse(ToolResult),
}

/// A message in the model context
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl ModelMessage {
    /// User message from optional text and audio. Audio goes first.
    pub fn user_turn(text: Option<&str>, audio: Option<&AudioData>) -> Self {
        let mut parts = Vec::new();
        if let Some(audio) = audio {
            parts.push(MessagePart::Audio(audio.clone()));
        }
        if let Some(text) = text {
            parts.push(MessagePart::Text(text.to_string()));
        }
        Self {
            role: Role::User,
            parts,
        }
    }

    /// All results of one model reply, in a single message
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            parts: results.into_iter().map(MessagePart::FunctionResponse).collect(),
        }
    }
}

/// A model reply: optional text and any function calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub function_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_calls: Vec::new(),
        }
    }

    pub fn calls(function_calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            function_calls,
        }
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }

    /// The reply as it is kept in the context
    pub fn to_message(&self) -> ModelMessage {
        let mut parts = Vec::new();
        if let Some(text) = &self.text {
            parts.push(MessagePart::Text(text.clone()));
        }
        parts.extend(self.function_calls.iter().cloned().map(MessagePart::FunctionCall));
        ModelMessage {
            role: Role::Model,
            parts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::AudioMimeType;
    use serde_json::json;

    #[test]
    fn user_turn_orders_audio_before_text() {
        let audio = AudioData::new(vec![0; 4], AudioMimeType::Flac);
        let msg = ModelMessage::user_turn(Some("hi"), Some(&audio));
        assert!(matches!(msg.parts[0], MessagePart::Audio(_)));
        assert!(matches!(msg.parts[1], MessagePart::Text(_)));
    }

    #[test]
    fn reply_message_keeps_calls() {
        let reply = ModelReply::calls(vec![ToolCall::new("c1", "getExpenses", json!({}))]);
        let msg = reply.to_message();
        assert_eq!(msg.role, Role::Model);
        assert_eq!(msg.parts.len(), 1);
        assert!(reply.has_function_calls());
    }
}
