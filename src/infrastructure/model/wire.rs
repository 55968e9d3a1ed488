//! Gemini content wire types shared by the REST and live adapters

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::ports::ModelError;
use crate::domain::audio::{PcmAudio, MODEL_OUTPUT_SAMPLE_RATE};
use crate::domain::conversation::{
    MessagePart, ModelMessage, ModelReply, ToolCall, ToolDeclaration, ToolResult,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tool {
    pub function_declarations: Vec<ToolDeclaration>,
}

impl Tool {
    /// All declarations go in a single tool entry
    pub fn wrap(declarations: &[ToolDeclaration]) -> Option<Vec<Tool>> {
        if declarations.is_empty() {
            return None;
        }
        Some(vec![Tool {
            function_declarations: declarations.to_vec(),
        }])
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl SpeechConfig {
    pub fn voice(name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: name.into(),
                },
            },
        }
    }
}

impl Content {
    /// A role-less text block, used for system instructions
    pub fn instruction(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    pub fn from_message(message: &ModelMessage) -> Self {
        Self {
            role: Some(message.role.as_str().to_string()),
            parts: message.parts.iter().map(Part::from_message_part).collect(),
        }
    }
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn from_message_part(part: &MessagePart) -> Self {
        match part {
            MessagePart::Text(text) => Self::text(text),
            MessagePart::Audio(audio) => Self {
                inline_data: Some(InlineData {
                    mime_type: audio.mime_type().as_str().to_string(),
                    data: audio.to_base64(),
                }),
                ..Self::default()
            },
            MessagePart::FunctionCall(call) => Self {
                function_call: Some(FunctionCall {
                    id: Some(call.id.clone()),
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                ..Self::default()
            },
            MessagePart::FunctionResponse(result) => Self {
                function_response: Some(FunctionResponse::from_result(result)),
                ..Self::default()
            },
        }
    }
}

impl FunctionResponse {
    pub fn from_result(result: &ToolResult) -> Self {
        Self {
            id: Some(result.call_id.clone()),
            name: result.name.clone(),
            response: result.payload.clone(),
        }
    }
}

/// Hands out `call-<n>` ids for calls the service sent without one
#[derive(Debug, Default)]
pub(crate) struct CallIds {
    next: AtomicU64,
}

impl CallIds {
    pub fn assign(&self, id: Option<String>) -> String {
        match id {
            Some(id) if !id.is_empty() => id,
            _ => format!("call-{}", self.next.fetch_add(1, Ordering::Relaxed) + 1),
        }
    }

    pub fn to_call(&self, call: FunctionCall) -> ToolCall {
        let args = if call.args.is_null() {
            Value::Object(Default::default())
        } else {
            call.args
        };
        ToolCall::new(self.assign(call.id), call.name, args)
    }
}

/// Collect text and function calls from response parts
pub(crate) fn reply_from_parts(parts: Vec<Part>, ids: &CallIds) -> ModelReply {
    let mut text = String::new();
    let mut function_calls = Vec::new();
    for part in parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            function_calls.push(ids.to_call(call));
        }
    }
    let text = text.trim();
    ModelReply {
        text: (!text.is_empty()).then(|| text.to_string()),
        function_calls,
    }
}

/// Decode an inline PCM16 LE payload, honouring a `rate=` MIME parameter
pub(crate) fn decode_pcm(inline: &InlineData) -> Result<PcmAudio, ModelError> {
    let bytes = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| ModelError::ParseError(format!("invalid audio payload: {}", e)))?;
    Ok(PcmAudio::from_pcm16_le(&bytes, sample_rate_of(&inline.mime_type)))
}

fn sample_rate_of(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(MODEL_OUTPUT_SAMPLE_RATE)
}
