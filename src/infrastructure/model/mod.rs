//! Gemini model adapters

mod gemini;
mod gemini_live;
mod wire;

pub use gemini::{GeminiChatModel, GeminiSpeechSynthesizer, API_BASE_URL};
pub use gemini_live::{GeminiLiveModel, LIVE_BASE_URL};
