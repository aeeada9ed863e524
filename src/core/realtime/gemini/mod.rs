//! Gemini Live (BidiGenerateContent) provider.
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/...BidiGenerateContent?key=<key>`
//! - Input audio: `audio/pcm;rate=16000` by default (8 kHz also accepted)
//! - Output audio: `audio/pcm;rate=24000`
//! - Interruptions are reported with `serverContent.interrupted`

mod client;
mod config;
mod messages;

pub use client::GeminiLive;
pub use config::{
    GEMINI_DEFAULT_INPUT_SAMPLE_RATE, GEMINI_DEFAULT_MODEL, GEMINI_LIVE_URL,
    GEMINI_OUTPUT_SAMPLE_RATE, GeminiLiveConfig, GeminiVoice, qualified_model_name,
};
pub use messages::{ClientMessage, ServerMessage};
