//! OpenAI Realtime API provider.
//!
//! Supported voices: alloy, ash, ballad, coral, echo, sage, shimmer, verse,
//! marin, cedar.
//!
//! Audio is either PCM 16-bit little-endian at 24 kHz or G.711 μ-law at
//! 8 kHz. With μ-law the telephony audio passes through without conversion.

mod client;
mod config;
mod messages;

pub use client::OpenAIRealtime;
pub use config::{
    OPENAI_DEFAULT_MODEL, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeConfig, OpenAIRealtimeVoice,
};
pub use messages::{ClientEvent, ConversationItem, ServerEvent, SessionConfig};
