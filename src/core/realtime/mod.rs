//! AI live-conversation providers.
//!
//! # Supported Providers
//!
//! - **Gemini Live** (default) - native-audio model over `BidiGenerateContent`
//! - **OpenAI Realtime** - `gpt-realtime` family over the Realtime API
//!
//! Both are opened through a [`RealtimeConnector`] and produce the same
//! [`RealtimeEvent`] stream, so the bridge never branches on the provider.
//!
//! # Audio Format
//!
//! - Gemini: PCM16 in at 16 kHz (configurable), PCM16 out at 24 kHz
//! - OpenAI: PCM16 at 24 kHz or G.711 μ-law at 8 kHz, both directions

mod base;
mod connection;
pub mod gemini;
pub mod openai;

use std::sync::Arc;

pub use base::{
    BoxedConnector, ModelContent, RealtimeConnector, RealtimeError, RealtimeEvent,
    RealtimeResult, RealtimeSender, RealtimeSession, SessionNotice, SessionSetup, Transcription,
    VadConfig,
};
pub use gemini::{GeminiLive, GeminiLiveConfig};
pub use openai::{OpenAIRealtime, OpenAIRealtimeAudioFormat, OpenAIRealtimeConfig};

use crate::config::ServerConfig;

/// Supported realtime providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RealtimeProvider {
    /// Gemini Live API
    #[default]
    Gemini,
    /// OpenAI Realtime API
    OpenAI,
}

impl RealtimeProvider {
    /// Parse provider from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "gemini-live" | "google" => Some(RealtimeProvider::Gemini),
            "openai" | "openai-realtime" => Some(RealtimeProvider::OpenAI),
            _ => None,
        }
    }
}

impl std::fmt::Display for RealtimeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealtimeProvider::Gemini => write!(f, "gemini"),
            RealtimeProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Get list of supported realtime providers.
pub fn get_supported_realtime_providers() -> Vec<&'static str> {
    vec!["gemini", "openai"]
}

/// Build the connector selected by `config.realtime_provider`.
pub fn create_connector(config: &ServerConfig) -> RealtimeResult<BoxedConnector> {
    let provider = RealtimeProvider::parse(&config.realtime_provider).ok_or_else(|| {
        RealtimeError::InvalidConfiguration(format!(
            "Unsupported realtime provider '{}'. Supported: {}",
            config.realtime_provider,
            get_supported_realtime_providers().join(", ")
        ))
    })?;

    let api_key = config
        .get_api_key(&provider.to_string())
        .map_err(RealtimeError::InvalidConfiguration)?;

    match provider {
        RealtimeProvider::Gemini => {
            let mut gemini = GeminiLiveConfig::new(api_key);
            gemini.input_sample_rate = config.gemini_input_sample_rate;
            Ok(Arc::new(GeminiLive::new(gemini)?))
        }
        RealtimeProvider::OpenAI => {
            let mut openai = OpenAIRealtimeConfig::new(api_key);
            openai.audio_format = OpenAIRealtimeAudioFormat::parse(&config.openai_audio_format)
                .ok_or_else(|| {
                    RealtimeError::InvalidConfiguration(format!(
                        "Unsupported OpenAI audio format '{}'",
                        config.openai_audio_format
                    ))
                })?;
            Ok(Arc::new(OpenAIRealtime::new(openai)?))
        }
    }
}
