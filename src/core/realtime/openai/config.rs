//! OpenAI Realtime API configuration types.

use serde::{Deserialize, Serialize};

use crate::core::codec::AudioFormat;

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Model used when the session does not name one.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-realtime-mini";

/// Sample rate of the `pcm16` wire format.
pub const OPENAI_REALTIME_SAMPLE_RATE: u32 = 24000;

/// Model used for caller transcription.
pub const OPENAI_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Voices
// =============================================================================

/// Available voices for the OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeVoice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
    Marin,
    Cedar,
}

impl OpenAIRealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
            Self::Marin => "marin",
            Self::Cedar => "cedar",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            "marin" => Self::Marin,
            "cedar" => Self::Cedar,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Wire audio formats used for both directions of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeAudioFormat {
    /// PCM 16-bit signed little-endian at 24 kHz (default)
    #[default]
    Pcm16,
    /// G.711 μ-law at 8 kHz; telephony audio passes through untouched
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
}

impl OpenAIRealtimeAudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
        }
    }

    /// Codec-level description of this wire format.
    pub fn audio_format(&self) -> AudioFormat {
        match self {
            Self::Pcm16 => AudioFormat::pcm16(OPENAI_REALTIME_SAMPLE_RATE),
            Self::G711Ulaw => AudioFormat::TELEPHONY,
        }
    }

    /// Parse a configured value. Returns `None` for unsupported formats.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pcm16" | "pcm" | "linear16" => Some(Self::Pcm16),
            "g711_ulaw" | "ulaw" | "mulaw" => Some(Self::G711Ulaw),
            _ => None,
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeAudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Connection Configuration
// =============================================================================

/// Connection settings for [`super::OpenAIRealtime`].
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConfig {
    pub api_key: String,
    pub endpoint: String,
    pub audio_format: OpenAIRealtimeAudioFormat,
}

impl OpenAIRealtimeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: OPENAI_REALTIME_URL.to_string(),
            audio_format: OpenAIRealtimeAudioFormat::default(),
        }
    }

    pub fn build_ws_url(&self, model: &str) -> String {
        let model = if model.trim().is_empty() {
            OPENAI_DEFAULT_MODEL
        } else {
            model.trim()
        };
        format!("{}?model={}", self.endpoint, model)
    }
}

impl Drop for OpenAIRealtimeConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

// =============================================================================
// Tests
// =============================================================================
