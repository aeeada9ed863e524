//! Gemini Live API configuration types.

use serde::{Deserialize, Serialize};

/// Gemini Live bidirectional streaming endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default native-audio model.
pub const GEMINI_DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-12-2025";

/// Sample rate of the audio Gemini Live produces.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Default sample rate for audio sent to Gemini Live.
pub const GEMINI_DEFAULT_INPUT_SAMPLE_RATE: u32 = 16000;

// =============================================================================
// Voices
// =============================================================================

/// Prebuilt Gemini Live voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiVoice {
    #[default]
    Puck,
    Charon,
    Kore,
    Fenrir,
    Aoede,
    Leda,
    Orus,
    Zephyr,
}

impl GeminiVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Kore => "Kore",
            Self::Fenrir => "Fenrir",
            Self::Aoede => "Aoede",
            Self::Leda => "Leda",
            Self::Orus => "Orus",
            Self::Zephyr => "Zephyr",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "puck" => Self::Puck,
            "charon" => Self::Charon,
            "kore" => Self::Kore,
            "fenrir" => Self::Fenrir,
            "aoede" => Self::Aoede,
            "leda" => Self::Leda,
            "orus" => Self::Orus,
            "zephyr" => Self::Zephyr,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for GeminiVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize a model name to the `models/...` form the API expects.
pub fn qualified_model_name(model: &str) -> String {
    let model = model.trim();
    if model.is_empty() {
        GEMINI_DEFAULT_MODEL.to_string()
    } else if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

// =============================================================================
// Connection Configuration
// =============================================================================

/// Connection settings for [`super::GeminiLive`].
#[derive(Debug, Clone)]
pub struct GeminiLiveConfig {
    pub api_key: String,
    /// WebSocket endpoint; the API key is appended as `?key=`
    pub endpoint: String,
    /// Sample rate used for caller audio sent to the model
    pub input_sample_rate: u32,
}

impl GeminiLiveConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: GEMINI_LIVE_URL.to_string(),
            input_sample_rate: GEMINI_DEFAULT_INPUT_SAMPLE_RATE,
        }
    }

    pub fn build_ws_url(&self) -> String {
        format!("{}?key={}", self.endpoint, self.api_key)
    }
}

impl Drop for GeminiLiveConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.api_key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_parse() {
        assert_eq!(GeminiVoice::from_str_or_default("kore"), GeminiVoice::Kore);
        assert_eq!(GeminiVoice::from_str_or_default("PUCK"), GeminiVoice::Puck);
        assert_eq!(GeminiVoice::from_str_or_default("nope"), GeminiVoice::Puck);
        assert_eq!(GeminiVoice::Zephyr.to_string(), "Zephyr");
    }

    #[test]
    fn test_qualified_model_name() {
        assert_eq!(qualified_model_name(""), GEMINI_DEFAULT_MODEL);
        assert_eq!(
            qualified_model_name("gemini-2.0-flash-live-001"),
            "models/gemini-2.0-flash-live-001"
        );
        assert_eq!(
            qualified_model_name("models/gemini-2.0-flash-live-001"),
            "models/gemini-2.0-flash-live-001"
        );
    }

    #[test]
    fn test_build_ws_url() {
        let config = GeminiLiveConfig::new("k123");
        assert!(config.build_ws_url().starts_with("wss://generativelanguage.googleapis.com/"));
        assert!(config.build_ws_url().ends_with("?key=k123"));
    }
}
