//! Base traits and types for realtime AI conversation providers.
//!
//! A provider is opened through a [`RealtimeConnector`], which sends the
//! session setup message and returns a [`RealtimeSession`]: a shareable
//! [`RealtimeSender`] for the outbound direction plus a channel of typed
//! [`RealtimeEvent`]s for the inbound direction. The channel closes when the
//! provider connection ends.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::codec::{AudioFormat, CodecError, MediaFrame};
use crate::core::tools::{FunctionDefinition, ToolInvocation, ToolResult};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Audio could not be converted to the provider's format
    #[error("Audio conversion failed: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Session Setup
// =============================================================================

/// Server-side voice activity detection tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct VadConfig {
    /// Turn automatic activity detection off entirely
    pub disabled: bool,
    /// Start-of-speech sensitivity (e.g. `START_SENSITIVITY_HIGH`)
    pub start_sensitivity: String,
    /// End-of-speech sensitivity (e.g. `END_SENSITIVITY_HIGH`)
    pub end_sensitivity: String,
    /// Audio kept before detected speech start
    pub prefix_padding_ms: u32,
    /// Silence needed to end a caller turn
    pub silence_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            start_sensitivity: "START_SENSITIVITY_HIGH".to_string(),
            end_sensitivity: "END_SENSITIVITY_HIGH".to_string(),
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Everything a provider needs to configure one conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    /// Call this session belongs to (for logging)
    pub call_id: String,
    pub model: String,
    pub voice: String,
    /// System instructions
    pub instructions: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub tools: Vec<FunctionDefinition>,
    pub vad: VadConfig,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            call_id: String::new(),
            model: String::new(),
            voice: String::new(),
            instructions: None,
            temperature: 0.8,
            top_p: 0.95,
            tools: Vec::new(),
            vad: VadConfig::default(),
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Model output carried by a single server message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelContent {
    /// Audio chunks in the provider's output format
    pub audio: Vec<MediaFrame>,
    /// Text parts of the model turn
    pub text: Vec<String>,
    /// Provider response the content belongs to, when the provider has one
    pub response_id: Option<String>,
    pub turn_complete: bool,
    pub interrupted: bool,
    pub generation_complete: bool,
}

impl ModelContent {
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
            && self.text.is_empty()
            && !self.turn_complete
            && !self.interrupted
            && !self.generation_complete
    }
}

/// Incremental or final transcription text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcription {
    pub text: String,
    pub finished: bool,
}

/// Administrative events that are logged and otherwise ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// Provider-assigned session id before setup completes
    SessionCreated { id: String },
    /// Token usage report
    Usage(Value),
    /// Server will close the session soon
    GoAway { time_left: Option<String> },
    /// Session resumption handle update
    Resumption { handle: Option<String>, resumable: bool },
    /// Rate limit status
    RateLimits(Value),
}

/// Typed server event produced by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// Setup acknowledged; audio may flow
    SetupComplete { session_id: Option<String> },
    /// Model turn content and turn flags
    Content(ModelContent),
    /// One or more function calls to run
    ToolCall(Vec<ToolInvocation>),
    /// Previously issued calls the model no longer wants
    ToolCallCancellation(Vec<String>),
    InputTranscription(Transcription),
    OutputTranscription(Transcription),
    /// Provider-side VAD heard the caller start talking
    SpeechStarted,
    Notice(SessionNotice),
    /// Non-fatal provider error report
    Error(String),
    /// Message type this gateway does not handle
    Unknown(String),
}

impl fmt::Display for RealtimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealtimeEvent::SetupComplete { .. } => write!(f, "setup_complete"),
            RealtimeEvent::Content(_) => write!(f, "content"),
            RealtimeEvent::ToolCall(_) => write!(f, "tool_call"),
            RealtimeEvent::ToolCallCancellation(_) => write!(f, "tool_call_cancellation"),
            RealtimeEvent::InputTranscription(_) => write!(f, "input_transcription"),
            RealtimeEvent::OutputTranscription(_) => write!(f, "output_transcription"),
            RealtimeEvent::SpeechStarted => write!(f, "speech_started"),
            RealtimeEvent::Notice(_) => write!(f, "notice"),
            RealtimeEvent::Error(_) => write!(f, "error"),
            RealtimeEvent::Unknown(kind) => write!(f, "unknown({kind})"),
        }
    }
}

// =============================================================================
// Session Traits
// =============================================================================

/// Outbound half of a provider session. Shared by both bridge loops.
#[async_trait]
pub trait RealtimeSender: Send + Sync {
    /// Forward caller audio. The frame is converted to the provider's input
    /// format if it is not already in it.
    async fn send_audio(&self, frame: &MediaFrame) -> RealtimeResult<()>;

    /// Send a complete user text turn (used for the greeting trigger).
    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()>;

    /// Reply to a tool invocation.
    async fn send_tool_result(&self, result: &ToolResult) -> RealtimeResult<()>;

    /// Ask the provider to stop the in-flight response.
    async fn cancel_response(&self) -> RealtimeResult<()>;

    /// Close the provider connection. Safe to call more than once.
    async fn close(&self) -> RealtimeResult<()>;
}

/// An open provider session.
pub struct RealtimeSession {
    pub sender: Arc<dyn RealtimeSender>,
    pub events: mpsc::Receiver<RealtimeEvent>,
    /// Format the provider expects for caller audio
    pub input_format: AudioFormat,
    /// Format of the audio the provider produces
    pub output_format: AudioFormat,
}

/// Opens provider sessions.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;

    /// Connect and send the setup message. The returned session has not yet
    /// been acknowledged; wait for [`RealtimeEvent::SetupComplete`].
    async fn connect(&self, setup: &SessionSetup) -> RealtimeResult<RealtimeSession>;
}

/// Shared connector handle.
pub type BoxedConnector = Arc<dyn RealtimeConnector>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RealtimeError::ConnectionFailed("test".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = RealtimeError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");
    }

    #[test]
    fn test_default_vad() {
        let vad = VadConfig::default();
        assert!(!vad.disabled);
        assert_eq!(vad.prefix_padding_ms, 300);
        assert_eq!(vad.silence_duration_ms, 500);
    }

    #[test]
    fn test_model_content_is_empty() {
        assert!(ModelContent::default().is_empty());
        assert!(
            !ModelContent {
                turn_complete: true,
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_event_display() {
        assert_eq!(RealtimeEvent::SpeechStarted.to_string(), "speech_started");
        assert_eq!(
            RealtimeEvent::Unknown("foo".into()).to_string(),
            "unknown(foo)"
        );
    }
}
