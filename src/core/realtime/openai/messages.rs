//! OpenAI Realtime API WebSocket message types.
//!
//! Client events used by the gateway:
//! - session.update - configure the session (acknowledged by session.updated)
//! - input_audio_buffer.append - stream caller audio
//! - conversation.item.create - add a user message or a function result
//! - response.create - ask the model to respond
//! - response.cancel - stop the in-flight response
//!
//! Server events are decoded into [`ServerEvent`]; anything else becomes
//! [`ServerEvent::Unknown`] and is reported by its `type`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::config::OPENAI_TRANSCRIPTION_MODEL;
use crate::core::codec::{AudioFormat, MediaFrame};
use crate::core::realtime::base::{
    ModelContent, RealtimeEvent, SessionNotice, SessionSetup, Transcription,
};
use crate::core::realtime::connection::EventDecoder;
use crate::core::tools::{ToolInvocation, ToolResult};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent with `session.update`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    pub modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub input_audio_transcription: InputAudioTranscription,
    /// `null` turns server VAD off
    pub turn_detection: Option<TurnDetection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDef>,
    pub tool_choice: String,
    pub temperature: f32,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize)]
pub struct InputAudioTranscription {
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad {
        prefix_padding_ms: u32,
        silence_duration_ms: u32,
        create_response: bool,
        interrupt_response: bool,
    },
}

/// Flat function declaration.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl SessionConfig {
    pub fn from_setup(setup: &SessionSetup, voice: &str, audio_format: &str) -> Self {
        let turn_detection = (!setup.vad.disabled).then(|| TurnDetection::ServerVad {
            prefix_padding_ms: setup.vad.prefix_padding_ms,
            silence_duration_ms: setup.vad.silence_duration_ms,
            create_response: true,
            interrupt_response: true,
        });

        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: setup.instructions.clone(),
            voice: voice.to_string(),
            input_audio_format: audio_format.to_string(),
            output_audio_format: audio_format.to_string(),
            input_audio_transcription: InputAudioTranscription {
                model: OPENAI_TRANSCRIPTION_MODEL.to_string(),
            },
            turn_detection,
            tools: setup
                .tools
                .iter()
                .map(|def| ToolDef {
                    tool_type: "function".to_string(),
                    name: def.name.clone(),
                    description: def.description.clone(),
                    parameters: def.parameters.clone(),
                })
                .collect(),
            tool_choice: "auto".to_string(),
            temperature: setup.temperature,
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item, both sent and received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// JSON-encoded function result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ConversationItem {
    pub fn user_text(text: &str) -> Self {
        Self {
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.to_string()),
            }]),
            ..Default::default()
        }
    }

    pub fn function_output(result: &ToolResult) -> Self {
        Self {
            item_type: "function_call_output".to_string(),
            call_id: Some(result.id.clone()),
            output: Some(result.response.to_string()),
            ..Default::default()
        }
    }
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// Base64-encoded audio in the session's input format
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    #[serde(rename = "response.create")]
    ResponseCreate,

    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    pub fn audio_append(frame: &MediaFrame) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: frame.to_base64(),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events the gateway reacts to.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error { error: ApiError },

    #[serde(rename = "session.created")]
    SessionCreated { session: Session },

    #[serde(rename = "session.updated")]
    SessionUpdated { session: Session },

    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        #[serde(default)]
        transcript: String,
    },

    #[serde(rename = "response.created")]
    ResponseCreated { response: Response },

    #[serde(rename = "response.done")]
    ResponseDone { response: Response },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        #[serde(default)]
        response_id: Option<String>,
        item: ConversationItem,
    },

    #[serde(rename = "response.text.delta")]
    TextDelta {
        #[serde(default)]
        response_id: Option<String>,
        delta: String,
    },

    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        #[serde(default)]
        response_id: Option<String>,
        delta: String,
    },

    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Base64-encoded audio chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        response_id: Option<String>,
        delta: String,
    },

    #[serde(rename = "response.audio.done")]
    AudioDone {
        #[serde(default)]
        response_id: Option<String>,
    },

    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        call_id: String,
        /// Not sent by every API revision; recovered from `output_item.added`
        #[serde(default)]
        name: Option<String>,
        arguments: String,
    },

    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {
        #[serde(default)]
        rate_limits: Value,
    },

    #[serde(other)]
    Unknown,
}

// =============================================================================
// Supporting Types
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    event_type: String,
}

// =============================================================================
// Decoder
// =============================================================================

/// Maps OpenAI server events onto [`RealtimeEvent`]s.
pub(crate) struct OpenAIDecoder {
    output_format: AudioFormat,
    /// call_id -> function name, filled by `response.output_item.added`
    pending_calls: HashMap<String, String>,
}

impl OpenAIDecoder {
    pub(crate) fn new(output_format: AudioFormat) -> Self {
        Self {
            output_format,
            pending_calls: HashMap::new(),
        }
    }

    fn content(response_id: Option<String>) -> ModelContent {
        ModelContent {
            response_id,
            ..Default::default()
        }
    }

    fn map(&mut self, event: ServerEvent, raw: &str) -> Vec<RealtimeEvent> {
        match event {
            ServerEvent::Error { error } => vec![RealtimeEvent::Error(error.message)],
            ServerEvent::SessionCreated { session } => {
                vec![RealtimeEvent::Notice(SessionNotice::SessionCreated {
                    id: session.id,
                })]
            }
            ServerEvent::SessionUpdated { session } => vec![RealtimeEvent::SetupComplete {
                session_id: Some(session.id),
            }],
            ServerEvent::SpeechStarted { .. } => vec![RealtimeEvent::SpeechStarted],
            ServerEvent::SpeechStopped { .. } => Vec::new(),
            ServerEvent::TranscriptionCompleted { transcript } => {
                vec![RealtimeEvent::InputTranscription(Transcription {
                    text: transcript,
                    finished: true,
                })]
            }
            ServerEvent::ResponseCreated { response } => {
                debug!(response_id = %response.id, "OpenAI response started");
                Vec::new()
            }
            ServerEvent::ResponseDone { response } => {
                let mut events = Vec::with_capacity(2);
                if let Some(usage) = response.usage {
                    events.push(RealtimeEvent::Notice(SessionNotice::Usage(usage)));
                }
                events.push(RealtimeEvent::Content(ModelContent {
                    turn_complete: true,
                    ..Self::content(Some(response.id))
                }));
                events
            }
            ServerEvent::OutputItemAdded { item, .. } => {
                if item.item_type == "function_call"
                    && let (Some(call_id), Some(name)) = (item.call_id, item.name)
                {
                    self.pending_calls.insert(call_id, name);
                }
                Vec::new()
            }
            ServerEvent::TextDelta { response_id, delta } => {
                vec![RealtimeEvent::Content(ModelContent {
                    text: vec![delta],
                    ..Self::content(response_id)
                })]
            }
            ServerEvent::AudioTranscriptDelta { delta, .. } => {
                vec![RealtimeEvent::OutputTranscription(Transcription {
                    text: delta,
                    finished: false,
                })]
            }
            ServerEvent::AudioTranscriptDone { .. } => {
                // The deltas already carried the text.
                vec![RealtimeEvent::OutputTranscription(Transcription {
                    text: String::new(),
                    finished: true,
                })]
            }
            ServerEvent::AudioDelta { response_id, delta } => {
                match MediaFrame::from_base64(&delta, self.output_format) {
                    Ok(frame) => vec![RealtimeEvent::Content(ModelContent {
                        audio: vec![frame],
                        ..Self::content(response_id)
                    })],
                    Err(e) => {
                        warn!("Skipping undecodable model audio: {}", e);
                        Vec::new()
                    }
                }
            }
            ServerEvent::AudioDone { response_id } => vec![RealtimeEvent::Content(ModelContent {
                generation_complete: true,
                ..Self::content(response_id)
            })],
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                let pending = self.pending_calls.remove(&call_id);
                let Some(name) = name.or(pending) else {
                    warn!(call_id = %call_id, "Function call without a name, ignoring");
                    return Vec::new();
                };
                let args = match serde_json::from_str::<Map<String, Value>>(&arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        warn!(call_id = %call_id, "Function arguments are not an object: {}", e);
                        Map::new()
                    }
                };
                vec![RealtimeEvent::ToolCall(vec![ToolInvocation::new(
                    call_id, name, args,
                )])]
            }
            ServerEvent::RateLimitsUpdated { rate_limits } => {
                vec![RealtimeEvent::Notice(SessionNotice::RateLimits(rate_limits))]
            }
            ServerEvent::Unknown => {
                let kind = serde_json::from_str::<Envelope>(raw)
                    .map(|e| e.event_type)
                    .unwrap_or_default();
                vec![RealtimeEvent::Unknown(kind)]
            }
        }
    }
}

impl EventDecoder for OpenAIDecoder {
    fn decode(&mut self, text: &str) -> Vec<RealtimeEvent> {
        match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => self.map(event, text),
            Err(e) => {
                warn!("Dropping malformed OpenAI event: {}", e);
                Vec::new()
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
