//! Gemini Live WebSocket message types.
//!
//! Client messages are single-key JSON objects (`setup`, `realtimeInput`,
//! `clientContent`, `toolResponse`). Server messages are also keyed objects,
//! frequently delivered as binary frames; unrecognized keys are preserved so
//! they can be logged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::core::codec::{AudioFormat, MediaFrame};
use crate::core::realtime::base::{
    ModelContent, RealtimeEvent, SessionNotice, SessionSetup, Transcription,
};
use crate::core::realtime::connection::EventDecoder;
use crate::core::tools::{FunctionDefinition, ToolInvocation, ToolResult};

// =============================================================================
// Client Messages
// =============================================================================

/// Messages sent to Gemini Live.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponse),
}

/// Session setup, the first message on every connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSet>,
    pub realtime_input_config: RealtimeInputConfig,
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSet {
    pub function_declarations: Vec<FunctionDefinition>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputConfig {
    pub automatic_activity_detection: AutomaticActivityDetection,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticActivityDetection {
    pub disabled: bool,
    pub start_of_speech_sensitivity: String,
    pub prefix_padding_ms: u32,
    pub end_of_speech_sensitivity: String,
    pub silence_duration_ms: u32,
}

/// Enables transcription; serialized as `{}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscriptionConfig {}

/// Streaming audio input.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub audio: Blob,
}

/// A complete conversational turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

// =============================================================================
// Shared Content Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    /// Set on reasoning parts that are not meant to be spoken
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

/// Base64 payload with its MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl ClientMessage {
    /// Build the setup message for a session.
    pub fn setup(setup: &SessionSetup, model: String, voice: String) -> Self {
        let tools = if setup.tools.is_empty() {
            Vec::new()
        } else {
            vec![ToolSet {
                function_declarations: setup.tools.clone(),
            }]
        };

        ClientMessage::Setup(Setup {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: voice },
                    },
                },
                temperature: setup.temperature,
                top_p: setup.top_p,
            },
            system_instruction: setup.instructions.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.clone()),
                    ..Default::default()
                }],
            }),
            tools,
            realtime_input_config: RealtimeInputConfig {
                automatic_activity_detection: AutomaticActivityDetection {
                    disabled: setup.vad.disabled,
                    start_of_speech_sensitivity: setup.vad.start_sensitivity.clone(),
                    prefix_padding_ms: setup.vad.prefix_padding_ms,
                    end_of_speech_sensitivity: setup.vad.end_sensitivity.clone(),
                    silence_duration_ms: setup.vad.silence_duration_ms,
                },
            },
            input_audio_transcription: TranscriptionConfig::default(),
            output_audio_transcription: TranscriptionConfig::default(),
        })
    }

    pub fn audio(frame: &MediaFrame) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            audio: Blob {
                mime_type: frame.format.mime_type(),
                data: frame.to_base64(),
            },
        })
    }

    /// A single user text turn marked complete.
    pub fn user_text(text: &str) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                    ..Default::default()
                }],
            }],
            turn_complete: true,
        })
    }

    pub fn tool_result(result: &ToolResult) -> Self {
        ClientMessage::ToolResponse(ToolResponse {
            function_responses: vec![FunctionResponse {
                id: result.id.clone(),
                name: result.name.clone(),
                response: result.response.clone(),
            }],
        })
    }
}

// =============================================================================
// Server Messages
// =============================================================================

/// A decoded server message. At most one of the known keys is normally set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
    #[serde(default)]
    pub tool_call_cancellation: Option<ToolCallCancellation>,
    #[serde(default)]
    pub usage_metadata: Option<Value>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
    #[serde(default)]
    pub session_resumption_update: Option<SessionResumptionUpdate>,
    /// Keys this gateway does not know about
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub generation_complete: bool,
    #[serde(default)]
    pub input_transcription: Option<TranscriptionText>,
    #[serde(default)]
    pub output_transcription: Option<TranscriptionText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionText {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionUpdate {
    #[serde(default)]
    pub new_handle: Option<String>,
    #[serde(default)]
    pub resumable: bool,
}

// =============================================================================
// Decoder
// =============================================================================

/// Maps Gemini server messages onto [`RealtimeEvent`]s.
pub(crate) struct GeminiDecoder {
    /// Rate assumed for inline audio without a `rate=` parameter
    output_rate: u32,
}

impl GeminiDecoder {
    pub(crate) fn new(output_rate: u32) -> Self {
        Self { output_rate }
    }

    fn content(&self, content: ServerContent, events: &mut Vec<RealtimeEvent>) {
        // Transcripts go first so an utterance is complete before turn flags
        // are acted on.
        if let Some(t) = content.input_transcription {
            events.push(RealtimeEvent::InputTranscription(Transcription {
                text: t.text,
                finished: t.finished,
            }));
        }
        if let Some(t) = content.output_transcription {
            events.push(RealtimeEvent::OutputTranscription(Transcription {
                text: t.text,
                finished: t.finished,
            }));
        }

        let mut model = ModelContent {
            turn_complete: content.turn_complete,
            interrupted: content.interrupted,
            generation_complete: content.generation_complete,
            ..Default::default()
        };

        for part in content.model_turn.map(|t| t.parts).unwrap_or_default() {
            if part.thought {
                continue;
            }
            if let Some(text) = part.text {
                model.text.push(text);
            }
            if let Some(blob) = part.inline_data {
                let Some(format) = AudioFormat::from_mime_type(&blob.mime_type, self.output_rate)
                else {
                    warn!(mime_type = %blob.mime_type, "Skipping non-audio inline data");
                    continue;
                };
                match MediaFrame::from_base64(&blob.data, format) {
                    Ok(frame) => model.audio.push(frame),
                    Err(e) => warn!("Skipping undecodable model audio: {}", e),
                }
            }
        }

        if !model.is_empty() {
            events.push(RealtimeEvent::Content(model));
        }
    }
}

impl EventDecoder for GeminiDecoder {
    fn decode(&mut self, text: &str) -> Vec<RealtimeEvent> {
        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed Gemini message: {}", e);
                return Vec::new();
            }
        };

        let mut events = Vec::new();

        if message.setup_complete.is_some() {
            events.push(RealtimeEvent::SetupComplete { session_id: None });
        }
        if let Some(content) = message.server_content {
            self.content(content, &mut events);
        }
        if let Some(call) = message.tool_call {
            let invocations = call
                .function_calls
                .into_iter()
                .map(|fc| {
                    let id = fc
                        .id
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                    ToolInvocation::new(id, fc.name, fc.args.unwrap_or_default())
                })
                .collect();
            events.push(RealtimeEvent::ToolCall(invocations));
        }
        if let Some(cancel) = message.tool_call_cancellation {
            events.push(RealtimeEvent::ToolCallCancellation(cancel.ids));
        }
        if let Some(usage) = message.usage_metadata {
            events.push(RealtimeEvent::Notice(SessionNotice::Usage(usage)));
        }
        if let Some(go_away) = message.go_away {
            events.push(RealtimeEvent::Notice(SessionNotice::GoAway {
                time_left: go_away.time_left,
            }));
        }
        if let Some(update) = message.session_resumption_update {
            events.push(RealtimeEvent::Notice(SessionNotice::Resumption {
                handle: update.new_handle,
                resumable: update.resumable,
            }));
        }

        if events.is_empty()
            && let Some(key) = message.other.keys().next()
        {
            events.push(RealtimeEvent::Unknown(key.clone()));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::Encoding;
    use crate::core::realtime::base::VadConfig;
    use serde_json::json;

    fn decode(value: Value) -> Vec<RealtimeEvent> {
        GeminiDecoder::new(24000).decode(&value.to_string())
    }

    #[test]
    fn test_setup_serialization() {
        let setup = SessionSetup {
            call_id: "abc".into(),
            instructions: Some("Be brief.".into()),
            tools: vec![FunctionDefinition {
                name: "get_customer_info".into(),
                description: "Look up the caller".into(),
                parameters: json!({"type": "object", "properties": {}}),
            }],
            vad: VadConfig::default(),
            ..Default::default()
        };
        let message = ClientMessage::setup(&setup, "models/m".into(), "Puck".into());
        let value = serde_json::to_value(&message).unwrap();

        let s = &value["setup"];
        assert_eq!(s["model"], "models/m");
        assert_eq!(s["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            s["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
        assert_eq!(s["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(
            s["tools"][0]["functionDeclarations"][0]["name"],
            "get_customer_info"
        );
        let vad = &s["realtimeInputConfig"]["automaticActivityDetection"];
        assert_eq!(vad["disabled"], false);
        assert_eq!(vad["startOfSpeechSensitivity"], "START_SENSITIVITY_HIGH");
        assert_eq!(vad["prefixPaddingMs"], 300);
        assert_eq!(vad["silenceDurationMs"], 500);
        assert_eq!(s["inputAudioTranscription"], json!({}));
        assert_eq!(s["outputAudioTranscription"], json!({}));
    }

    #[test]
    fn test_setup_without_tools_or_instructions() {
        let message =
            ClientMessage::setup(&SessionSetup::default(), "models/m".into(), "Kore".into());
        let value = serde_json::to_value(&message).unwrap();
        assert!(value["setup"].get("tools").is_none());
        assert!(value["setup"].get("systemInstruction").is_none());
    }

    #[test]
    fn test_client_messages() {
        let frame = MediaFrame::new(vec![0u8, 0, 1, 0], AudioFormat::pcm16(16000));
        let value = serde_json::to_value(ClientMessage::audio(&frame)).unwrap();
        assert_eq!(value["realtimeInput"]["audio"]["mimeType"], "audio/pcm;rate=16000");
        assert_eq!(value["realtimeInput"]["audio"]["data"], "AAABAA==");

        let value = serde_json::to_value(ClientMessage::user_text("hello")).unwrap();
        assert_eq!(value["clientContent"]["turns"][0]["role"], "user");
        assert_eq!(value["clientContent"]["turns"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["clientContent"]["turnComplete"], true);

        let result = ToolResult {
            id: "t1".into(),
            name: "get_customer_info".into(),
            response: json!({"name": "John Doe"}),
        };
        let value = serde_json::to_value(ClientMessage::tool_result(&result)).unwrap();
        let fr = &value["toolResponse"]["functionResponses"][0];
        assert_eq!(fr["id"], "t1");
        assert_eq!(fr["name"], "get_customer_info");
        assert_eq!(fr["response"]["name"], "John Doe");
    }

    #[test]
    fn test_decode_setup_complete() {
        assert_eq!(
            decode(json!({"setupComplete": {}})),
            vec![RealtimeEvent::SetupComplete { session_id: None }]
        );
    }

    #[test]
    fn test_decode_model_audio() {
        let events = decode(json!({
            "serverContent": {
                "modelTurn": {"parts": [
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAABAA=="}}
                ]}
            }
        }));
        assert_eq!(events.len(), 1);
        let RealtimeEvent::Content(content) = &events[0] else {
            panic!("expected content");
        };
        assert_eq!(content.audio.len(), 1);
        assert_eq!(content.audio[0].format.encoding, Encoding::Pcm16);
        assert_eq!(content.audio[0].format.sample_rate, 24000);
        assert_eq!(content.audio[0].data.len(), 4);
        assert!(!content.turn_complete);
    }

    #[test]
    fn test_decode_skips_bad_audio_and_thoughts() {
        let events = decode(json!({
            "serverContent": {
                "modelTurn": {"parts": [
                    {"inlineData": {"mimeType": "audio/pcm", "data": "***"}},
                    {"text": "thinking", "thought": true},
                    {"text": "Hello"}
                ]},
                "turnComplete": true
            }
        }));
        let RealtimeEvent::Content(content) = &events[0] else {
            panic!("expected content");
        };
        assert!(content.audio.is_empty());
        assert_eq!(content.text, vec!["Hello".to_string()]);
        assert!(content.turn_complete);
    }

    #[test]
    fn test_decode_interrupted() {
        let events = decode(json!({"serverContent": {"interrupted": true}}));
        let RealtimeEvent::Content(content) = &events[0] else {
            panic!("expected content");
        };
        assert!(content.interrupted);
    }

    #[test]
    fn test_decode_transcriptions_precede_content() {
        let events = decode(json!({
            "serverContent": {
                "outputTranscription": {"text": "Hi there"},
                "turnComplete": true
            }
        }));
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            RealtimeEvent::OutputTranscription(Transcription {
                text: "Hi there".into(),
                finished: false
            })
        );
        assert!(matches!(events[1], RealtimeEvent::Content(_)));
    }

    #[test]
    fn test_decode_tool_call() {
        let events = decode(json!({
            "toolCall": {"functionCalls": [
                {"id": "t1", "name": "get_customer_info", "args": {}},
                {"name": "call_end"}
            ]}
        }));
        let RealtimeEvent::ToolCall(calls) = &events[0] else {
            panic!("expected tool call");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "t1");
        assert_eq!(calls[0].name, "get_customer_info");
        assert!(!calls[1].id.is_empty());
        assert!(calls[1].args.is_empty());
    }

    #[test]
    fn test_decode_notices() {
        let events = decode(json!({"toolCallCancellation": {"ids": ["t1"]}}));
        assert_eq!(
            events,
            vec![RealtimeEvent::ToolCallCancellation(vec!["t1".into()])]
        );

        let events = decode(json!({"goAway": {"timeLeft": "10s"}}));
        assert_eq!(
            events,
            vec![RealtimeEvent::Notice(SessionNotice::GoAway {
                time_left: Some("10s".into())
            })]
        );

        let events = decode(json!({"usageMetadata": {"totalTokenCount": 5}}));
        assert!(matches!(
            events[0],
            RealtimeEvent::Notice(SessionNotice::Usage(_))
        ));
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        assert_eq!(
            decode(json!({"somethingNew": {}})),
            vec![RealtimeEvent::Unknown("somethingNew".into())]
        );
        assert!(GeminiDecoder::new(24000).decode("{not json").is_empty());
    }
}
