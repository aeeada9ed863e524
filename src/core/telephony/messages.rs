//! Telephony media-stream frames.
//!
//! Inbound (provider -> gateway):
//! - `{"event":"start","start":{"callId":..,"streamId":..,"accountId":..}}`
//! - `{"event":"media","media":{"payload":"<base64 μ-law>"}}`
//! - `{"event":"stop"}`
//!
//! Outbound (gateway -> provider):
//! - `{"event":"playAudio","media":{"contentType":"audio/x-mulaw","sampleRate":8000,"payload":".."}}`
//! - `{"event":"clearAudio"}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TelephonyError;
use crate::core::codec::MediaFrame;

/// Payload of the `start` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub call_id: String,
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Payload of the `media` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaEvent {
    /// Base64-encoded μ-law audio
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Start(StartEvent),
    Media(MediaEvent),
    Stop,
    /// Frame with an event name this gateway does not handle
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    start: Option<Value>,
    #[serde(default)]
    media: Option<Value>,
}

impl InboundEvent {
    /// Decode a text frame, reading the `event` discriminant first.
    pub fn decode(text: &str) -> Result<Self, TelephonyError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| TelephonyError::Decode(format!("invalid frame: {e}")))?;

        match envelope.event.as_str() {
            "start" => {
                let start = envelope
                    .start
                    .ok_or_else(|| TelephonyError::Decode("start event without body".into()))?;
                serde_json::from_value(start)
                    .map(InboundEvent::Start)
                    .map_err(|e| TelephonyError::Decode(format!("invalid start event: {e}")))
            }
            "media" => {
                let media = envelope
                    .media
                    .ok_or_else(|| TelephonyError::Decode("media event without body".into()))?;
                serde_json::from_value(media)
                    .map(InboundEvent::Media)
                    .map_err(|e| TelephonyError::Decode(format!("invalid media event: {e}")))
            }
            "stop" => Ok(InboundEvent::Stop),
            other => Ok(InboundEvent::Unknown(other.to_string())),
        }
    }
}

/// Body of a `playAudio` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAudioMedia {
    pub content_type: String,
    pub sample_rate: u32,
    pub payload: String,
}

/// Frame sent back to the telephony provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// Queue audio for playback to the caller
    PlayAudio { media: PlayAudioMedia },
    /// Discard all queued playback
    ClearAudio,
}

impl OutboundEvent {
    /// Wrap a frame that is already in the telephony format.
    pub fn play_audio(frame: &MediaFrame) -> Self {
        OutboundEvent::PlayAudio {
            media: PlayAudioMedia {
                content_type: frame.format.mime_type(),
                sample_rate: frame.format.sample_rate,
                payload: frame.to_base64(),
            },
        }
    }

    pub fn encode(&self) -> Result<String, TelephonyError> {
        serde_json::to_string(self).map_err(|e| TelephonyError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::AudioFormat;

    #[test]
    fn test_decode_start() {
        let text = r#"{"event":"start","start":{"callId":"abc123","streamId":"s-1","accountId":"acc"}}"#;
        let event = InboundEvent::decode(text).unwrap();
        assert_eq!(
            event,
            InboundEvent::Start(StartEvent {
                call_id: "abc123".into(),
                stream_id: Some("s-1".into()),
                account_id: Some("acc".into()),
            })
        );
    }

    #[test]
    fn test_decode_start_minimal() {
        let event = InboundEvent::decode(r#"{"event":"start","start":{"callId":"c"}}"#).unwrap();
        match event {
            InboundEvent::Start(start) => {
                assert_eq!(start.call_id, "c");
                assert!(start.stream_id.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_decode_media() {
        let text = r#"{"event":"media","media":{"payload":"//8=","track":"inbound"}}"#;
        let event = InboundEvent::decode(text).unwrap();
        match event {
            InboundEvent::Media(media) => {
                assert_eq!(media.payload, "//8=");
                assert_eq!(media.track.as_deref(), Some("inbound"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_decode_stop_and_unknown() {
        assert_eq!(
            InboundEvent::decode(r#"{"event":"stop"}"#).unwrap(),
            InboundEvent::Stop
        );
        assert_eq!(
            InboundEvent::decode(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).unwrap(),
            InboundEvent::Unknown("dtmf".into())
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            InboundEvent::decode("not json"),
            Err(TelephonyError::Decode(_))
        ));
        assert!(matches!(
            InboundEvent::decode(r#"{"event":"start"}"#),
            Err(TelephonyError::Decode(_))
        ));
        assert!(matches!(
            InboundEvent::decode(r#"{"event":"media","media":{}}"#),
            Err(TelephonyError::Decode(_))
        ));
        assert!(matches!(
            InboundEvent::decode(r#"{"media":{"payload":""}}"#),
            Err(TelephonyError::Decode(_))
        ));
    }

    #[test]
    fn test_encode_play_audio() {
        let frame = MediaFrame::new(vec![0xFFu8, 0xFF], AudioFormat::TELEPHONY);
        let json = OutboundEvent::play_audio(&frame).encode().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "playAudio");
        assert_eq!(value["media"]["contentType"], "audio/x-mulaw");
        assert_eq!(value["media"]["sampleRate"], 8000);
        assert_eq!(value["media"]["payload"], "//8=");
    }

    #[test]
    fn test_encode_clear_audio() {
        let json = OutboundEvent::ClearAudio.encode().unwrap();
        assert_eq!(json, r#"{"event":"clearAudio"}"#);
    }
}
