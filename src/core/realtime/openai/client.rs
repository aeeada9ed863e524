//! OpenAI Realtime API connector.
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Auth: `Authorization: Bearer <key>` plus `OpenAI-Beta: realtime=v1`
//! - Audio: `pcm16` (24 kHz) or `g711_ulaw` (8 kHz) in both directions

use std::sync::Arc;

use async_trait::async_trait;
use tokio_tungstenite::tungstenite;
use tracing::info;

use super::config::{OpenAIRealtimeConfig, OpenAIRealtimeVoice};
use super::messages::{ClientEvent, ConversationItem, OpenAIDecoder, SessionConfig};
use crate::core::codec::{AudioFormat, MediaFrame};
use crate::core::realtime::base::{
    RealtimeConnector, RealtimeError, RealtimeResult, RealtimeSender, RealtimeSession,
    SessionSetup,
};
use crate::core::realtime::connection::{self, WsConnection};
use crate::core::tools::ToolResult;

const PROVIDER: &str = "openai";

/// OpenAI Realtime connector.
pub struct OpenAIRealtime {
    config: OpenAIRealtimeConfig,
}

impl OpenAIRealtime {
    pub fn new(config: OpenAIRealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "OpenAI API key is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Format used for audio in both directions.
    pub fn audio_format(&self) -> AudioFormat {
        self.config.audio_format.audio_format()
    }

    fn build_request(&self, model: &str) -> RealtimeResult<http::Request<()>> {
        let url = self.config.build_ws_url(model);
        let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| {
            RealtimeError::InvalidConfiguration(e.to_string())
        })?;
        let host = uri
            .authority()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| "api.openai.com".to_string());

        http::Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))
    }
}

#[async_trait]
impl RealtimeConnector for OpenAIRealtime {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn connect(&self, setup: &SessionSetup) -> RealtimeResult<RealtimeSession> {
        let request = self.build_request(&setup.model)?;
        let format = self.audio_format();

        let (conn, events) =
            connection::open(request, OpenAIDecoder::new(format), PROVIDER).await?;

        let voice = OpenAIRealtimeVoice::from_str_or_default(&setup.voice);
        info!(
            call_id = %setup.call_id,
            voice = %voice,
            audio_format = %self.config.audio_format,
            tools = setup.tools.len(),
            "Sending OpenAI session.update"
        );
        conn.send_json(&ClientEvent::SessionUpdate {
            session: SessionConfig::from_setup(
                setup,
                voice.as_str(),
                self.config.audio_format.as_str(),
            ),
        })
        .await?;

        Ok(RealtimeSession {
            sender: Arc::new(OpenAISender { conn, format }),
            events,
            input_format: format,
            output_format: format,
        })
    }
}

struct OpenAISender {
    conn: WsConnection,
    format: AudioFormat,
}

#[async_trait]
impl RealtimeSender for OpenAISender {
    async fn send_audio(&self, frame: &MediaFrame) -> RealtimeResult<()> {
        if !self.conn.is_connected() {
            return Err(RealtimeError::NotConnected);
        }
        let frame = frame.transcode(self.format)?;
        self.conn.send_json(&ClientEvent::audio_append(&frame)).await
    }

    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()> {
        self.conn
            .send_json(&ClientEvent::ConversationItemCreate {
                item: ConversationItem::user_text(text),
            })
            .await?;
        self.conn.send_json(&ClientEvent::ResponseCreate).await
    }

    async fn send_tool_result(&self, result: &ToolResult) -> RealtimeResult<()> {
        self.conn
            .send_json(&ClientEvent::ConversationItemCreate {
                item: ConversationItem::function_output(result),
            })
            .await?;
        self.conn.send_json(&ClientEvent::ResponseCreate).await
    }

    async fn cancel_response(&self) -> RealtimeResult<()> {
        self.conn.send_json(&ClientEvent::ResponseCancel).await
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.conn.close().await;
        Ok(())
    }
}
