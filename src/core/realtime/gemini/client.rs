use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::config::{GEMINI_OUTPUT_SAMPLE_RATE, GeminiLiveConfig, GeminiVoice, qualified_model_name};
use super::messages::{ClientMessage, GeminiDecoder};
use crate::core::codec::{AudioFormat, MediaFrame};
use crate::core::realtime::base::{
    RealtimeConnector, RealtimeError, RealtimeResult, RealtimeSender, RealtimeSession,
    SessionSetup,
};
use crate::core::realtime::connection::{self, WsConnection};
use crate::core::tools::ToolResult;

const PROVIDER: &str = "gemini";

/// Gemini Live connector.
///
/// Each [`connect`](RealtimeConnector::connect) opens a fresh WebSocket and
/// sends the `setup` message; `setupComplete` arrives later as
/// [`crate::core::realtime::RealtimeEvent::SetupComplete`].
pub struct GeminiLive {
    config: GeminiLiveConfig,
}

impl GeminiLive {
    pub fn new(config: GeminiLiveConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "Gemini API key is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Format caller audio is converted to before sending.
    pub fn input_format(&self) -> AudioFormat {
        AudioFormat::pcm16(self.config.input_sample_rate)
    }

    pub fn output_format(&self) -> AudioFormat {
        AudioFormat::pcm16(GEMINI_OUTPUT_SAMPLE_RATE)
    }
}

#[async_trait]
impl RealtimeConnector for GeminiLive {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn connect(&self, setup: &SessionSetup) -> RealtimeResult<RealtimeSession> {
        let model = qualified_model_name(&setup.model);
        let voice = GeminiVoice::from_str_or_default(&setup.voice);

        let (conn, events) = connection::open(
            self.config.build_ws_url(),
            GeminiDecoder::new(GEMINI_OUTPUT_SAMPLE_RATE),
            PROVIDER,
        )
        .await?;

        info!(
            call_id = %setup.call_id,
            model = %model,
            voice = %voice,
            tools = setup.tools.len(),
            "Sending Gemini Live setup"
        );
        conn.send_json(&ClientMessage::setup(setup, model, voice.as_str().to_string()))
            .await?;

        let input_format = self.input_format();
        Ok(RealtimeSession {
            sender: Arc::new(GeminiSender { conn, input_format }),
            events,
            input_format,
            output_format: self.output_format(),
        })
    }
}

struct GeminiSender {
    conn: WsConnection,
    input_format: AudioFormat,
}

#[async_trait]
impl RealtimeSender for GeminiSender {
    async fn send_audio(&self, frame: &MediaFrame) -> RealtimeResult<()> {
        if !self.conn.is_connected() {
            return Err(RealtimeError::NotConnected);
        }
        let frame = frame.transcode(self.input_format)?;
        self.conn.send_json(&ClientMessage::audio(&frame)).await
    }

    async fn send_text_turn(&self, text: &str) -> RealtimeResult<()> {
        self.conn.send_json(&ClientMessage::user_text(text)).await
    }

    async fn send_tool_result(&self, result: &ToolResult) -> RealtimeResult<()> {
        self.conn.send_json(&ClientMessage::tool_result(result)).await
    }

    async fn cancel_response(&self) -> RealtimeResult<()> {
        // Gemini stops generating on its own once it reports `interrupted`.
        debug!("Gemini Live has no explicit cancel; ignoring");
        Ok(())
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.conn.close().await;
        Ok(())
    }
}
