use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::session::{CallSession, CallSummary, EndReason};
use super::writer::{OUTBOUND_CHANNEL_CAPACITY, OutboundRoute, WriterStats, spawn_writer};
use super::{BridgeConfig, BridgeError};
use crate::core::codec::{AudioFormat, MediaFrame};
use crate::core::realtime::{
    BoxedConnector, ModelContent, RealtimeError, RealtimeEvent, RealtimeSender, RealtimeSession,
    SessionNotice, Transcription,
};
use crate::core::telephony::{
    InboundEvent, MediaEvent, OutboundEvent, StartEvent, TelephonySink, TelephonySource,
};
use crate::core::tools::{ToolContext, ToolDispatcher, ToolInvocation};
use crate::core::transcript::{Role, TranscriptSink, Utterance};
use crate::core::turn::{TurnPhase, TurnState};

/// Bridges one telephony stream to one AI session per call.
pub struct CallBridge {
    connector: BoxedConnector,
    tools: Arc<ToolDispatcher>,
    transcripts: Arc<dyn TranscriptSink>,
    config: BridgeConfig,
}

/// How the telephony read loop stopped.
enum TelephonyExit {
    Stop,
    Closed,
    Failed,
    Cancelled,
}

/// How the setup wait ended.
enum SetupOutcome {
    Ready(Option<String>),
    Hangup(EndReason),
}

impl CallBridge {
    pub fn new(
        connector: BoxedConnector,
        tools: Arc<ToolDispatcher>,
        transcripts: Arc<dyn TranscriptSink>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            connector,
            tools,
            transcripts,
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.connector.provider_name()
    }

    /// Run one call to completion.
    ///
    /// Returns an error only if the call never got bridged (no `start`,
    /// provider connection or setup failure). Once audio flows, every way the
    /// call can end is reported through [`CallSummary::end_reason`].
    pub async fn run<S, K>(&self, mut source: S, mut sink: K) -> Result<CallSummary, BridgeError>
    where
        S: TelephonySource,
        K: TelephonySink + 'static,
    {
        let start = match wait_for_start(&mut source).await {
            Ok(start) => start,
            Err(e) => {
                close_sink(&mut sink, "-").await;
                return Err(e);
            }
        };

        let turn = Arc::new(TurnState::new());
        turn.start();
        let call = CallSession::new(&start, turn.clone());
        info!(
            call_id = %call.call_id,
            stream_id = ?call.stream_id,
            account_id = ?call.account_id,
            provider = self.connector.provider_name(),
            "Call started"
        );

        let mut setup = self.config.session.clone();
        setup.call_id = call.call_id.clone();
        setup.tools = self.tools.declarations();

        let RealtimeSession {
            sender,
            mut events,
            input_format,
            output_format,
        } = match self.connector.connect(&setup).await {
            Ok(session) => session,
            Err(e) => {
                error!(call_id = %call.call_id, error = %e, "Failed to open AI session");
                close_sink(&mut sink, &call.call_id).await;
                return Err(e.into());
            }
        };
        debug!(
            call_id = %call.call_id,
            input = %input_format.mime_type(),
            output = %output_format.mime_type(),
            "AI session opened"
        );

        let session_id = match self.await_setup(&call, &mut source, &mut events).await {
            Ok(SetupOutcome::Ready(session_id)) => session_id,
            Ok(SetupOutcome::Hangup(end_reason)) => {
                info!(call_id = %call.call_id, "Caller left before the AI session was ready");
                close_ai(sender.as_ref(), &call.call_id).await;
                close_sink(&mut sink, &call.call_id).await;
                let summary = self
                    .summary(
                        &call,
                        None,
                        end_reason,
                        0,
                        WriterStats::default(),
                        AiStats::default(),
                    )
                    .await;
                return Ok(summary);
            }
            Err(e) => {
                warn!(call_id = %call.call_id, error = %e, "AI session setup failed");
                close_ai(sender.as_ref(), &call.call_id).await;
                close_sink(&mut sink, &call.call_id).await;
                return Err(e);
            }
        };
        info!(call_id = %call.call_id, session_id = ?session_id, "AI session ready");

        if let Some(greeting) = &self.config.greeting
            && let Err(e) = sender.send_text_turn(greeting).await
        {
            error!(call_id = %call.call_id, error = %e, "Failed to send greeting turn");
            close_ai(sender.as_ref(), &call.call_id).await;
            close_sink(&mut sink, &call.call_id).await;
            return Err(e.into());
        }

        let cancel = CancellationToken::new();
        let (route_tx, route_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let writer = spawn_writer(
            sink,
            turn.clone(),
            route_rx,
            cancel.clone(),
            call.call_id.clone(),
        );

        let ai_loop = AiLoop {
            call_id: call.call_id.clone(),
            sender: sender.clone(),
            routes: route_tx,
            turn: turn.clone(),
            tools: self.tools.clone(),
            transcripts: self.transcripts.clone(),
            cancel: cancel.clone(),
            current_response: None,
            cancelled_responses: HashSet::new(),
            user_text: String::new(),
            agent_text: String::new(),
            agent_from_transcript: false,
            stats: AiStats::default(),
        };
        let ai_task = tokio::spawn(ai_loop.run(events));

        let (telephony_exit, frames_to_ai) = self
            .telephony_loop(&call, &mut source, sender.as_ref(), &cancel)
            .await;

        cancel.cancel();
        close_ai(sender.as_ref(), &call.call_id).await;

        let ai_stats = match ai_task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(call_id = %call.call_id, error = %e, "AI loop task failed");
                AiStats::default()
            }
        };
        let writer_stats = match writer.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(call_id = %call.call_id, error = %e, "Writer task failed");
                WriterStats::default()
            }
        };

        let end_reason = match telephony_exit {
            TelephonyExit::Stop => EndReason::TelephonyStop,
            TelephonyExit::Closed => EndReason::TelephonyClosed,
            TelephonyExit::Failed => EndReason::TelephonyFailed,
            TelephonyExit::Cancelled if writer_stats.failed => EndReason::TelephonyFailed,
            TelephonyExit::Cancelled => EndReason::AiClosed,
        };

        Ok(self
            .summary(&call, session_id, end_reason, frames_to_ai, writer_stats, ai_stats)
            .await)
    }

    /// Wait for the provider's setup acknowledgment, bounded by the configured
    /// timeout. Caller audio that arrives meanwhile is dropped.
    async fn await_setup<S: TelephonySource>(
        &self,
        call: &CallSession,
        source: &mut S,
        events: &mut mpsc::Receiver<RealtimeEvent>,
    ) -> Result<SetupOutcome, BridgeError> {
        let deadline = tokio::time::sleep(self.config.setup_timeout);
        tokio::pin!(deadline);
        let mut dropped = 0u64;

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(BridgeError::SetupTimeout(self.config.setup_timeout));
                }
                event = events.recv() => match event {
                    Some(RealtimeEvent::SetupComplete { session_id }) => {
                        if dropped > 0 {
                            debug!(
                                call_id = %call.call_id,
                                dropped,
                                "Dropped caller audio during setup"
                            );
                        }
                        return Ok(SetupOutcome::Ready(session_id));
                    }
                    Some(RealtimeEvent::Error(message)) => {
                        warn!(call_id = %call.call_id, %message, "Provider error during setup");
                    }
                    Some(other) => {
                        debug!(
                            call_id = %call.call_id,
                            event = %other,
                            "Ignoring event before setup"
                        );
                    }
                    None => {
                        return Err(BridgeError::Realtime(RealtimeError::ConnectionFailed(
                            "AI connection closed before setup completed".to_string(),
                        )));
                    }
                },
                inbound = source.next_event() => match inbound {
                    Some(Ok(InboundEvent::Media(_))) => dropped += 1,
                    Some(Ok(InboundEvent::Stop)) => {
                        return Ok(SetupOutcome::Hangup(EndReason::TelephonyStop));
                    }
                    None => return Ok(SetupOutcome::Hangup(EndReason::TelephonyClosed)),
                    Some(Err(e)) if e.is_fatal() => {
                        warn!(call_id = %call.call_id, error = %e, "Telephony failed during setup");
                        return Ok(SetupOutcome::Hangup(EndReason::TelephonyFailed));
                    }
                    Some(Err(e)) => {
                        warn!(call_id = %call.call_id, error = %e, "Dropping telephony frame");
                    }
                    Some(Ok(other)) => {
                        debug!(
                            call_id = %call.call_id,
                            ?other,
                            "Ignoring telephony event during setup"
                        );
                    }
                },
            }
        }
    }

    /// Read the telephony leg until it ends or the call is cancelled.
    async fn telephony_loop<S: TelephonySource>(
        &self,
        call: &CallSession,
        source: &mut S,
        sender: &dyn RealtimeSender,
        cancel: &CancellationToken,
    ) -> (TelephonyExit, u64) {
        let mut forwarded = 0u64;

        let exit = loop {
            let inbound = tokio::select! {
                _ = cancel.cancelled() => break TelephonyExit::Cancelled,
                inbound = source.next_event() => inbound,
            };

            match inbound {
                Some(Ok(InboundEvent::Media(media))) => {
                    if self.forward_media(call, &media, sender).await {
                        forwarded += 1;
                    }
                }
                Some(Ok(InboundEvent::Stop)) => {
                    info!(call_id = %call.call_id, "Telephony stream stopped");
                    break TelephonyExit::Stop;
                }
                Some(Ok(InboundEvent::Start(start))) => {
                    debug!(
                        call_id = %call.call_id,
                        duplicate = %start.call_id,
                        "Ignoring repeated start event"
                    );
                }
                Some(Ok(InboundEvent::Unknown(kind))) => {
                    debug!(
                        call_id = %call.call_id,
                        event = %kind,
                        "Ignoring unknown telephony event"
                    );
                }
                Some(Err(e)) if e.is_fatal() => {
                    warn!(call_id = %call.call_id, error = %e, "Telephony transport failed");
                    break TelephonyExit::Failed;
                }
                Some(Err(e)) => {
                    warn!(call_id = %call.call_id, error = %e, "Dropping telephony frame");
                }
                None => {
                    info!(call_id = %call.call_id, "Telephony connection closed");
                    break TelephonyExit::Closed;
                }
            }
        };

        (exit, forwarded)
    }

    /// Decode one media frame and hand it to the AI leg. Returns whether the
    /// frame was sent.
    async fn forward_media(
        &self,
        call: &CallSession,
        media: &MediaEvent,
        sender: &dyn RealtimeSender,
    ) -> bool {
        if !self.config.forward_audio_while_speaking
            && call.turn.phase() == TurnPhase::ModelSpeaking
        {
            return false;
        }

        let frame = match MediaFrame::from_base64(&media.payload, AudioFormat::TELEPHONY) {
            Ok(frame) if frame.is_empty() => return false,
            Ok(frame) => frame,
            Err(e) => {
                warn!(call_id = %call.call_id, error = %e, "Dropping undecodable caller audio");
                return false;
            }
        };

        match sender.send_audio(&frame).await {
            Ok(()) => true,
            Err(RealtimeError::Codec(e)) => {
                warn!(call_id = %call.call_id, error = %e, "Dropping unconvertible caller audio");
                false
            }
            Err(e) => {
                debug!(call_id = %call.call_id, error = %e, "AI leg rejected caller audio");
                false
            }
        }
    }

    async fn summary(
        &self,
        call: &CallSession,
        session_id: Option<String>,
        end_reason: EndReason,
        frames_to_ai: u64,
        writer: WriterStats,
        ai: AiStats,
    ) -> CallSummary {
        self.transcripts.flush().await;
        let utterances = self.transcripts.fetch(&call.call_id).await;
        for utterance in &utterances {
            info!(
                call_id = %call.call_id,
                role = %utterance.role,
                content = %utterance.content,
                "Transcript"
            );
        }

        let summary = CallSummary {
            call_id: call.call_id.clone(),
            session_id,
            duration: call.elapsed(),
            end_reason,
            frames_to_ai,
            frames_to_caller: writer.sent_audio,
            frames_dropped_stale: writer.dropped_stale,
            interruptions: ai.interruptions,
            tool_calls: ai.tool_calls,
            utterances,
        };

        info!(
            call_id = %summary.call_id,
            end_reason = %summary.end_reason,
            duration_ms = summary.duration.as_millis() as u64,
            frames_to_ai = summary.frames_to_ai,
            frames_to_caller = summary.frames_to_caller,
            frames_dropped_stale = summary.frames_dropped_stale,
            interruptions = summary.interruptions,
            tool_calls = summary.tool_calls,
            "Call ended"
        );
        summary
    }
}

/// Read telephony events until `start`, dropping anything that precedes it.
async fn wait_for_start<S: TelephonySource>(source: &mut S) -> Result<StartEvent, BridgeError> {
    loop {
        match source.next_event().await {
            Some(Ok(InboundEvent::Start(start))) => return Ok(start),
            Some(Ok(InboundEvent::Media(_))) => debug!("Dropping media received before start"),
            Some(Ok(InboundEvent::Unknown(kind))) => {
                debug!(event = %kind, "Ignoring unknown telephony event before start")
            }
            Some(Ok(InboundEvent::Stop)) | None => return Err(BridgeError::NotStarted),
            Some(Err(e)) if e.is_fatal() => return Err(BridgeError::Transport(e)),
            Some(Err(e)) => warn!(error = %e, "Dropping telephony frame before start"),
        }
    }
}

async fn close_ai(sender: &dyn RealtimeSender, call_id: &str) {
    if let Err(e) = sender.close().await {
        debug!(call_id = %call_id, error = %e, "AI close failed");
    }
}

async fn close_sink<K: TelephonySink>(sink: &mut K, call_id: &str) {
    if let Err(e) = sink.close().await {
        debug!(call_id = %call_id, error = %e, "Telephony close failed");
    }
}

// =============================================================================
// AI Loop
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct AiStats {
    interruptions: u64,
    tool_calls: u64,
}

/// State owned by the AI read loop.
struct AiLoop {
    call_id: String,
    sender: Arc<dyn RealtimeSender>,
    routes: mpsc::Sender<OutboundRoute>,
    turn: Arc<TurnState>,
    tools: Arc<ToolDispatcher>,
    transcripts: Arc<dyn TranscriptSink>,
    cancel: CancellationToken,
    /// Response whose audio is currently playing
    current_response: Option<String>,
    /// Responses cut off by an interruption; their late chunks are dropped
    cancelled_responses: HashSet<String>,
    user_text: String,
    agent_text: String,
    /// Agent text came from output transcription rather than text parts
    agent_from_transcript: bool,
    stats: AiStats,
}

impl AiLoop {
    async fn run(mut self, mut events: mpsc::Receiver<RealtimeEvent>) -> AiStats {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv() => event,
            };

            let Some(event) = event else {
                info!(call_id = %self.call_id, "AI connection closed");
                self.cancel.cancel();
                break;
            };

            if !self.handle(event).await {
                self.cancel.cancel();
                break;
            }
        }

        self.flush_user();
        self.flush_agent();
        self.stats
    }

    /// Returns false when the telephony writer is gone.
    async fn handle(&mut self, event: RealtimeEvent) -> bool {
        match event {
            RealtimeEvent::Content(content) => return self.content(content).await,
            RealtimeEvent::ToolCall(invocations) => self.tool_calls(invocations).await,
            RealtimeEvent::ToolCallCancellation(ids) => {
                info!(call_id = %self.call_id, ?ids, "Model cancelled tool calls");
            }
            RealtimeEvent::InputTranscription(t) => self.input_transcription(t),
            RealtimeEvent::OutputTranscription(t) => self.output_transcription(t),
            RealtimeEvent::SpeechStarted => return self.interrupt("caller speech").await,
            RealtimeEvent::Notice(notice) => self.notice(notice),
            RealtimeEvent::SetupComplete { .. } => {
                debug!(call_id = %self.call_id, "Repeated setup acknowledgment");
            }
            RealtimeEvent::Error(message) => {
                warn!(call_id = %self.call_id, %message, "AI provider reported an error");
            }
            RealtimeEvent::Unknown(kind) => {
                debug!(call_id = %self.call_id, event = %kind, "Unhandled AI event");
            }
        }
        true
    }

    async fn content(&mut self, content: ModelContent) -> bool {
        if let Some(id) = &content.response_id
            && self.cancelled_responses.contains(id)
        {
            debug!(
                call_id = %self.call_id,
                response_id = %id,
                "Dropping output of cancelled response"
            );
            return true;
        }

        if content.interrupted {
            return self.interrupt("model interrupted").await;
        }

        for frame in &content.audio {
            if frame.is_empty() {
                continue;
            }
            let tag = self.turn.enter_model_turn();
            if tag.turn_started {
                self.flush_user();
                info!(call_id = %self.call_id, generation = tag.generation, "Model turn started");
            }
            if content.response_id.is_some() {
                self.current_response.clone_from(&content.response_id);
            }

            let converted = match frame.transcode(AudioFormat::TELEPHONY) {
                Ok(converted) => converted,
                Err(e) => {
                    warn!(
                        call_id = %self.call_id,
                        error = %e,
                        "Dropping unconvertible model audio"
                    );
                    continue;
                }
            };
            let route = OutboundRoute::Audio {
                generation: tag.generation,
                event: OutboundEvent::play_audio(&converted),
            };
            if self.routes.send(route).await.is_err() {
                return false;
            }
        }

        if !self.agent_from_transcript {
            for text in &content.text {
                self.agent_text.push_str(text);
            }
        }

        if (content.turn_complete || content.generation_complete) && self.turn.end_model_turn() {
            debug!(call_id = %self.call_id, "Model turn finished");
        }
        if content.turn_complete {
            self.current_response = None;
            self.flush_agent();
        }
        true
    }

    /// Barge-in: invalidate queued audio, clear playback, cancel the response.
    async fn interrupt(&mut self, cause: &'static str) -> bool {
        let interruption = self.turn.interrupt();
        self.stats.interruptions += 1;
        if let Some(id) = self.current_response.take() {
            self.cancelled_responses.insert(id);
        }
        info!(
            call_id = %self.call_id,
            cause,
            previous_phase = %interruption.previous_phase,
            generation = interruption.generation,
            "Interrupting model output"
        );

        self.flush_agent();

        if self
            .routes
            .send(OutboundRoute::Control(OutboundEvent::ClearAudio))
            .await
            .is_err()
        {
            return false;
        }

        if interruption.previous_phase == TurnPhase::ModelSpeaking
            && let Err(e) = self.sender.cancel_response().await
        {
            debug!(call_id = %self.call_id, error = %e, "Response cancel failed");
        }
        true
    }

    /// Run each invocation in order; every one gets exactly one result.
    async fn tool_calls(&mut self, invocations: Vec<ToolInvocation>) {
        let ctx = ToolContext {
            call_id: self.call_id.clone(),
        };
        for invocation in invocations {
            self.stats.tool_calls += 1;
            let result = self.tools.dispatch(&invocation, &ctx).await;
            if let Err(e) = self.sender.send_tool_result(&result).await {
                warn!(
                    call_id = %self.call_id,
                    invocation_id = %invocation.id,
                    error = %e,
                    "Failed to send tool result"
                );
            }
        }
    }

    fn input_transcription(&mut self, t: Transcription) {
        self.user_text.push_str(&t.text);
        if t.finished {
            self.flush_user();
        }
    }

    fn output_transcription(&mut self, t: Transcription) {
        if !t.text.is_empty() {
            if !self.agent_from_transcript {
                self.agent_text.clear();
                self.agent_from_transcript = true;
            }
            self.agent_text.push_str(&t.text);
        }
        if t.finished {
            self.flush_agent();
        }
    }

    fn notice(&self, notice: SessionNotice) {
        match notice {
            SessionNotice::GoAway { time_left } => {
                warn!(
                    call_id = %self.call_id,
                    ?time_left,
                    "AI provider will close the session soon"
                );
            }
            SessionNotice::SessionCreated { id } => {
                debug!(call_id = %self.call_id, session_id = %id, "AI session created");
            }
            SessionNotice::Usage(usage) => {
                debug!(call_id = %self.call_id, %usage, "AI usage report");
            }
            SessionNotice::Resumption { handle, resumable } => {
                debug!(call_id = %self.call_id, ?handle, resumable, "AI resumption update");
            }
            SessionNotice::RateLimits(limits) => {
                debug!(call_id = %self.call_id, %limits, "AI rate limits");
            }
        }
    }

    fn flush_user(&mut self) {
        let text = std::mem::take(&mut self.user_text);
        self.emit(Role::User, text);
    }

    fn flush_agent(&mut self) {
        let text = std::mem::take(&mut self.agent_text);
        self.agent_from_transcript = false;
        self.emit(Role::Agent, text);
    }

    fn emit(&self, role: Role, text: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        debug!(call_id = %self.call_id, %role, "Utterance finished");
        self.transcripts
            .emit(Utterance::new(role, text, self.call_id.clone()));
    }
}
