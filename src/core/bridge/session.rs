use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::core::telephony::StartEvent;
use crate::core::transcript::Utterance;
use crate::core::turn::TurnState;

/// Identity and shared turn state of one bridged call.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub call_id: String,
    pub stream_id: Option<String>,
    pub account_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub turn: Arc<TurnState>,
}

impl CallSession {
    pub fn new(start: &StartEvent, turn: Arc<TurnState>) -> Self {
        Self {
            call_id: start.call_id.clone(),
            stream_id: start.stream_id.clone(),
            account_id: start.account_id.clone(),
            created_at: OffsetDateTime::now_utc(),
            turn,
        }
    }

    /// Wall-clock time since the call started.
    pub fn elapsed(&self) -> Duration {
        let elapsed = OffsetDateTime::now_utc() - self.created_at;
        Duration::try_from(elapsed).unwrap_or_default()
    }
}

/// Why a bridged call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Telephony sent `stop`
    TelephonyStop,
    /// Telephony connection closed
    TelephonyClosed,
    /// Telephony transport failed
    TelephonyFailed,
    /// AI connection closed
    AiClosed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::TelephonyStop => write!(f, "telephony_stop"),
            EndReason::TelephonyClosed => write!(f, "telephony_closed"),
            EndReason::TelephonyFailed => write!(f, "telephony_failed"),
            EndReason::AiClosed => write!(f, "ai_closed"),
        }
    }
}

/// End-of-call report returned by [`super::CallBridge::run`].
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub call_id: String,
    /// Provider session id, when the provider reports one
    pub session_id: Option<String>,
    pub duration: Duration,
    pub end_reason: EndReason,
    /// Caller frames sent to the AI leg
    pub frames_to_ai: u64,
    /// Model frames written to the telephony leg
    pub frames_to_caller: u64,
    /// Model frames discarded because their generation went stale
    pub frames_dropped_stale: u64,
    pub interruptions: u64,
    pub tool_calls: u64,
    pub utterances: Vec<Utterance>,
}
