//! Per-call bridge between the telephony leg and the AI leg.
//!
//! A [`CallBridge`] is built once at startup with its collaborators (the
//! realtime connector, the tool dispatcher and the transcript sink) and then
//! [`run`](CallBridge::run) once per phone call. Each call gets:
//!
//! - a telephony read loop (inline in `run`) that forwards caller audio
//! - an AI read loop task that plays model audio, runs tools and handles
//!   interruptions
//! - a writer task that owns the telephony sink and drops audio whose
//!   generation went stale
//!
//! The two read loops share nothing except the call's
//! [`TurnState`](crate::core::turn::TurnState). Closing either leg cancels the
//! call and both connections are released before `run` returns.

mod orchestrator;
mod session;
mod writer;

use std::time::Duration;

use thiserror::Error;

use crate::core::realtime::{RealtimeError, SessionSetup};
use crate::core::telephony::TelephonyError;

pub use orchestrator::CallBridge;
pub use session::{CallSession, CallSummary, EndReason};

/// Text turn that prompts the model to speak first.
pub const DEFAULT_GREETING: &str = "[Call connected. Please greet the caller.]";

/// Default bound on the wait for the provider's setup acknowledgment.
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors that abort a call before audio is bridged.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The telephony leg failed before the call started
    #[error("Telephony transport failed: {0}")]
    Transport(#[from] TelephonyError),

    /// The AI leg never acknowledged the session setup
    #[error("AI session setup not acknowledged within {0:?}")]
    SetupTimeout(Duration),

    #[error("AI session failed: {0}")]
    Realtime(#[from] RealtimeError),

    /// The telephony leg ended without a `start` event
    #[error("Telephony stream ended before the call started")]
    NotStarted,
}

/// Per-call behavior of the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Session template; `call_id` and `tools` are filled in per call
    pub session: SessionSetup,
    /// Sent as a user text turn once setup completes
    pub greeting: Option<String>,
    pub setup_timeout: Duration,
    /// Keep sending caller audio while the model speaks so the provider can
    /// detect barge-in
    pub forward_audio_while_speaking: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            session: SessionSetup::default(),
            greeting: Some(DEFAULT_GREETING.to_string()),
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            forward_audio_while_speaking: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.greeting.as_deref(), Some(DEFAULT_GREETING));
        assert_eq!(config.setup_timeout, Duration::from_secs(5));
        assert!(config.forward_audio_while_speaking);
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::SetupTimeout(Duration::from_millis(50));
        assert!(err.to_string().contains("50ms"));
        assert_eq!(
            BridgeError::NotStarted.to_string(),
            "Telephony stream ended before the call started"
        );
    }
}
