//! Telephony leg adapter.
//!
//! The provider's media stream is read as a strict sequence of
//! [`InboundEvent`]s through a [`TelephonySource`] and written back as
//! [`OutboundEvent`]s through a [`TelephonySink`]. Payloads are carried as-is;
//! audio conversion belongs to [`crate::core::codec`].

mod messages;
mod transport;

use thiserror::Error;

pub use messages::{InboundEvent, MediaEvent, OutboundEvent, PlayAudioMedia, StartEvent};
pub use transport::{TelephonySink, TelephonySource};

/// Errors raised by the telephony leg.
#[derive(Debug, Error)]
pub enum TelephonyError {
    /// A single frame could not be decoded; the leg stays open
    #[error("Failed to decode telephony frame: {0}")]
    Decode(String),

    #[error("Failed to encode telephony frame: {0}")]
    Encode(String),

    /// The underlying connection failed; the leg is gone
    #[error("Telephony transport error: {0}")]
    Transport(String),
}

impl TelephonyError {
    /// Whether the error ends the leg.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TelephonyError::Transport(_))
    }
}
