use async_trait::async_trait;

use super::{InboundEvent, OutboundEvent, TelephonyError};

/// Read half of the telephony leg.
#[async_trait]
pub trait TelephonySource: Send {
    /// Next inbound event, or `None` once the peer has closed the stream.
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TelephonyError>>;
}

/// Write half of the telephony leg.
#[async_trait]
pub trait TelephonySink: Send {
    async fn send(&mut self, event: OutboundEvent) -> Result<(), TelephonyError>;

    /// Close the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<(), TelephonyError>;
}
