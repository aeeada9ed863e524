//! Media-stream WebSocket endpoint.
//!
//! Each accepted connection is one phone call: the socket is split into a
//! [`WsTelephonySource`] and a [`WsTelephonySink`] and handed to the
//! [`CallBridge`](crate::core::bridge::CallBridge).

mod handler;
mod transport;

pub use handler::{StreamQuery, stream_handler};
pub use transport::{WsTelephonySink, WsTelephonySource};
