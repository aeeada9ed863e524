//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `voice` - Telephony webhooks (incoming call answer, hangup callback)
//! - `stream` - Media-stream WebSocket, one bridged call per connection

pub mod api;
pub mod stream;
pub mod voice;

pub use stream::stream_handler;
