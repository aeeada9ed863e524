//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::stream::stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /stream?from=..&to=..&calluuid=..` - WebSocket upgrade for one call
///
/// # Protocol
///
/// The telephony provider sends JSON text frames:
/// - `{"event":"start","start":{"callId":..}}` once
/// - `{"event":"media","media":{"payload":<base64 μ-law 8 kHz>}}` repeatedly
/// - `{"event":"stop"}` when the call ends
///
/// The server replies with `playAudio` frames carrying model audio and
/// `clearAudio` frames on barge-in.
pub fn create_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stream", get(stream_handler))
        .layer(TraceLayer::new_for_http())
}
