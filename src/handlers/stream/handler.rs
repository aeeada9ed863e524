use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use super::transport::{WsTelephonySink, WsTelephonySource};
use crate::errors::app_error::AppResult;
use crate::state::{AppState, CallSlot};

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Query parameters the telephony provider copies from the answer URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub calluuid: Option<String>,
}

/// Media-stream WebSocket handler
///
/// Reserves a call slot before upgrading; when `max_concurrent_calls` is
/// reached the request is rejected with 503.
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> AppResult<Response> {
    let slot = state.try_acquire_call().inspect_err(|e| {
        warn!(error = %e, from = ?query.from, "Rejecting media stream");
    })?;

    info!(
        from = ?query.from,
        to = ?query.to,
        call_uuid = ?query.calluuid,
        active_calls = state.active_calls(),
        "Media stream upgrade requested"
    );

    Ok(ws
        .max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_stream_socket(socket, state, query, slot)))
}

/// Bridge one call over an upgraded socket. The slot is held until the call
/// ends.
async fn handle_stream_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    query: StreamQuery,
    _slot: CallSlot,
) {
    let (sink, stream) = socket.split();
    let source = WsTelephonySource::new(stream);
    let sink = WsTelephonySink::new(sink);

    match state.bridge.run(source, sink).await {
        Ok(summary) => {
            info!(
                call_id = %summary.call_id,
                call_uuid = ?query.calluuid,
                end_reason = %summary.end_reason,
                utterances = summary.utterances.len(),
                "Media stream finished"
            );
        }
        Err(e) => {
            warn!(
                call_uuid = ?query.calluuid,
                from = ?query.from,
                error = %e,
                "Media stream ended without a bridged call"
            );
        }
    }
}
