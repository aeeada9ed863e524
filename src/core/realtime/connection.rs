//! WebSocket plumbing shared by the realtime providers.
//!
//! [`open`] connects, then spawns one task that owns both halves of the socket
//! and `select!`s between the outgoing channel and incoming frames. Incoming
//! text (or UTF-8 binary) frames go through a provider [`EventDecoder`] and the
//! resulting events are forwarded in arrival order. When the socket closes the
//! event channel is dropped, which is how the bridge learns the leg is gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, warn};

use super::base::{RealtimeError, RealtimeEvent, RealtimeResult};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for decoded server events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Turns a provider's raw JSON messages into [`RealtimeEvent`]s.
///
/// Decoders run on the connection task, so they may keep per-connection state.
pub(crate) trait EventDecoder: Send + 'static {
    fn decode(&mut self, text: &str) -> Vec<RealtimeEvent>;
}

enum Outgoing {
    Text(String),
    Close,
}

/// Handle to a running provider connection.
#[derive(Clone)]
pub(crate) struct WsConnection {
    tx: mpsc::Sender<Outgoing>,
    connected: Arc<AtomicBool>,
    label: &'static str,
}

impl WsConnection {
    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Serialize and queue a message.
    pub(crate) async fn send_json<T: Serialize>(&self, message: &T) -> RealtimeResult<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        self.tx
            .send(Outgoing::Text(json))
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Send a close frame and stop the connection task.
    pub(crate) async fn close(&self) {
        if self.tx.send(Outgoing::Close).await.is_err() {
            debug!(provider = self.label, "Connection already closed");
        }
    }
}

/// Connect to `request` and start the connection task.
pub(crate) async fn open<R, D>(
    request: R,
    decoder: D,
    label: &'static str,
) -> RealtimeResult<(WsConnection, mpsc::Receiver<RealtimeEvent>)>
where
    R: IntoClientRequest + Unpin,
    D: EventDecoder,
{
    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

    info!(provider = label, "Connected to realtime provider");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Outgoing>(WS_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>(EVENT_CHANNEL_CAPACITY);
    let connected = Arc::new(AtomicBool::new(true));
    let task_connected = connected.clone();
    let mut decoder = decoder;

    tokio::spawn(async move {
        'conn: loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(Outgoing::Text(json)) => {
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!(provider = label, "Failed to send WebSocket message: {}", e);
                            break 'conn;
                        }
                    }
                    Some(Outgoing::Close) | None => {
                        if let Err(e) = ws_sink.send(Message::Close(None)).await {
                            debug!(provider = label, "Failed to send close frame: {}", e);
                        }
                        break 'conn;
                    }
                },

                incoming = ws_stream.next() => {
                    let text = match incoming {
                        Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                        Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => text,
                            Err(_) => {
                                warn!(provider = label, "Dropping non UTF-8 binary frame");
                                continue;
                            }
                        },
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                error!(provider = label, "Failed to send pong: {}", e);
                            }
                            continue;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(provider = label, ?frame, "WebSocket closed by server");
                            break 'conn;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!(provider = label, "WebSocket error: {}", e);
                            break 'conn;
                        }
                        None => break 'conn,
                    };

                    for event in decoder.decode(&text) {
                        if event_tx.send(event).await.is_err() {
                            debug!(provider = label, "Event receiver dropped");
                            break 'conn;
                        }
                    }
                }
            }
        }

        task_connected.store(false, Ordering::SeqCst);
        info!(provider = label, "Realtime connection task ended");
    });

    Ok((
        WsConnection {
            tx,
            connected,
            label,
        },
        event_rx,
    ))
}
