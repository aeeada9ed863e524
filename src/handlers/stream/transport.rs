use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, info};

use crate::core::telephony::{
    InboundEvent, OutboundEvent, TelephonyError, TelephonySink, TelephonySource,
};

/// Read half of a telephony WebSocket.
///
/// Text frames are decoded as media-stream events. Binary frames are not part
/// of the protocol and are skipped; ping/pong is answered by axum.
pub struct WsTelephonySource<S> {
    stream: S,
}

impl<S> WsTelephonySource<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> TelephonySource for WsTelephonySource<S>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TelephonyError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(InboundEvent::decode(text.as_str())),
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "Ignoring binary telephony frame");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(frame)) => {
                    info!(?frame, "Telephony peer closed the stream");
                    return None;
                }
                Err(e) => return Some(Err(TelephonyError::Transport(e.to_string()))),
            }
        }
    }
}

/// Write half of a telephony WebSocket.
pub struct WsTelephonySink<K> {
    sink: K,
    closed: bool,
}

impl<K> WsTelephonySink<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            closed: false,
        }
    }
}

#[async_trait]
impl<K> TelephonySink for WsTelephonySink<K>
where
    K: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    async fn send(&mut self, event: OutboundEvent) -> Result<(), TelephonyError> {
        if self.closed {
            return Err(TelephonyError::Transport("stream already closed".to_string()));
        }
        let text = event.encode()?;
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TelephonyError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TelephonyError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // The peer may already be gone; the close frame is best effort
        if let Err(e) = self.sink.send(Message::Close(None)).await {
            debug!(error = %e, "Failed to send telephony close frame");
        }
        self.sink
            .close()
            .await
            .map_err(|e| TelephonyError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::stream;

    fn text(s: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(s.to_string().into()))
    }

    #[tokio::test]
    async fn test_source_decodes_text_frames() {
        let frames = vec![
            text(r#"{"event":"start","start":{"callId":"abc123"}}"#),
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(Vec::new().into())),
            text(r#"{"event":"media","media":{"payload":"//8="}}"#),
            text("not json"),
            Ok(Message::Close(None)),
            text(r#"{"event":"stop"}"#),
        ];
        let mut source = WsTelephonySource::new(stream::iter(frames));

        match source.next_event().await {
            Some(Ok(InboundEvent::Start(start))) => assert_eq!(start.call_id, "abc123"),
            other => panic!("expected start, got {other:?}"),
        }
        match source.next_event().await {
            Some(Ok(InboundEvent::Media(media))) => assert_eq!(media.payload, "//8="),
            other => panic!("expected media, got {other:?}"),
        }
        match source.next_event().await {
            Some(Err(e)) => assert!(!e.is_fatal()),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_source_transport_error_is_fatal() {
        let frames = vec![Err(axum::Error::new(std::io::Error::other("reset")))];
        let mut source = WsTelephonySource::new(stream::iter(frames));
        match source.next_event().await {
            Some(Err(e)) => assert!(e.is_fatal()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sink_encodes_and_closes_once() {
        let (tx, mut rx) = mpsc::unbounded::<Message>();
        let mut sink = WsTelephonySink::new(tx.sink_map_err(axum::Error::new));

        sink.send(OutboundEvent::ClearAudio).await.unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert!(sink.send(OutboundEvent::ClearAudio).await.is_err());

        match rx.next().await {
            Some(Message::Text(t)) => assert_eq!(t.as_str(), r#"{"event":"clearAudio"}"#),
            other => panic!("expected text frame, got {other:?}"),
        }
        assert!(matches!(rx.next().await, Some(Message::Close(None))));
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_sink_close_after_peer_gone() {
        let (tx, rx) = mpsc::unbounded::<Message>();
        drop(rx);
        let mut sink = WsTelephonySink::new(tx.sink_map_err(axum::Error::new));

        sink.close().await.unwrap();
        assert!(sink.send(OutboundEvent::ClearAudio).await.is_err());
    }
}
