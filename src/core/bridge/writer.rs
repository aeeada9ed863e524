use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::telephony::{OutboundEvent, TelephonySink};
use crate::core::turn::TurnState;

/// Channel capacity between the AI loop and the writer.
pub(crate) const OUTBOUND_CHANNEL_CAPACITY: usize = 512;

/// Frame queued for the telephony leg.
#[derive(Debug)]
pub(crate) enum OutboundRoute {
    /// Model audio tagged with the generation it was produced under
    Audio { generation: u64, event: OutboundEvent },
    /// Control frame, always delivered
    Control(OutboundEvent),
}

/// Counters reported by the writer when it stops.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WriterStats {
    pub sent_audio: u64,
    pub dropped_stale: u64,
    /// The sink failed and the writer cancelled the call
    pub failed: bool,
}

/// Spawn the task that owns the telephony sink.
///
/// Audio whose generation is no longer current is dropped here, right before
/// it would reach the wire. The sink is closed when the task ends.
pub(crate) fn spawn_writer<K>(
    mut sink: K,
    turn: Arc<TurnState>,
    mut routes: mpsc::Receiver<OutboundRoute>,
    cancel: CancellationToken,
    call_id: String,
) -> JoinHandle<WriterStats>
where
    K: TelephonySink + 'static,
{
    tokio::spawn(async move {
        let mut stats = WriterStats::default();

        loop {
            let route = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                route = routes.recv() => match route {
                    Some(route) => route,
                    None => break,
                },
            };

            let event = match route {
                OutboundRoute::Audio { generation, event } => {
                    if !turn.is_current(generation) {
                        stats.dropped_stale += 1;
                        debug!(call_id = %call_id, generation, "Dropping stale model audio");
                        continue;
                    }
                    stats.sent_audio += 1;
                    event
                }
                OutboundRoute::Control(event) => event,
            };

            if let Err(e) = sink.send(event).await {
                if e.is_fatal() {
                    warn!(call_id = %call_id, error = %e, "Telephony write failed, ending call");
                    stats.failed = true;
                    cancel.cancel();
                    break;
                }
                warn!(call_id = %call_id, error = %e, "Dropping unsendable telephony frame");
            }
        }

        if let Err(e) = sink.close().await {
            debug!(call_id = %call_id, error = %e, "Telephony close failed");
        }
        info!(
            call_id = %call_id,
            sent_audio = stats.sent_audio,
            dropped_stale = stats.dropped_stale,
            "Telephony writer stopped"
        );
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::telephony::TelephonyError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<OutboundEvent>>>,
        closed: Arc<Mutex<bool>>,
        fail: bool,
    }

    #[async_trait]
    impl TelephonySink for RecordingSink {
        async fn send(&mut self, event: OutboundEvent) -> Result<(), TelephonyError> {
            if self.fail {
                return Err(TelephonyError::Transport("gone".into()));
            }
            self.sent.lock().push(event);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TelephonyError> {
            *self.closed.lock() = true;
            Ok(())
        }
    }

    fn play(payload: &str) -> OutboundEvent {
        OutboundEvent::PlayAudio {
            media: crate::core::telephony::PlayAudioMedia {
                content_type: "audio/x-mulaw".into(),
                sample_rate: 8000,
                payload: payload.into(),
            },
        }
    }

    #[tokio::test]
    async fn test_stale_generation_is_dropped() {
        let sink = RecordingSink::default();
        let turn = Arc::new(TurnState::new());
        turn.start();
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_writer(
            sink.clone(),
            turn.clone(),
            rx,
            CancellationToken::new(),
            "c1".into(),
        );

        tx.send(OutboundRoute::Audio {
            generation: 0,
            event: play("a"),
        })
        .await
        .unwrap();
        turn.interrupt();
        tx.send(OutboundRoute::Audio {
            generation: 0,
            event: play("b"),
        })
        .await
        .unwrap();
        tx.send(OutboundRoute::Control(OutboundEvent::ClearAudio))
            .await
            .unwrap();
        tx.send(OutboundRoute::Audio {
            generation: 1,
            event: play("c"),
        })
        .await
        .unwrap();
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats.sent_audio, 2);
        assert_eq!(stats.dropped_stale, 1);
        assert!(!stats.failed);

        let sent = sink.sent.lock().clone();
        assert_eq!(sent, vec![play("a"), OutboundEvent::ClearAudio, play("c")]);
        assert!(*sink.closed.lock());
    }

    #[tokio::test]
    async fn test_transport_failure_cancels_call() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_writer(
            sink.clone(),
            Arc::new(TurnState::new()),
            rx,
            cancel.clone(),
            "c1".into(),
        );

        tx.send(OutboundRoute::Control(OutboundEvent::ClearAudio)).await.unwrap();
        let stats = handle.await.unwrap();
        assert!(stats.failed);
        assert!(cancel.is_cancelled());
        assert!(*sink.closed.lock());
    }
}
