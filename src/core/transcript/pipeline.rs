use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{TranscriptSink, TranscriptStore, Utterance};

/// Item carried by the transcript queue.
enum Queued {
    Utterance(Utterance),
    /// Acknowledged once every item queued before it has been stored
    Barrier(oneshot::Sender<()>),
}

/// Queue-backed [`TranscriptSink`].
///
/// `emit` publishes onto a bounded channel without waiting; a consumer task
/// appends each utterance to the [`TranscriptStore`]. When the queue is full
/// the utterance is dropped and logged so the media path never stalls.
pub struct TranscriptPipeline {
    publisher: mpsc::Sender<Queued>,
    store: TranscriptStore,
    consumer: JoinHandle<()>,
}

impl TranscriptPipeline {
    /// Start the consumer task. Must be called inside a Tokio runtime.
    pub fn spawn(store: TranscriptStore, capacity: usize) -> Self {
        let (publisher, mut queue) = mpsc::channel::<Queued>(capacity.max(1));
        let consumer_store = store.clone();

        let consumer = tokio::spawn(async move {
            while let Some(item) = queue.recv().await {
                match item {
                    Queued::Utterance(utterance) => {
                        debug!(
                            call_id = %utterance.call_id,
                            role = %utterance.role,
                            "Storing utterance"
                        );
                        consumer_store.append(utterance).await;
                    }
                    Queued::Barrier(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            debug!("Transcript consumer stopped");
        });

        Self {
            publisher,
            store,
            consumer,
        }
    }
}

impl Drop for TranscriptPipeline {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

#[async_trait]
impl TranscriptSink for TranscriptPipeline {
    fn emit(&self, utterance: Utterance) {
        let call_id = utterance.call_id.clone();
        match self.publisher.try_send(Queued::Utterance(utterance)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(call_id = %call_id, "Transcript queue full, dropping utterance");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(call_id = %call_id, "Transcript consumer gone, dropping utterance");
            }
        }
    }

    async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.publisher.send(Queued::Barrier(ack)).await.is_err() || done.await.is_err() {
            warn!("Transcript consumer gone, flush skipped");
        }
    }

    async fn fetch(&self, call_id: &str) -> Vec<Utterance> {
        self.store.range(call_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::Role;
    use std::time::Duration;

    async fn wait_for(
        pipeline: &TranscriptPipeline,
        call_id: &str,
        count: usize,
    ) -> Vec<Utterance> {
        for _ in 0..100 {
            let items = pipeline.fetch(call_id).await;
            if items.len() >= count {
                return items;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        pipeline.fetch(call_id).await
    }

    #[tokio::test]
    async fn test_emit_then_fetch() {
        let pipeline = TranscriptPipeline::spawn(TranscriptStore::new(Duration::from_secs(60)), 16);
        pipeline.emit(Utterance::new(Role::User, "What is my address?", "abc"));
        pipeline.emit(Utterance::new(Role::Agent, "Let me check.", "abc"));

        let items = wait_for(&pipeline, "abc", 2).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].role, Role::User);
        assert_eq!(items[1].content, "Let me check.");
    }

    #[tokio::test]
    async fn test_flush_waits_for_queued_utterances() {
        let pipeline = TranscriptPipeline::spawn(TranscriptStore::new(Duration::from_secs(60)), 16);
        for i in 0..10 {
            pipeline.emit(Utterance::new(Role::User, format!("u{i}"), "c1"));
        }
        pipeline.flush().await;

        let items = pipeline.fetch("c1").await;
        assert_eq!(items.len(), 10);
        assert_eq!(items[9].content, "u9");
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let pipeline = TranscriptPipeline::spawn(TranscriptStore::new(Duration::from_secs(60)), 1);
        for i in 0..50 {
            pipeline.emit(Utterance::new(Role::User, format!("u{i}"), "busy"));
        }
        let items = wait_for(&pipeline, "busy", 1).await;
        assert!(!items.is_empty());
        assert!(items.len() <= 50);
    }
}
